//! Sections and whole documents

use std::fmt::{self, Display};

use super::{quote, Value};

/// One bracketed section with its properties
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    tag: String,
    attributes: Vec<(String, Value)>,
    properties: Vec<(String, Value)>,
}

impl Section {
    /// Empty section with a heading tag such as `node` or `sub_resource`
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// `[ext_resource path=".." type=".." id=n]`
    pub fn ext_resource(path: &str, type_name: &str, id: u32) -> Self {
        Self::new("ext_resource")
            .attr("path", Value::str(path))
            .attr("type", Value::str(type_name))
            .attr("id", Value::from(id))
    }

    /// `[sub_resource type=".." id=n]`
    pub fn sub_resource(type_name: &str, id: u32) -> Self {
        Self::new("sub_resource")
            .attr("type", Value::str(type_name))
            .attr("id", Value::from(id))
    }

    /// `[node name=".." type=".." parent=".."]`; the root node has no parent
    pub fn node(name: &str, type_name: &str, parent: Option<&str>) -> Self {
        let section = Self::new("node")
            .attr("name", Value::str(name))
            .attr("type", Value::str(type_name));
        match parent {
            Some(parent) => section.attr("parent", Value::str(parent)),
            None => section,
        }
    }

    /// Add a heading attribute
    #[must_use]
    pub fn attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.push((key.into(), value));
        self
    }

    /// Add a property
    #[must_use]
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    /// Add a property in place
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.push((key.into(), value.into()));
    }

    /// Append several properties in place
    pub fn extend(&mut self, properties: impl IntoIterator<Item = (String, Value)>) {
        self.properties.extend(properties);
    }

    /// Heading tag
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Value of a property, if set
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.tag)?;
        for (key, value) in &self.attributes {
            write!(f, " {key}={value}")?;
        }
        f.write_str("]\n")?;
        for (key, value) in &self.properties {
            writeln!(f, "{key} = {value}")?;
        }
        Ok(())
    }
}

/// What a document describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    /// A scene (`gd_scene`)
    Scene,
    /// A single resource of the given type (`gd_resource`)
    Resource(String),
}

/// Complete scene or resource file
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    kind: DocumentKind,
    ext_resources: Vec<Section>,
    sub_resources: Vec<Section>,
    body: Vec<Section>,
}

/// Format version written in every header
pub const FORMAT_VERSION: u32 = 2;

impl Document {
    /// Empty scene document
    pub fn scene() -> Self {
        Self::with_kind(DocumentKind::Scene)
    }

    /// Empty resource document
    pub fn resource(type_name: impl Into<String>) -> Self {
        Self::with_kind(DocumentKind::Resource(type_name.into()))
    }

    fn with_kind(kind: DocumentKind) -> Self {
        Self {
            kind,
            ext_resources: Vec::new(),
            sub_resources: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Append an `ext_resource` section
    pub fn push_ext_resource(&mut self, section: Section) {
        self.ext_resources.push(section);
    }

    /// Append a `sub_resource` section
    pub fn push_sub_resource(&mut self, section: Section) {
        self.sub_resources.push(section);
    }

    /// Append a node or `resource` section
    pub fn push_body(&mut self, section: Section) {
        self.body.push(section);
    }

    /// Resources plus the document itself
    pub fn load_steps(&self) -> usize {
        self.ext_resources.len() + self.sub_resources.len() + 1
    }

    fn header(&self) -> String {
        match &self.kind {
            DocumentKind::Scene => format!(
                "[gd_scene load_steps={} format={FORMAT_VERSION}]",
                self.load_steps()
            ),
            DocumentKind::Resource(type_name) => format!(
                "[gd_resource type={} load_steps={} format={FORMAT_VERSION}]",
                quote(type_name),
                self.load_steps()
            ),
        }
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header())?;
        for section in self
            .ext_resources
            .iter()
            .chain(&self.sub_resources)
            .chain(&self.body)
        {
            writeln!(f)?;
            write!(f, "{section}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_rendering() {
        let section = Section::node("Cube", "MeshInstance", Some("."))
            .prop("mesh", Value::SubResource(1))
            .prop("visible", false);
        assert_eq!(
            section.to_string(),
            "[node name=\"Cube\" type=\"MeshInstance\" parent=\".\"]\nmesh = SubResource( 1 )\nvisible = false\n"
        );
    }

    #[test]
    fn test_scene_document_layout() {
        let mut doc = Document::scene();
        doc.push_body(Section::node("Scene", "Spatial", None));
        doc.push_sub_resource(Section::sub_resource("SpatialMaterial", 1).prop("roughness", 0.5_f32));
        doc.push_ext_resource(Section::ext_resource("res://a.tres", "Material", 1));

        let text = doc.to_string();
        assert!(text.starts_with("[gd_scene load_steps=3 format=2]\n\n[ext_resource path=\"res://a.tres\""));
        let ext = text.find("[ext_resource").unwrap();
        let sub = text.find("[sub_resource").unwrap();
        let node = text.find("[node").unwrap();
        assert!(ext < sub && sub < node);
    }

    #[test]
    fn test_resource_header() {
        let mut doc = Document::resource("SpatialMaterial");
        doc.push_body(Section::new("resource"));
        assert_eq!(
            doc.to_string(),
            "[gd_resource type=\"SpatialMaterial\" load_steps=1 format=2]\n\n[resource]\n"
        );
    }
}
