//! Text scene format primitives
//!
//! The format is line based: bracketed section headings followed by
//! `key = value` properties. [`Value`] renders every value type the exporter
//! emits; [`document`] assembles sections into scene and resource files.
//!
//! Rendering is fully deterministic. Floats use the shortest representation
//! that round-trips, always carry a decimal point, and `-0` prints as `0.0`.

pub mod document;

use std::fmt::{self, Display, Write as _};

use escn_core::Color;
use glam::{Mat4, Quat, Vec2, Vec3};

pub use document::{Document, DocumentKind, Section};

/// Property or attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f32),
    Str(String),
    NodePath(String),
    SubResource(u32),
    ExtResource(u32),
    Vector3(Vec3),
    Quat(Quat),
    Color(Color),
    Transform(Mat4),
    Vector3Array(Vec<Vec3>),
    Vector2Array(Vec<Vec2>),
    ColorArray(Vec<Color>),
    IntArray(Vec<i32>),
    RealArray(Vec<f32>),
    StringArray(Vec<String>),
    Array(Vec<Value>),
    /// Ordered dictionary
    Dict(Vec<(String, Value)>),
}

impl Value {
    /// Quoted string value
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Node path value
    pub fn node_path(s: impl Into<String>) -> Self {
        Self::NodePath(s.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Color> for Value {
    fn from(v: Color) -> Self {
        Self::Color(v)
    }
}

/// Shortest round-trip float text with a guaranteed decimal point
pub fn format_float(v: f32) -> String {
    if !v.is_finite() {
        return "0.0".to_string();
    }
    let v = if v == 0.0 { 0.0 } else { v };
    let mut text = v.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    text
}

/// Quote a string, escaping backslashes and double quotes
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn write_floats(f: &mut fmt::Formatter<'_>, name: &str, values: impl Iterator<Item = f32>) -> fmt::Result {
    let mut body = String::new();
    for (i, v) in values.enumerate() {
        if i > 0 {
            body.push_str(", ");
        }
        body.push_str(&format_float(v));
    }
    write!(f, "{name}( {body} )")
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => f.write_str(&format_float(*v)),
            Self::Str(s) => f.write_str(&quote(s)),
            Self::NodePath(s) => write!(f, "NodePath({})", quote(s)),
            Self::SubResource(id) => write!(f, "SubResource( {id} )"),
            Self::ExtResource(id) => write!(f, "ExtResource( {id} )"),
            Self::Vector3(v) => write_floats(f, "Vector3", v.to_array().into_iter()),
            Self::Quat(q) => write_floats(f, "Quat", q.to_array().into_iter()),
            Self::Color(c) => write_floats(f, "Color", c.to_array().into_iter()),
            Self::Transform(m) => {
                // Basis rows, then origin
                let values = [
                    m.x_axis.x, m.y_axis.x, m.z_axis.x,
                    m.x_axis.y, m.y_axis.y, m.z_axis.y,
                    m.x_axis.z, m.y_axis.z, m.z_axis.z,
                    m.w_axis.x, m.w_axis.y, m.w_axis.z,
                ];
                write_floats(f, "Transform", values.into_iter())
            }
            Self::Vector3Array(vs) => {
                write_floats(f, "PoolVector3Array", vs.iter().flat_map(|v| v.to_array()))
            }
            Self::Vector2Array(vs) => {
                write_floats(f, "PoolVector2Array", vs.iter().flat_map(|v| v.to_array()))
            }
            Self::ColorArray(cs) => {
                write_floats(f, "PoolColorArray", cs.iter().flat_map(|c| c.to_array()))
            }
            Self::RealArray(vs) => write_floats(f, "PoolRealArray", vs.iter().copied()),
            Self::IntArray(vs) => {
                let mut body = String::new();
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        body.push_str(", ");
                    }
                    let _ = write!(body, "{v}");
                }
                write!(f, "PoolIntArray( {body} )")
            }
            Self::StringArray(vs) => {
                let quoted: Vec<String> = vs.iter().map(|s| quote(s)).collect();
                write!(f, "PoolStringArray( {} )", quoted.join(", "))
            }
            Self::Array(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[ {} ]", rendered.join(", "))
            }
            Self::Dict(entries) => {
                f.write_str("{\n")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    let sep = if i + 1 < entries.len() { "," } else { "" };
                    writeln!(f, "{}: {value}{sep}", quote(key))?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_formatting() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(-0.0), "0.0");
        assert_eq!(format_float(0.5), "0.5");
        assert_eq!(format_float(f32::NAN), "0.0");
        assert_eq!(format_float(-2.25), "-2.25");
    }

    #[test]
    fn test_transform_is_row_major_then_origin() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(
            Value::Transform(m).to_string(),
            "Transform( 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 3.0 )"
        );
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(Value::str(r#"say "hi" \ bye"#).to_string(), r#""say \"hi\" \\ bye""#);
        assert_eq!(Value::node_path("..").to_string(), r#"NodePath("..")"#);
    }

    #[test]
    fn test_pool_arrays() {
        assert_eq!(Value::IntArray(vec![0, 2, 1]).to_string(), "PoolIntArray( 0, 2, 1 )");
        assert_eq!(
            Value::Vector2Array(vec![Vec2::new(0.5, 1.0)]).to_string(),
            "PoolVector2Array( 0.5, 1.0 )"
        );
        assert_eq!(Value::RealArray(vec![]).to_string(), "PoolRealArray(  )");
    }

    #[test]
    fn test_dict_keeps_order() {
        let dict = Value::Dict(vec![
            ("primitive".into(), Value::Int(4)),
            ("arrays".into(), Value::Array(vec![Value::Null, Value::Bool(true)])),
        ]);
        assert_eq!(dict.to_string(), "{\n\"primitive\": 4,\n\"arrays\": [ null, true ]\n}");
    }
}
