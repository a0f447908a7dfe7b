//! Serde adapters for snapshot files
//!
//! Matrices are written the way the host prints them: four rows of four
//! numbers, translation in the last column.

use glam::Mat4;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// `Mat4` as `[[f32; 4]; 4]` in row-major order
pub mod mat4_rows {
    use super::*;

    pub fn serialize<S: Serializer>(m: &Mat4, serializer: S) -> Result<S::Ok, S::Error> {
        m.transpose().to_cols_array_2d().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Mat4, D::Error> {
        let rows = <[[f32; 4]; 4]>::deserialize(deserializer)?;
        Ok(Mat4::from_cols_array_2d(&rows).transpose())
    }
}

/// `Option<Mat4>` as optional row-major rows
pub mod opt_mat4_rows {
    use super::*;

    pub fn serialize<S: Serializer>(m: &Option<Mat4>, serializer: S) -> Result<S::Ok, S::Error> {
        m.map(|m| m.transpose().to_cols_array_2d()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Mat4>, D::Error> {
        let rows = Option::<[[f32; 4]; 4]>::deserialize(deserializer)?;
        Ok(rows.map(|rows| Mat4::from_cols_array_2d(&rows).transpose()))
    }
}

pub(crate) fn identity() -> Mat4 {
    Mat4::IDENTITY
}

pub(crate) const fn default_true() -> bool {
    true
}

pub(crate) const fn default_one() -> f32 {
    1.0
}
