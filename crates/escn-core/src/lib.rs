//! escn-exporter core library
//!
//! This crate provides the error taxonomy, math helpers and small value
//! types shared by the scene model and the exporter.

pub mod error;
pub mod types;

pub use error::{Error, Result, ResultExt, ValidationError};
pub use types::*;

/// Re-export of the math library so dependents agree on one version
pub use glam;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::error::{Error, Result, ResultExt, ValidationError};
    pub use crate::types::*;
    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
}
