//! Common types shared by the marker rendering crates.

pub mod bbox;
pub mod color;
pub mod error;
pub mod expression;
pub mod geometry;
pub mod style;
pub mod transform;

pub use bbox::BoundingBox;
pub use color::Color;
pub use error::{MarkerError, MarkerResult};
pub use expression::Expression;
pub use geometry::{Coord, Feature, Geometry, GeometryType, Polygon};
pub use style::{PropertyKey, PropertyValue, StyleProperties, Value};
pub use transform::{TransformList, TransformOp};
