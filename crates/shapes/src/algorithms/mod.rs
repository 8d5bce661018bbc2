pub mod preprocessing;
pub mod extraction;
pub mod filtering;
pub mod geometry;
pub mod classification;
pub mod annotation;

pub use preprocessing::*;
pub use extraction::*;
pub use filtering::*;
pub use geometry::{approximate_polygon, Circle, RotatedRect};
pub use classification::*;
pub use annotation::*;
