pub use bounding_box::BoundingBox;
pub use point::Point;

pub mod bezier;
mod bounding_box;
mod point;
