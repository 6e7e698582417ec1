mod color_range;
mod shape;
mod state;

pub use color_range::{ColorRange, HUE_MAX};
pub use shape::{BoundingBox, ClassifiedShape, ShapeKind};
pub use state::ControllerState;
