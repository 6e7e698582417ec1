mod actuators;
mod detection_controller;
mod notice;
mod runtime;
mod stats;

pub use actuators::ActuatorMap;
pub use detection_controller::DetectionController;
pub use notice::{Notice, NoticeLatch};
pub use runtime::{RuntimeCommand, RuntimeSettings};
pub use stats::ControllerStats;
