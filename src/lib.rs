pub mod common;
pub mod config;
pub mod coordinator;
pub mod device;
pub mod error;
pub mod intake;
pub mod pipeline;

#[cfg(test)]
mod test_support;

pub use config::Configuration;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use error::AppError;
