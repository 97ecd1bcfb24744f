//! Configuration loading and validation.

pub mod loader;
pub mod model;

pub use loader::load_and_validate;
pub use model::{AppConfig, Deadline, EncodingDefaults};
