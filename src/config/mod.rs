pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{ConfigOverrides, load_config, load_pipeline};
pub use models::*;
pub use validation::{ServerConfigValidator, ValidationError, ValidationResult};
