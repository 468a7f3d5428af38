pub mod config;
pub mod models;
pub mod problem;
pub mod solver;
pub mod sweep;

pub use config::{BackorderPricing, InitialInventory, ModelOptions, SweepConfig};
pub use problem::{Attribution, ConfigurationError, InstanceData, Tables};
pub use sweep::{evaluate, sweep, EvaluateError};
