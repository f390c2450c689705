pub mod config;
pub mod error;
pub mod features;
pub mod types;

pub use config::{EnvConfig, FileConfig, RunSettings};
pub use error::RippleError;
pub use features::{FeatureKind, FeatureSet, FeatureVector, HubRule};
pub use types::*;
