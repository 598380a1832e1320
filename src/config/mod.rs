//! Configuration loading for erclust.
//!
//! - Analysis parameters come from environment variables (`.env` supported)
//! - The instrument universe comes from a TOML file or the command line

mod analysis_env_config;
mod universe_config;

pub use analysis_env_config::AnalysisEnvConfig;
pub use universe_config::UniverseConfig;
