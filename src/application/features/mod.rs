pub mod efficiency_ratio;
pub mod feature_builder;

pub use efficiency_ratio::{mean_efficiency_ratio, rolling_efficiency_ratio};
pub use feature_builder::FeatureBuilder;
