// Price history providers
pub mod market_data;

pub use market_data::{CsvPriceSource, SyntheticPriceSource, WalkProfile};
