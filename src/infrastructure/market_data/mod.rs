pub mod csv_price_source;
pub mod synthetic_price_source;

pub use csv_price_source::CsvPriceSource;
pub use synthetic_price_source::{SyntheticPriceSource, WalkProfile};
