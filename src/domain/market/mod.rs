pub mod alignment;
pub mod price_series;

pub use alignment::align_on_common_timestamps;
pub use price_series::{Candle, PricePoint, PriceSeries};
