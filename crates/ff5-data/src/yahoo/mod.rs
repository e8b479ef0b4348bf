//! Yahoo Finance price history and its conversion to returns.

pub mod quotes;
pub mod returns;

pub use quotes::{YAHOO_SOURCE_ID, YahooQuoteProvider};
pub use returns::{PricePoint, price_points, prices_frame, simple_returns};
