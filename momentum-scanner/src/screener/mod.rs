//! Market-wide screener access.
//!
//! One bulk query returns the whole equity universe with pre-computed
//! moving averages, 52-week range, volume statistics and performance
//! horizons. Rows are decoded into [`ScreenerRow`] and everything
//! downstream works on that typed universe.

mod query;
mod tradingview;

pub use query::{
    split_ticker, ScreenerError, ScreenerFrame, ScreenerQuery, ScreenerRow, ScreenerSource,
    SCREENER_COLUMNS,
};
pub use tradingview::{decode_row, TradingViewScreener};
