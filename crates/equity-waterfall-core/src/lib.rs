pub mod batch;
pub mod error;
pub mod time_value;
pub mod types;
pub mod waterfall;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

pub use error::WaterfallError;
pub use types::*;
pub use waterfall::{apply_equity_waterfall, WaterfallConfig, WaterfallOutput};

/// Standard result type for all waterfall operations
pub type WaterfallResult<T> = Result<T, WaterfallError>;
