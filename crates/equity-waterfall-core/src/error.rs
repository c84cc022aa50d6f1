use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum WaterfallError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid percentage for equity class '{class_id}': {field} = {value} (must lie in (0, 1] after normalization)")]
    InvalidPercentage {
        class_id: String,
        field: String,
        value: Decimal,
    },

    #[error("Tier '{tier_id}' is missing required parameter '{parameter}'")]
    MissingTierParameter { tier_id: String, parameter: String },

    #[error("Multi-tier waterfall requested with no tiers")]
    NoTiers,

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Numeric overflow in {context}")]
    NumericOverflow { context: String },

    #[error("Batch cancelled after {completed} evaluations")]
    Cancelled { completed: usize },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for WaterfallError {
    fn from(e: serde_json::Error) -> Self {
        WaterfallError::SerializationError(e.to_string())
    }
}
