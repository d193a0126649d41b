/// Configuration construction failures.
///
/// These are the only errors the engine can raise: well-typed per-transaction
/// input never produces a hard error, only a negative classification or a
/// zero-confidence verdict with a diagnostic note (see [`crate::detectors::Verdict`]).
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `confidence_threshold` was outside `[0, 1]`.
    ThresholdOutOfRange(f64),
    /// A denomination set (Wasabi 2.0) was empty.
    EmptyDenominationSet,
    /// The Whirlpool pool list was empty.
    EmptyPoolList,
    /// A configured epsilon/bound was negative where only non-negative
    /// values make sense.
    NegativeBound { field: &'static str, value: f64 },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ThresholdOutOfRange(v) => {
                write!(f, "confidence_threshold {v} is outside [0, 1]")
            }
            ConfigError::EmptyDenominationSet => {
                write!(f, "wasabi_2_0 denomination set must not be empty")
            }
            ConfigError::EmptyPoolList => {
                write!(f, "whirlpool_pools must not be empty")
            }
            ConfigError::NegativeBound { field, value } => {
                write!(f, "{field} must be non-negative, got {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
