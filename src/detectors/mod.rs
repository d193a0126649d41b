//! Detector Suite: six independent, composable predicate-scoring detectors,
//! one per CoinJoin protocol variant.
//!
//! Each detector needs to report participants/denomination/reasons
//! alongside its confidence, so `Detector::evaluate` returns a full
//! [`Verdict`] rather than a bare weight.

pub mod joinmarket;
pub mod wasabi1_0;
pub mod wasabi1_1;
pub mod wasabi2_0;
pub mod whirlpool_mix;
pub mod whirlpool_tx0;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::feature::FeatureRecord;

/// One of the six recognized CoinJoin protocol variants, or none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    JoinMarket,
    Wasabi1_0,
    Wasabi1_1,
    Wasabi2_0,
    WhirlpoolTx0,
    WhirlpoolMix,
}

impl Variant {
    /// All variants, in the fixed evaluation order the arbiter uses
    /// (earlier wins ties).
    pub const ORDER: [Variant; 6] = [
        Variant::JoinMarket,
        Variant::Wasabi1_0,
        Variant::Wasabi1_1,
        Variant::Wasabi2_0,
        Variant::WhirlpoolTx0,
        Variant::WhirlpoolMix,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::JoinMarket => "joinmarket",
            Variant::Wasabi1_0 => "wasabi_1_0",
            Variant::Wasabi1_1 => "wasabi_1_1",
            Variant::Wasabi2_0 => "wasabi_2_0",
            Variant::WhirlpoolTx0 => "whirlpool_tx0",
            Variant::WhirlpoolMix => "whirlpool_mix",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict produced by one detector for one transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Verdict {
    /// Always in `[0, 1]`, clamped.
    pub confidence: f64,
    pub participants: Option<u64>,
    pub denomination: Option<u64>,
    /// Short human-readable strings, one per condition that contributed,
    /// carrying the concrete numbers evaluated rather than just the
    /// condition's name.
    pub reasons: Vec<String>,
    /// Per-variant fixed-order booleans, for tests.
    pub conditions_met: Vec<bool>,
    /// Opaque intermediate values for audit: targets, epsilons, computed
    /// checks. Kept as an ordered map so output is deterministic.
    pub diagnostic: BTreeMap<String, String>,
}

impl Verdict {
    /// A zero-confidence verdict carrying an `error` diagnostic, for the
    /// "detector cannot evaluate" path (e.g. an empty output histogram) —
    /// never a panic or exception.
    pub fn unevaluable(reason: impl Into<String>) -> Self {
        let mut diagnostic = BTreeMap::new();
        diagnostic.insert("error".to_string(), reason.into());
        Verdict {
            confidence: 0.0,
            diagnostic,
            ..Default::default()
        }
    }

    pub fn clamp_confidence(mut self) -> Self {
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }
}

/// A scoring detector for one CoinJoin protocol variant.
pub trait Detector {
    fn variant(&self) -> Variant;

    /// Score `features` against `config`. Must never panic on well-typed
    /// input; an unevaluable transaction returns
    /// [`Verdict::unevaluable`] rather than erroring.
    fn evaluate(&self, features: &FeatureRecord, config: &Config) -> Verdict;
}

/// All six detectors, in the fixed evaluation order.
pub fn default_detectors() -> Vec<Box<dyn Detector + Send + Sync>> {
    vec![
        Box::new(joinmarket::JoinMarketDetector),
        Box::new(wasabi1_0::Wasabi1_0Detector),
        Box::new(wasabi1_1::Wasabi1_1Detector),
        Box::new(wasabi2_0::Wasabi2_0Detector),
        Box::new(whirlpool_tx0::WhirlpoolTx0Detector),
        Box::new(whirlpool_mix::WhirlpoolMixDetector),
    ]
}
