//! Arbiter: runs the full detector suite and picks one winner.
//!
//! Runs every detector in [`Variant::ORDER`] and picks the single
//! highest-confidence verdict that clears the configured threshold. Ties
//! are broken by evaluation order: since every detector's verdict is kept
//! (not folded into a single composite score), a tie needs an explicit
//! rule rather than falling out of the arithmetic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::detectors::{default_detectors, Detector, Variant, Verdict};
use crate::feature::FeatureRecord;

/// Final classification for one transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    /// `Some(variant)` when a detector's confidence cleared
    /// `confidence_threshold`; `None` otherwise.
    pub variant: Option<Variant>,
    /// The winning verdict (or the negative-path zero verdict if nothing
    /// qualified).
    pub verdict: Verdict,
    /// Every detector's verdict, in [`Variant::ORDER`], for audit.
    pub all_verdicts: BTreeMap<String, Verdict>,
}

impl Classification {
    pub fn is_coinjoin(&self) -> bool {
        self.variant.is_some()
    }

    fn negative(all_verdicts: BTreeMap<String, Verdict>, reason: impl Into<String>) -> Self {
        Classification {
            variant: None,
            verdict: Verdict::unevaluable(reason),
            all_verdicts,
        }
    }
}

/// Run every detector against `features` and arbitrate a single winner.
///
/// Strictly-greatest confidence wins; evaluation order (the fixed dispatch
/// order in [`Variant::ORDER`]) breaks ties, since the first detector
/// encountered with the current-best confidence is never displaced by a
/// later one scoring the same.
pub fn arbitrate(features: &FeatureRecord, config: &Config) -> Classification {
    arbitrate_with(features, config, &default_detectors())
}

pub(crate) fn arbitrate_with(
    features: &FeatureRecord,
    config: &Config,
    detectors: &[Box<dyn Detector + Send + Sync>],
) -> Classification {
    let mut all_verdicts = BTreeMap::new();
    let mut best: Option<(Variant, Verdict)> = None;

    for detector in detectors {
        let variant = detector.variant();
        let verdict = detector.evaluate(features, config);
        tracing::debug!(%variant, confidence = verdict.confidence, "detector verdict");

        let is_better = match &best {
            Some((_, current)) => verdict.confidence > current.confidence,
            None => true,
        };
        if is_better {
            best = Some((variant, verdict.clone()));
        }
        all_verdicts.insert(variant.as_str().to_string(), verdict);
    }

    match best {
        Some((variant, verdict)) if verdict.confidence >= config.confidence_threshold => {
            tracing::trace!(%variant, confidence = verdict.confidence, "arbiter picked variant");
            Classification {
                variant: Some(variant),
                verdict,
                all_verdicts,
            }
        }
        _ => Classification::negative(all_verdicts, "no detector reached confidence_threshold"),
    }
}

/// Convenience entry point for callers who only care whether a transaction
/// is some flavor of Whirlpool: whichever of Tx0/Mix scores higher,
/// regardless of `confidence_threshold`. Does not affect [`arbitrate`]'s
/// behavior.
pub fn classify_legacy_whirlpool(features: &FeatureRecord, config: &Config) -> Verdict {
    let detectors = default_detectors();
    let tx0 = detectors
        .iter()
        .find(|d| d.variant() == Variant::WhirlpoolTx0)
        .expect("whirlpool_tx0 is always registered")
        .evaluate(features, config);
    let mix = detectors
        .iter()
        .find(|d| d.variant() == Variant::WhirlpoolMix)
        .expect("whirlpool_mix is always registered")
        .evaluate(features, config);

    if mix.confidence > tx0.confidence {
        mix
    } else {
        tx0
    }
}
