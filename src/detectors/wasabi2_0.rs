//! Wasabi 2.0 detector.

use crate::config::Config;
use crate::detectors::wasabi1_0::common_conditions;
use crate::detectors::{Detector, Variant, Verdict};
use crate::feature::FeatureRecord;

pub struct Wasabi2_0Detector;

/// Distance from `v` to the nearest fixed denomination in `denominations`.
fn min_distance(v: u64, denominations: &[u64]) -> u64 {
    denominations
        .iter()
        .map(|&s| v.abs_diff(s))
        .min()
        .unwrap_or(u64::MAX)
}

/// Pick the `D_max` candidate nearest any fixed denomination; ties favor
/// the smaller value for determinism, consistent with the tie-break rule
/// used by the other detectors.
fn closest_to_any(candidates: &[u64], denominations: &[u64]) -> u64 {
    *candidates
        .iter()
        .min_by_key(|&&v| (min_distance(v, denominations), v))
        .expect("candidates must be non-empty")
}

impl Detector for Wasabi2_0Detector {
    fn variant(&self) -> Variant {
        Variant::Wasabi2_0
    }

    fn evaluate(&self, features: &FeatureRecord, config: &Config) -> Verdict {
        let hist = &features.output_histogram;
        if hist.is_empty() {
            return Verdict::unevaluable("no output values found");
        }

        let cfg = &config.wasabi_2_0;
        let n_hat = hist.max_multiplicity();
        let d_max = hist.values_at_max();
        let d_hat = closest_to_any(&d_max, &cfg.denominations);

        let condition1 = cfg.denominations.contains(&d_hat);
        let common = common_conditions(features, n_hat, cfg.amax);
        let condition5 = d_hat >= cfg.vmin;

        let mut confidence = 0.0;
        let mut reasons = Vec::new();

        if condition1 {
            confidence += 0.4;
            reasons.push(format!("denomination condition met: {d_hat} sat is a fixed denomination"));
        }
        if common.condition2_input_constraints {
            confidence += 0.3;
            reasons.push(format!(
                "input constraints met: {n_hat} <= nscripts_in={} <= num_inputs={} <= amax*n={}",
                features.nscripts_in,
                features.input_values.len(),
                cfg.amax * n_hat as u64
            ));
        }
        if common.condition3_output_count {
            confidence += 0.2;
            reasons.push(format!(
                "output count condition met: n={n_hat} >= (|delta_out|-1)/2"
            ));
        }
        if common.condition4_unique_scripts {
            confidence += 0.1;
            reasons.push(format!(
                "unique scripts condition met: |delta_out|={} = nscripts_out={}",
                features.output_values.len(),
                features.nscripts_out
            ));
        }
        if condition5 {
            confidence += 0.1;
            reasons.push(format!("vmin condition met: {d_hat} >= {}", cfg.vmin));
        }

        let mut diagnostic = std::collections::BTreeMap::new();
        diagnostic.insert("n_hat".to_string(), n_hat.to_string());
        diagnostic.insert("d_hat".to_string(), d_hat.to_string());
        diagnostic.insert("vmin".to_string(), cfg.vmin.to_string());

        Verdict {
            confidence,
            participants: Some(n_hat as u64),
            denomination: Some(d_hat),
            reasons,
            conditions_met: vec![
                condition1,
                common.condition2_input_constraints,
                common.condition3_output_count,
                common.condition4_unique_scripts,
                condition5,
            ],
            diagnostic,
        }
        .clamp_confidence()
    }
}
