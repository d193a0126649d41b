//! Wasabi 1.0 detector.

use crate::config::Config;
use crate::detectors::{Detector, Variant, Verdict};
use crate::feature::FeatureRecord;

pub struct Wasabi1_0Detector;

/// Pick the `D_max` candidate closest to `target`; ties favor the smaller
/// value (ties favor the smallest value).
pub(crate) fn closest_to_target(candidates: &[u64], target: u64) -> u64 {
    *candidates
        .iter()
        .min_by_key(|&&v| (v.abs_diff(target), v))
        .expect("candidates must be non-empty")
}

/// Shared Wasabi 1.0-shaped input/output constraints, reused by Wasabi 1.1
/// and Wasabi 2.0.
pub(crate) struct CommonConditions {
    pub condition2_input_constraints: bool,
    pub condition3_output_count: bool,
    pub condition4_unique_scripts: bool,
}

pub(crate) fn common_conditions(
    features: &FeatureRecord,
    n_hat: usize,
    amax: u64,
) -> CommonConditions {
    let num_inputs = features.input_values.len();
    let delta_out = features.output_values.len();

    let condition2 = n_hat <= features.nscripts_in
        && features.nscripts_in <= num_inputs
        && (num_inputs as u64) <= amax * (n_hat as u64);

    let condition3 = (n_hat as f64) >= (delta_out as f64 - 1.0) / 2.0;
    let condition4 = delta_out == features.nscripts_out;

    CommonConditions {
        condition2_input_constraints: condition2,
        condition3_output_count: condition3,
        condition4_unique_scripts: condition4,
    }
}

impl Detector for Wasabi1_0Detector {
    fn variant(&self) -> Variant {
        Variant::Wasabi1_0
    }

    fn evaluate(&self, features: &FeatureRecord, config: &Config) -> Verdict {
        let hist = &features.output_histogram;
        if hist.is_empty() {
            return Verdict::unevaluable("no output values found");
        }

        let cfg = config.wasabi_1_0;
        let n_hat = hist.max_multiplicity();
        let d_max = hist.values_at_max();
        let d_hat = closest_to_target(&d_max, cfg.target);

        let condition1 = d_hat >= cfg.target.saturating_sub(cfg.epsilon)
            && d_hat <= cfg.target + cfg.epsilon;

        let common = common_conditions(features, n_hat, cfg.amax);

        let mut confidence = 0.0;
        let mut reasons = Vec::new();

        if condition1 {
            confidence += 0.4;
            reasons.push(format!(
                "denomination condition met: {d_hat} sat within {} sat of target {}",
                cfg.epsilon, cfg.target
            ));
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

        let mut diagnostic = std::collections::BTreeMap::new();
        diagnostic.insert("n_hat".to_string(), n_hat.to_string());
        diagnostic.insert("d_hat".to_string(), d_hat.to_string());
        diagnostic.insert("target".to_string(), cfg.target.to_string());
        diagnostic.insert("epsilon".to_string(), cfg.epsilon.to_string());

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
            ],
            diagnostic,
        }
        .clamp_confidence()
    }
}
