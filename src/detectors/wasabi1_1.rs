//! Wasabi 1.1 detector.
//!
//! All four Wasabi 1.0 conditions plus a fifth "mixing level" condition.
//! The five weights (0.4/0.3/0.2/0.1/0.1) are kept exactly as listed even
//! though they can sum above 1.0; the result is clamped, not renormalized.

use crate::config::Config;
use crate::detectors::wasabi1_0::{closest_to_target, common_conditions};
use crate::detectors::{Detector, Variant, Verdict};
use crate::feature::FeatureRecord;

pub struct Wasabi1_1Detector;

impl Detector for Wasabi1_1Detector {
    fn variant(&self) -> Variant {
        Variant::Wasabi1_1
    }

    fn evaluate(&self, features: &FeatureRecord, config: &Config) -> Verdict {
        let hist = &features.output_histogram;
        if hist.is_empty() {
            return Verdict::unevaluable("no output values found");
        }

        let cfg = config.wasabi_1_1;
        let n_hat = hist.max_multiplicity();
        let d_max = hist.values_at_max();
        let d_hat = closest_to_target(&d_max, cfg.target);

        let condition1 = d_hat >= cfg.target.saturating_sub(cfg.epsilon)
            && d_hat <= cfg.target + cfg.epsilon;

        let common = common_conditions(features, n_hat, cfg.amax);
        let condition5 = (n_hat as u64) <= cfg.max_mixing_level;

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
        if condition5 {
            confidence += 0.1;
            reasons.push(format!(
                "mixing level condition met: n={n_hat} <= max_mixing_level={}",
                cfg.max_mixing_level
            ));
        }

        let mut diagnostic = std::collections::BTreeMap::new();
        diagnostic.insert("n_hat".to_string(), n_hat.to_string());
        diagnostic.insert("d_hat".to_string(), d_hat.to_string());
        diagnostic.insert(
            "max_mixing_level".to_string(),
            cfg.max_mixing_level.to_string(),
        );

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
