//! JoinMarket detector.

use crate::config::Config;
use crate::detectors::{Detector, Variant, Verdict};
use crate::feature::FeatureRecord;

pub struct JoinMarketDetector;

impl Detector for JoinMarketDetector {
    fn variant(&self) -> Variant {
        Variant::JoinMarket
    }

    fn evaluate(&self, features: &FeatureRecord, _config: &Config) -> Verdict {
        let hist = &features.output_histogram;
        if hist.is_empty() {
            return Verdict::unevaluable("no output values found");
        }

        let n_hat = hist.max_multiplicity();
        let delta_out = features.output_values.len();
        let nscripts_in = features.nscripts_in;
        let nscripts_out = features.nscripts_out;

        let condition1 = (n_hat as f64) >= (delta_out as f64) / 2.0;
        let condition2 = nscripts_in >= 3;
        let condition3 = delta_out == nscripts_out;

        let mut confidence = 0.0;
        let mut reasons = Vec::new();

        if condition1 {
            confidence += 0.4;
            reasons.push(format!(
                "condition 1 met: n={n_hat} >= |delta_out|/2={}",
                delta_out as f64 / 2.0
            ));
        }
        if condition2 {
            confidence += 0.4;
            reasons.push(format!("condition 2 met: nscripts_in={nscripts_in} >= 3"));
        }
        if condition3 {
            confidence += 0.2;
            reasons.push(format!(
                "condition 3 met: |delta_out|={delta_out} = nscripts_out={nscripts_out}"
            ));
        }

        let denomination = hist.values_at_max().first().copied();

        let mut diagnostic = std::collections::BTreeMap::new();
        diagnostic.insert("n_hat".to_string(), n_hat.to_string());
        diagnostic.insert("delta_out".to_string(), delta_out.to_string());
        diagnostic.insert("nscripts_in".to_string(), nscripts_in.to_string());
        diagnostic.insert("nscripts_out".to_string(), nscripts_out.to_string());

        Verdict {
            confidence,
            participants: Some(n_hat as u64),
            denomination,
            reasons,
            conditions_met: vec![condition1, condition2, condition3],
            diagnostic,
        }
        .clamp_confidence()
    }
}
