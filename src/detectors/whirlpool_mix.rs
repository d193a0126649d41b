//! Whirlpool Mix (remix round) detector.
//!
//! Unlike the other five detectors, a Whirlpool mix round has a fixed
//! shape: exactly five participants, five equal-valued outputs at a known
//! pool denomination, five structurally matching inputs. The first two
//! conditions gate the rest: a structural mismatch or an unrecognized
//! denomination means confidence is zero outright, not partial credit.

use crate::config::Config;
use crate::detectors::{Detector, Variant, Verdict};
use crate::feature::FeatureRecord;

const WHIRLPOOL_MIX_PARTICIPANTS: u64 = 5;

pub struct WhirlpoolMixDetector;

impl Detector for WhirlpoolMixDetector {
    fn variant(&self) -> Variant {
        Variant::WhirlpoolMix
    }

    fn evaluate(&self, features: &FeatureRecord, config: &Config) -> Verdict {
        let inputs = &features.input_values;
        let outputs = &features.output_values;

        let condition1 = inputs.len() == 5
            && outputs.len() == 5
            && features.nscripts_in == 5
            && features.nscripts_out == 5;

        if !condition1 {
            let mut diagnostic = std::collections::BTreeMap::new();
            diagnostic.insert(
                "error".to_string(),
                "transaction is not a 5-input/5-output structure".to_string(),
            );
            return Verdict {
                confidence: 0.0,
                participants: None,
                denomination: None,
                reasons: Vec::new(),
                conditions_met: vec![false, false, false, false],
                diagnostic,
            };
        }

        // Find a configured pool denomination that exactly 5 outputs equal.
        let matched_pool = config
            .whirlpool_pools
            .iter()
            .find(|p| outputs.iter().filter(|&&v| v == p.denomination).count() == 5);

        let Some(pool) = matched_pool else {
            return Verdict {
                confidence: 0.0,
                participants: Some(WHIRLPOOL_MIX_PARTICIPANTS),
                denomination: None,
                reasons: vec![
                    "5x5 structure condition met but no pool denomination matched".to_string(),
                ],
                conditions_met: vec![true, false, false, false],
                diagnostic: std::collections::BTreeMap::new(),
            };
        };
        let d = pool.denomination;
        let epsilon_max = config.whirlpool_mix.epsilon_max;

        let condition3 = inputs.iter().all(|&v| v >= d && v <= d + epsilon_max);
        let above_d = inputs.iter().filter(|&&v| v > d).count();
        let condition4 = (1..=4).contains(&above_d);

        let mut confidence = 0.5;
        let mut reasons = vec![
            "5x5 structure condition met: 5 inputs, 5 outputs, all scripts distinct".to_string(),
        ];

        if condition3 {
            confidence += 0.3;
            reasons.push(format!(
                "input range condition met: all inputs within [{d}, {}]",
                d + epsilon_max
            ));
        }
        if condition4 {
            confidence += 0.2;
            reasons.push(format!(
                "remix fee condition met: {above_d} inputs strictly greater than {d}"
            ));
        }

        let mut diagnostic = std::collections::BTreeMap::new();
        diagnostic.insert("d".to_string(), d.to_string());
        diagnostic.insert("above_d".to_string(), above_d.to_string());

        Verdict {
            confidence,
            participants: Some(WHIRLPOOL_MIX_PARTICIPANTS),
            denomination: Some(d),
            reasons,
            conditions_met: vec![true, true, condition3, condition4],
            diagnostic,
        }
        .clamp_confidence()
    }
}
