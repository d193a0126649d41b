//! Whirlpool Tx0 (pre-mix) detector.

use crate::config::{Config, WhirlpoolPool};
use crate::detectors::{Detector, Variant, Verdict};
use crate::feature::FeatureRecord;

pub struct WhirlpoolTx0Detector;

impl Detector for WhirlpoolTx0Detector {
    fn variant(&self) -> Variant {
        Variant::WhirlpoolTx0
    }

    fn evaluate(&self, features: &FeatureRecord, config: &Config) -> Verdict {
        let cfg = config.whirlpool_tx0;
        let pools = &config.whirlpool_pools;
        let outputs = &features.output_values;
        let num_outputs = outputs.len();

        // Candidates: every output value that falls within [d + epsilon_min, d + epsilon_max]
        // of some pool denomination d.
        let candidates: Vec<u64> = outputs
            .iter()
            .copied()
            .filter(|&v| {
                pools.iter().any(|p| {
                    let lower = p.denomination + cfg.epsilon_min;
                    let upper = p.denomination + cfg.epsilon_max;
                    v >= lower && v <= upper
                })
            })
            .collect();

        if candidates.is_empty() {
            return Verdict::unevaluable("no candidate pre-mix values found");
        }

        // d_tilde: most frequent candidate value, ties broken by larger value.
        let mut counts: std::collections::HashMap<u64, usize> = std::collections::HashMap::new();
        for &c in &candidates {
            *counts.entry(c).or_insert(0) += 1;
        }
        let d_tilde = *counts
            .iter()
            .max_by_key(|&(&v, &c)| (c, v))
            .map(|(v, _)| v)
            .expect("candidates is non-empty");

        // Matching pool: largest d such that d <= d_tilde.
        let matched_pool: Option<&WhirlpoolPool> = pools
            .iter()
            .filter(|p| p.denomination <= d_tilde)
            .max_by_key(|p| p.denomination);

        let Some(pool) = matched_pool else {
            return Verdict::unevaluable("no matching pool found");
        };

        let d_hat = pool.denomination;
        let f_hat = pool.coordinator_fee;
        let epsilon_tilde = d_tilde - d_hat;

        let k_pre = outputs.iter().filter(|&&v| v == d_tilde).count();
        let fee_lower = cfg.eta1 * f_hat as f64;
        let fee_upper = cfg.eta2 * f_hat as f64;
        let k_fee = outputs
            .iter()
            .filter(|&&v| {
                let v = v as f64;
                v >= fee_lower && v <= fee_upper
            })
            .count();
        let k_zero = outputs.iter().filter(|&&v| v == 0).count();

        let condition1 = (k_pre as i64) >= (num_outputs as i64) - 3;
        let condition2 = k_pre >= 1 && k_fee == 1 && k_zero == 1;
        let condition3 = k_pre as u64 <= cfg.amax;
        let condition4 = epsilon_tilde >= cfg.epsilon_min && epsilon_tilde <= cfg.epsilon_max;

        let mut confidence = 0.0;
        let mut reasons = Vec::new();

        if condition1 {
            confidence += 0.4;
            reasons.push(format!(
                "pre-mix count condition met: k_pre={k_pre} >= |delta_out|-3={}",
                num_outputs as i64 - 3
            ));
        }
        if condition2 {
            confidence += 0.3;
            reasons.push(format!(
                "required outputs met: {k_pre} pre-mix, {k_fee} coordinator fee, {k_zero} zero-value"
            ));
        }
        if condition3 {
            confidence += 0.2;
            reasons.push(format!("max pre-mix condition met: k_pre={k_pre} <= amax={}", cfg.amax));
        }
        if condition4 {
            confidence += 0.1;
            reasons.push(format!(
                "epsilon condition met: {} <= epsilon_tilde={epsilon_tilde} <= {}",
                cfg.epsilon_min, cfg.epsilon_max
            ));
        }

        let mut diagnostic = std::collections::BTreeMap::new();
        diagnostic.insert("d_tilde".to_string(), d_tilde.to_string());
        diagnostic.insert("d_hat".to_string(), d_hat.to_string());
        diagnostic.insert("f_hat".to_string(), f_hat.to_string());
        diagnostic.insert("epsilon_tilde".to_string(), epsilon_tilde.to_string());
        diagnostic.insert("k_pre".to_string(), k_pre.to_string());
        diagnostic.insert("k_fee".to_string(), k_fee.to_string());
        diagnostic.insert("k_zero".to_string(), k_zero.to_string());

        Verdict {
            confidence,
            participants: Some(k_pre as u64),
            denomination: Some(d_hat),
            reasons,
            conditions_met: vec![condition1, condition2, condition3, condition4],
            diagnostic,
        }
        .clamp_confidence()
    }
}
