//! Transaction Feature Extractor.
//!
//! Normalizes a [`TxView`] into a [`FeatureRecord`], or short-circuits to a
//! negative classification reason when the transaction is structurally too
//! small or degenerate to analyze. Pure, no I/O.

use crate::histogram::ValueHistogram;
use crate::types::TxView;

/// Immutable, derived-convenience view of a transaction ready for the
/// detector suite.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    /// Values of every non-coinbase input, in order. An input lacking a
    /// resolved `prev_value` contributes `0` here.
    pub input_values: Vec<u64>,
    /// Values of every output, in order.
    pub output_values: Vec<u64>,
    /// Distinct locking scripts among non-coinbase inputs that have a
    /// resolved `prev_value` — inputs without a value do not contribute to
    /// this count.
    pub nscripts_in: usize,
    /// Distinct locking scripts among all outputs. A missing script counts
    /// as a distinct, unnamed script per output.
    pub nscripts_out: usize,
    /// Output value histogram in first-seen order.
    pub output_histogram: ValueHistogram,
}

impl FeatureRecord {
    pub fn total_input(&self) -> u64 {
        self.input_values.iter().sum()
    }

    pub fn total_output(&self) -> u64 {
        self.output_values.iter().sum()
    }
}

/// Result of running the feature extractor: either a usable record, or a
/// reason the transaction was rejected before any detector ran.
pub enum ExtractOutcome {
    Usable(FeatureRecord),
    Negative(&'static str),
}

/// Distinguishes scripts by content when present, and by position when
/// absent, so that two "missing script" slots never collide into one
/// script: a missing script counts as its own distinct, unnamed script.
#[derive(PartialEq, Eq, Hash)]
enum ScriptKey {
    Named(Vec<u8>),
    Unnamed(usize),
}

pub fn extract(tx: &dyn TxView) -> ExtractOutcome {
    let inputs = tx.inputs();
    let outputs = tx.outputs();

    let non_coinbase: Vec<_> = inputs.iter().filter(|i| !i.coinbase).collect();

    if non_coinbase.is_empty() {
        return ExtractOutcome::Negative("coinbase / insufficient inputs");
    }

    if non_coinbase.len() < 2 || outputs.len() < 2 {
        return ExtractOutcome::Negative("insufficient inputs/outputs for CoinJoin");
    }

    let input_values: Vec<u64> = non_coinbase.iter().map(|i| i.prev_value.unwrap_or(0)).collect();

    let mut in_scripts = std::collections::HashSet::new();
    for (idx, inp) in non_coinbase.iter().enumerate() {
        if inp.prev_value.is_none() {
            continue; // doesn't contribute to nscripts_in
        }
        let key = match &inp.prev_script {
            Some(bytes) => ScriptKey::Named(bytes.clone()),
            None => ScriptKey::Unnamed(idx),
        };
        in_scripts.insert(key);
    }

    let output_values: Vec<u64> = outputs.iter().map(|o| o.value).collect();

    let mut out_scripts = std::collections::HashSet::new();
    for (idx, out) in outputs.iter().enumerate() {
        let key = match &out.script {
            Some(bytes) => ScriptKey::Named(bytes.clone()),
            None => ScriptKey::Unnamed(idx),
        };
        out_scripts.insert(key);
    }

    let output_histogram = ValueHistogram::from_values(&output_values);

    ExtractOutcome::Usable(FeatureRecord {
        input_values,
        output_values,
        nscripts_in: in_scripts.len(),
        nscripts_out: out_scripts.len(),
        output_histogram,
    })
}
