//! The transaction view the engine consumes and its adapters.
//!
//! The engine never parses wire bytes or talks to an RPC client itself — it
//! consumes an already-materialized [`TxView`]. Two implementations are
//! provided: [`RawTxView`], a plain owned struct for JSON-shaped callers
//! (e.g. a Blockstream-style block explorer response), and [`BitcoinTxView`],
//! a zero-copy-ish adapter over `bitcoin::Transaction` plus resolved
//! prevouts.

use serde::{Deserialize, Serialize};

/// One transaction input as the engine sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputView {
    /// Value of the previous output being spent, in satoshis. `None` when
    /// the prevout could not be resolved.
    pub prev_value: Option<u64>,
    /// Locking script of the previous output being spent. `None` when
    /// unresolved or unknown.
    #[serde(default, with = "opt_hex")]
    pub prev_script: Option<Vec<u8>>,
    /// Whether this input spends the coinbase (null) outpoint.
    #[serde(default)]
    pub coinbase: bool,
}

impl InputView {
    pub fn new(prev_value: Option<u64>, prev_script: Option<Vec<u8>>, coinbase: bool) -> Self {
        Self {
            prev_value,
            prev_script,
            coinbase,
        }
    }
}

/// One transaction output as the engine sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputView {
    /// Value in satoshis.
    pub value: u64,
    /// Locking script. `None` only for malformed/stripped data — still
    /// contributes a value to the output list.
    #[serde(default, with = "opt_hex")]
    pub script: Option<Vec<u8>>,
}

impl OutputView {
    pub fn new(value: u64, script: Option<Vec<u8>>) -> Self {
        Self { value, script }
    }
}

/// Opaque, ordered view over a transaction's inputs and outputs.
pub trait TxView {
    fn inputs(&self) -> &[InputView];
    fn outputs(&self) -> &[OutputView];
}

/// Owned, JSON-friendly transaction view for callers that only have a
/// block-explorer-shaped document — a thin adapter over any JSON-shaped
/// transaction from an upstream block explorer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTxView {
    pub inputs: Vec<InputView>,
    pub outputs: Vec<OutputView>,
}

impl TxView for RawTxView {
    fn inputs(&self) -> &[InputView] {
        &self.inputs
    }

    fn outputs(&self) -> &[OutputView] {
        &self.outputs
    }
}

/// Adapter over a parsed `bitcoin::Transaction` plus its resolved prevouts.
///
/// `prevouts[i]` corresponds to `tx.input[i]`; pass `None` for any input
/// whose prevout the caller could not resolve.
pub struct BitcoinTxView {
    inputs: Vec<InputView>,
    outputs: Vec<OutputView>,
}

impl BitcoinTxView {
    pub fn new(tx: &bitcoin::Transaction, prevouts: &[Option<bitcoin::TxOut>]) -> Self {
        let inputs = tx
            .input
            .iter()
            .enumerate()
            .map(|(i, txin)| {
                let coinbase = txin.previous_output.is_null();
                let prevout = prevouts.get(i).and_then(|p| p.as_ref());
                InputView {
                    prev_value: prevout.map(|p| p.value.to_sat()),
                    prev_script: prevout.map(|p| p.script_pubkey.to_bytes()),
                    coinbase,
                }
            })
            .collect();

        let outputs = tx
            .output
            .iter()
            .map(|txout| OutputView {
                value: txout.value.to_sat(),
                script: Some(txout.script_pubkey.to_bytes()),
            })
            .collect();

        Self { inputs, outputs }
    }
}

impl TxView for BitcoinTxView {
    fn inputs(&self) -> &[InputView] {
        &self.inputs
    }

    fn outputs(&self) -> &[OutputView] {
        &self.outputs
    }
}

/// Scripts round-trip as lowercase hex in JSON, matching how block
/// explorers typically serialize a `scriptpubkey` field, rather than
/// forcing callers to hand us raw byte arrays.
mod opt_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_str(&hex_encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        match opt {
            Some(s) if !s.is_empty() => hex_decode(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }

    fn hex_encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn hex_decode(s: &str) -> Result<Vec<u8>, String> {
        if s.len() % 2 != 0 {
            return Err(format!("odd-length hex string: {s}"));
        }
        (0..s.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| format!("invalid hex byte: {e}"))
            })
            .collect()
    }
}
