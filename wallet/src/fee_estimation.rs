//! Transfer Fee Estimation
//!
//! A value transfer has a fixed gas cost, so the fee is
//! `TRANSFER_GAS_LIMIT * gas price`, with the gas price taken from the node.
//!
//! Interactive callers recompute the estimate as the user edits the form.
//! [`EstimateDebouncer`] coalesces rapid edits into one query after a quiet
//! period and only publishes the result of the most recently issued query.

use gw_crypto_secp256k1::Address;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    error::Result,
    rpc::NodeRpc,
    transaction::TRANSFER_GAS_LIMIT,
    units::Wei,
};

/// Fee estimate for one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasEstimate {
    pub gas_limit: u64,
    /// Gas price in wei
    pub gas_price: Wei,
    /// `gas_limit * gas_price`
    pub fee: Wei,
    /// Display values keyed by component name
    pub breakdown: BTreeMap<String, String>,
}

impl GasEstimate {
    pub fn new(gas_limit: u64, gas_price: Wei) -> Self {
        let fee = Wei(gas_price.0.saturating_mul(gas_limit as u128));

        let mut breakdown = BTreeMap::new();
        breakdown.insert("gasLimit".to_string(), gas_limit.to_string());
        breakdown.insert("gasPrice".to_string(), format!("{} Gwei", gas_price.to_gwei_string()));
        breakdown.insert("fee".to_string(), fee.to_string());

        Self {
            gas_limit,
            gas_price,
            fee,
            breakdown,
        }
    }

    /// Fee as an ether decimal string.
    pub fn fee_ether(&self) -> String {
        self.fee.to_ether_string()
    }
}

/// Outcome of an estimate request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeeQuote {
    /// Inputs incomplete; nothing to show
    Unavailable,
    Ready(GasEstimate),
}

impl FeeQuote {
    pub fn estimate(&self) -> Option<&GasEstimate> {
        match self {
            FeeQuote::Ready(estimate) => Some(estimate),
            FeeQuote::Unavailable => None,
        }
    }
}

/// Computes transfer fees from current node conditions.
#[derive(Clone)]
pub struct GasEstimator {
    rpc: Arc<dyn NodeRpc>,
}

impl GasEstimator {
    pub fn new(rpc: Arc<dyn NodeRpc>) -> Self {
        Self { rpc }
    }

    /// Estimate from raw form input. Incomplete or unparseable input yields
    /// [`FeeQuote::Unavailable`] without contacting the node.
    pub async fn estimate(&self, from: &str, to: &str, amount: &str) -> Result<FeeQuote> {
        if !inputs_complete(from, to, amount) {
            return Ok(FeeQuote::Unavailable);
        }
        Ok(FeeQuote::Ready(self.estimate_transfer().await?))
    }

    /// Estimate a transfer at the current gas price.
    pub async fn estimate_transfer(&self) -> Result<GasEstimate> {
        let gas_price = self.rpc.gas_price().await?;
        Ok(GasEstimate::new(TRANSFER_GAS_LIMIT, gas_price))
    }
}

fn inputs_complete(from: &str, to: &str, amount: &str) -> bool {
    if from.trim().parse::<Address>().is_err() || to.trim().parse::<Address>().is_err() {
        return false;
    }
    matches!(Wei::from_ether_str(amount), Ok(value) if !value.is_zero())
}

/// Form fields an estimate depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EstimateInput {
    pub from: String,
    pub to: String,
    pub amount: String,
}

/// A published estimate and the input it was computed for.
#[derive(Debug, Clone)]
pub struct EstimateOutcome {
    pub generation: u64,
    pub input: EstimateInput,
    pub result: std::result::Result<FeeQuote, String>,
}

struct DebounceState {
    generation: u64,
    last_input: Option<EstimateInput>,
    pending: Option<CancellationToken>,
}

/// Debounced, latest-wins fee estimation.
pub struct EstimateDebouncer {
    estimator: GasEstimator,
    quiet_period: Duration,
    state: Arc<Mutex<DebounceState>>,
    tx: watch::Sender<Option<EstimateOutcome>>,
}

impl EstimateDebouncer {
    pub fn new(estimator: GasEstimator, quiet_period: Duration) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            estimator,
            quiet_period,
            state: Arc::new(Mutex::new(DebounceState {
                generation: 0,
                last_input: None,
                pending: None,
            })),
            tx,
        }
    }

    /// Receive every published estimate.
    pub fn subscribe(&self) -> watch::Receiver<Option<EstimateOutcome>> {
        self.tx.subscribe()
    }

    /// Most recently published estimate.
    pub fn latest(&self) -> Option<EstimateOutcome> {
        self.tx.borrow().clone()
    }

    /// Record a form change. Cancels any pending estimate and schedules a new
    /// one after the quiet period. Unchanged input is ignored.
    pub fn update(&self, input: EstimateInput) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.last_input.as_ref() == Some(&input) {
            return;
        }

        if let Some(previous) = state.pending.take() {
            previous.cancel();
        }
        state.generation += 1;
        state.last_input = Some(input.clone());

        let generation = state.generation;
        let token = CancellationToken::new();
        state.pending = Some(token.clone());
        drop(state);

        let estimator = self.estimator.clone();
        let quiet_period = self.quiet_period;
        let shared = self.state.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(quiet_period) => {}
            }

            let result = tokio::select! {
                _ = token.cancelled() => return,
                result = estimator.estimate(&input.from, &input.to, &input.amount) => result,
            };

            let Ok(mut state) = shared.lock() else {
                return;
            };
            if state.generation != generation {
                debug!("Discarding superseded estimate #{}", generation);
                return;
            }
            if result.is_err() {
                // A failed estimate is retried by the next update, even unchanged
                state.last_input = None;
            }
            tx.send_replace(Some(EstimateOutcome {
                generation,
                input,
                result: result.map_err(|e| e.to_string()),
            }));
        });
    }

    /// Drop any pending estimate without publishing it.
    pub fn cancel(&self) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(pending) = state.pending.take() {
                pending.cancel();
            }
            // Invalidate an estimate already past its last cancellation point
            state.generation += 1;
            state.last_input = None;
        }
    }
}

impl Drop for EstimateDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
