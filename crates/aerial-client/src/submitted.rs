//! Handle for an in-flight transaction

use crate::node::{NodeApi, TxResponse};
use crate::{ClientError, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A transaction the node has accepted into its mempool.
///
/// The handle carries no result yet; `wait_to_complete` polls the node
/// until the transaction lands in a block or the attempt budget runs
/// out. All per-transaction state lives here, so the ledger client
/// itself can be shared freely across tasks.
#[derive(Clone)]
pub struct SubmittedTx {
    tx_hash: String,
    node: Arc<dyn NodeApi>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl SubmittedTx {
    pub(crate) fn new(
        tx_hash: String,
        node: Arc<dyn NodeApi>,
        poll_interval: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            tx_hash,
            node,
            poll_interval,
            max_attempts,
        }
    }

    /// Hash of the submitted transaction
    pub fn tx_hash(&self) -> &str {
        &self.tx_hash
    }

    /// Poll with the defaults the handle was created with
    pub async fn wait_to_complete(&self) -> Result<TxResponse> {
        self.wait_to_complete_with(self.poll_interval, self.max_attempts)
            .await
    }

    /// Poll every `poll_interval` until the transaction is included or
    /// `max_attempts` polls have been made.
    ///
    /// Resolution is terminal either way: inclusion with code zero
    /// returns the on-chain record, inclusion with a non-zero code
    /// returns `ExecutionFailure` (the chain already judged the
    /// transaction; resubmitting would burn another sequence slot), and
    /// exhausting the budget returns `ConfirmationTimeout` — the
    /// transaction may still land later, so the caller should re-query
    /// by hash rather than resubmit. A transport error during a poll is
    /// logged and consumes an attempt like a miss, which keeps the
    /// overall wall time bounded by `max_attempts * poll_interval` even
    /// against an unreachable node.
    pub async fn wait_to_complete_with(
        &self,
        poll_interval: Duration,
        max_attempts: u32,
    ) -> Result<TxResponse> {
        for attempt in 1..=max_attempts {
            match self.node.get_tx_by_hash(&self.tx_hash).await {
                Ok(Some(response)) => {
                    if response.is_success() {
                        info!(
                            tx_hash = %self.tx_hash,
                            height = response.height,
                            gas_used = response.gas_used,
                            "transaction included"
                        );
                        return Ok(response);
                    }
                    warn!(
                        tx_hash = %self.tx_hash,
                        code = response.code,
                        "transaction failed on chain"
                    );
                    return Err(ClientError::ExecutionFailure {
                        hash: self.tx_hash.clone(),
                        code: response.code,
                        log: response.raw_log,
                    });
                }
                Ok(None) => {
                    debug!(tx_hash = %self.tx_hash, attempt, "transaction not yet included");
                }
                Err(err) => {
                    warn!(
                        tx_hash = %self.tx_hash,
                        attempt,
                        error = %err,
                        "transaction query failed; counting attempt"
                    );
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(poll_interval).await;
            }
        }

        Err(ClientError::ConfirmationTimeout {
            hash: self.tx_hash.clone(),
            attempts: max_attempts,
        })
    }
}

impl fmt::Debug for SubmittedTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmittedTx")
            .field("tx_hash", &self.tx_hash)
            .field("poll_interval", &self.poll_interval)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}
