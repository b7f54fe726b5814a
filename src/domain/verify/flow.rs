//! Integrity verification state machine.

use primitive_types::{H256, U256};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::source::FingerprintSource;
use crate::domain::ledger::{LedgerCall, LedgerWriter, TxOutcome};
use crate::domain::model::{parse_ledger_id, Address, Fingerprint, IntegrityVerified};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

pub const MSG_NOT_CONNECTED: &str = "Please connect your wallet.";
pub const MSG_INVALID_HASH: &str = "Invalid hash received from the hash service.";
pub const MSG_REVERTED: &str = "The integrity check transaction was reverted.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid,
    /// The ledger gave no usable answer (no event, or a malformed flag).
    Indeterminate,
}

impl Verdict {
    pub fn from_flag(is_valid: Option<bool>) -> Self {
        match is_valid {
            Some(true) => Verdict::Valid,
            Some(false) => Verdict::Invalid,
            None => Verdict::Indeterminate,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Verdict::Valid => "Integrity verified: the documents match the certified fingerprint.",
            Verdict::Invalid => {
                "Integrity compromised: the documents do not match the certified fingerprint."
            }
            Verdict::Indeterminate => "Indeterminate result: the ledger gave no usable verdict.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationState {
    Idle,
    ComputingFingerprint,
    SubmittingToLedger {
        fingerprint: Fingerprint,
    },
    AwaitingConfirmation {
        fingerprint: Fingerprint,
        tx_hash: H256,
    },
    Resolved {
        verdict: Verdict,
        fingerprint: Fingerprint,
        tx_hash: H256,
        event: Option<IntegrityVerified>,
    },
    Failed {
        message: String,
    },
    TimedOut {
        tx_hash: H256,
    },
    Cancelled,
}

impl VerificationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VerificationState::Resolved { .. }
                | VerificationState::Failed { .. }
                | VerificationState::TimedOut { .. }
                | VerificationState::Cancelled
        )
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            VerificationState::Resolved { verdict, .. } => Some(*verdict),
            _ => None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        VerificationState::Failed {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for VerificationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationState::Idle => write!(f, "idle"),
            VerificationState::ComputingFingerprint => write!(f, "computing fingerprint..."),
            VerificationState::SubmittingToLedger { fingerprint } => {
                write!(f, "submitting {} to the ledger...", fingerprint)
            }
            VerificationState::AwaitingConfirmation { tx_hash, .. } => {
                write!(f, "transaction {:?} sent, waiting for the confirmation event...", tx_hash)
            }
            VerificationState::Resolved { verdict, .. } => write!(f, "{}", verdict.message()),
            VerificationState::Failed { message } => write!(f, "failed: {}", message),
            VerificationState::TimedOut { tx_hash } => {
                write!(f, "timed out waiting for transaction {:?}", tx_hash)
            }
            VerificationState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Drives one verification from a fingerprint source to a ledger verdict.
pub struct IntegrityVerifier {
    source: Arc<dyn FingerprintSource>,
    ledger: Arc<dyn LedgerWriter>,
    poll_interval: Duration,
    timeout: Duration,
}

async fn unless_cancelled<T>(cancel: &CancellationToken, fut: impl Future<Output = T>) -> Option<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        value = fut => Some(value),
    }
}

impl IntegrityVerifier {
    pub fn new(source: Arc<dyn FingerprintSource>, ledger: Arc<dyn LedgerWriter>) -> Self {
        Self {
            source,
            ledger,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Bounds the wait for the confirmation event.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs the flow to a terminal state, reporting every state entered to `observer`.
    pub async fn verify<F>(
        &self,
        account: Option<Address>,
        equipment_id: &str,
        cancel: &CancellationToken,
        mut observer: F,
    ) -> VerificationState
    where
        F: FnMut(&VerificationState) + Send,
    {
        let final_state = self
            .run(account, equipment_id, cancel, &mut observer)
            .await;
        observer(&final_state);
        final_state
    }

    async fn run<F>(
        &self,
        account: Option<Address>,
        equipment_id: &str,
        cancel: &CancellationToken,
        observer: &mut F,
    ) -> VerificationState
    where
        F: FnMut(&VerificationState) + Send,
    {
        let Some(account) = account else {
            return VerificationState::failed(MSG_NOT_CONNECTED);
        };
        let equipment_id = match parse_ledger_id(equipment_id) {
            Ok(id) => id,
            Err(reason) => {
                return VerificationState::failed(format!("Invalid equipment id: {}", reason))
            }
        };

        observer(&VerificationState::ComputingFingerprint);
        let fingerprint = match unless_cancelled(cancel, self.source.fingerprint(equipment_id)).await {
            None => return VerificationState::Cancelled,
            Some(Err(e)) => return VerificationState::failed(e.to_string()),
            Some(Ok(hash)) => match parse_fingerprint(&hash) {
                Some(fp) => fp,
                None => return VerificationState::failed(MSG_INVALID_HASH),
            },
        };

        observer(&VerificationState::SubmittingToLedger { fingerprint });
        let call = LedgerCall::CheckAndLogEquipmentIntegrity {
            equipment_id,
            calculated_hash: fingerprint,
        };
        let tx_hash = match unless_cancelled(cancel, self.ledger.submit(account, call)).await {
            None => return VerificationState::Cancelled,
            Some(Err(e)) => return VerificationState::failed(format!("{:#}", e)),
            Some(Ok(tx_hash)) => tx_hash,
        };

        observer(&VerificationState::AwaitingConfirmation {
            fingerprint,
            tx_hash,
        });
        tokio::select! {
            biased;
            _ = cancel.cancelled() => VerificationState::Cancelled,
            _ = tokio::time::sleep(self.timeout) => VerificationState::TimedOut { tx_hash },
            state = self.await_event(equipment_id, fingerprint, tx_hash) => state,
        }
    }

    async fn await_event(
        &self,
        equipment_id: U256,
        fingerprint: Fingerprint,
        tx_hash: H256,
    ) -> VerificationState {
        loop {
            match self.ledger.transaction_outcome(tx_hash).await {
                Ok(TxOutcome::Pending) => tokio::time::sleep(self.poll_interval).await,
                Ok(TxOutcome::Reverted) => return VerificationState::failed(MSG_REVERTED),
                Ok(TxOutcome::Mined { integrity_events }) => {
                    let event = integrity_events.into_iter().find(|e| {
                        e.transaction_hash == tx_hash && e.equipment_id == equipment_id
                    });
                    let verdict = match &event {
                        Some(e) => Verdict::from_flag(e.is_valid),
                        None => {
                            tracing::warn!(tx = ?tx_hash, "mined without an IntegrityVerified event");
                            Verdict::Indeterminate
                        }
                    };
                    return VerificationState::Resolved {
                        verdict,
                        fingerprint,
                        tx_hash,
                        event,
                    };
                }
                Err(e) => return VerificationState::failed(format!("{:#}", e)),
            }
        }
    }
}

/// Accepts only `0x`-prefixed 32-byte hashes.
fn parse_fingerprint(hash: &str) -> Option<Fingerprint> {
    if !hash.starts_with("0x") {
        return None;
    }
    hash.parse().ok()
}
