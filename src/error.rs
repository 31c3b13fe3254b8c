// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use alloy_json_rpc::RpcError;
use alloy_transport::TransportErrorKind;
use thiserror::Error;

/// Known revert reason patterns that indicate a message was already delivered
/// by a competing relayer. Matched case-insensitively against error messages.
const ALREADY_RELAYED_PATTERNS: &[&str] = &[
    "already delivered",
    "already relayed",
    "already processed",
    "message already executed",
    "nonce already used",
];

#[derive(Error, Debug)]
pub enum RelayerError {
    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("message already relayed by a competing party: {original}")]
    AlreadyRelayed { original: String },

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("contract call failed: {0}")]
    ContractCall(String),

    #[error("attestation/proof collection failed: {reason}")]
    ProofFailed { reason: String },

    #[error("transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("nonce desynchronised for signer on {chain}: local {local}, chain {on_chain}")]
    NonceDesync {
        chain: String,
        local: u64,
        on_chain: u64,
    },

    #[error("submission stalled after {attempts} attempts: {reason}")]
    Stalled { attempts: u32, reason: String },

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("rate limited, retry after {retry_after_seconds}s")]
    RateLimitExceeded { retry_after_seconds: u64 },

    #[error("evaluation rejected delivery as unprofitable: {reason}")]
    EvaluationRejected { reason: String },

    #[error("invalid URL: {reason}")]
    InvalidUrl { reason: String },

    #[error("rpc error: {0}")]
    Rpc(#[from] alloy_json_rpc::RpcError<alloy_transport::TransportErrorKind>),

    #[error("abi encoding/decoding error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("hex conversion error: {0}")]
    Hex(#[from] alloy_primitives::hex::FromHexError),

    #[error("config layering error: {0}")]
    ConfigLoad(#[from] config::ConfigError),
}

impl RelayerError {
    /// True when the destination message was already delivered, typically by
    /// a competing relayer. Delivery is still a success from the protocol's
    /// point of view; the bounty just won't be claimable by us.
    pub fn is_already_relayed(&self) -> bool {
        match self {
            RelayerError::AlreadyRelayed { .. } => true,
            RelayerError::Rpc(rpc_error) => Self::rpc_error_is_already_relayed(rpc_error),
            RelayerError::Provider(msg)
            | RelayerError::ContractCall(msg)
            | RelayerError::TransactionFailed { reason: msg } => {
                Self::message_matches_already_relayed(msg)
            }
            _ => false,
        }
    }

    fn rpc_error_is_already_relayed(error: &RpcError<TransportErrorKind>) -> bool {
        match error {
            RpcError::ErrorResp(payload) => {
                Self::message_matches_already_relayed(&payload.message)
                    || payload
                        .data
                        .as_ref()
                        .is_some_and(|d| Self::message_matches_already_relayed(&d.to_string()))
            }
            RpcError::LocalUsageError(e) => Self::message_matches_already_relayed(&e.to_string()),
            _ => false,
        }
    }

    fn message_matches_already_relayed(message: &str) -> bool {
        let lower = message.to_lowercase();
        ALREADY_RELAYED_PATTERNS
            .iter()
            .any(|pattern| lower.contains(pattern))
    }

    /// True for errors that represent a bounded wait rather than a defect:
    /// timeouts and explicit rate limiting.
    pub fn is_timeout(&self) -> bool {
        match self {
            RelayerError::Timeout(_) => true,
            RelayerError::Network(e) => e.is_timeout(),
            _ => false,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        match self {
            RelayerError::RateLimitExceeded { .. } => true,
            RelayerError::Network(e) => e.status().is_some_and(|s| s.as_u16() == 429),
            RelayerError::Rpc(RpcError::Transport(TransportErrorKind::HttpError(err))) => {
                err.status == 429
            }
            _ => false,
        }
    }

    /// True for errors worth retrying without operator intervention: timeouts,
    /// rate limiting, and transport-level network failures.
    pub fn is_transient(&self) -> bool {
        self.is_timeout() || self.is_rate_limited() || self.is_network_error()
    }

    fn is_network_error(&self) -> bool {
        matches!(self, RelayerError::Network(_))
            || matches!(
                self,
                RelayerError::Rpc(RpcError::Transport(
                    TransportErrorKind::BackendGone | TransportErrorKind::HttpError(_)
                ))
            )
    }
}

pub type Result<T> = std::result::Result<T, RelayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_relayed_explicit_variant() {
        let err = RelayerError::AlreadyRelayed {
            original: "test".to_string(),
        };
        assert!(err.is_already_relayed());
    }

    #[test]
    fn already_relayed_from_provider_message() {
        let err = RelayerError::Provider("nonce already used".to_string());
        assert!(err.is_already_relayed());

        let err = RelayerError::Provider("message already executed".to_string());
        assert!(err.is_already_relayed());

        let err = RelayerError::Provider("insufficient funds".to_string());
        assert!(!err.is_already_relayed());
    }

    #[test]
    fn already_relayed_case_insensitive() {
        let err = RelayerError::ContractCall("ALREADY DELIVERED".to_string());
        assert!(err.is_already_relayed());
    }

    #[test]
    fn timeout_classification() {
        let err = RelayerError::Timeout("attestation".to_string());
        assert!(err.is_timeout());
        assert!(err.is_transient());

        let err = RelayerError::InvalidConfig("x".to_string());
        assert!(!err.is_timeout());
        assert!(!err.is_transient());
    }

    #[test]
    fn rate_limit_classification() {
        let err = RelayerError::RateLimitExceeded {
            retry_after_seconds: 30,
        };
        assert!(err.is_rate_limited());
        assert!(err.is_transient());
    }

    #[test]
    fn unrelated_errors_not_already_relayed() {
        assert!(!RelayerError::Timeout("x".into()).is_already_relayed());
        assert!(!RelayerError::InvalidConfig("x".into()).is_already_relayed());
        assert!(!RelayerError::NotImplemented("x".into()).is_already_relayed());
    }
}
