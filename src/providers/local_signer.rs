//! Local private-key transaction signer.
//!
//! Wallet-key management (HSMs, custody, key rotation, keystore formats) is
//! out of scope; this is the minimal concrete [`Signer`] a deployment needs
//! to actually broadcast the delivery transactions the submitter builds. The
//! teacher crate never wires one up at all (its own flow expects the operator
//! to sign manually), so this has no direct teacher counterpart to adapt —
//! it's built straight from `alloy-signer-local`'s own signing API, the same
//! dependency the teacher carries for its tests.

use alloy_consensus::{SignableTransaction, TxEip1559, TxLegacy};
use alloy_consensus::Encodable2718;
use alloy_network::TxSigner;
use alloy_primitives::{Address, Bytes, TxKind, U256};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;

use crate::error::{RelayerError, Result};
use crate::traits::Signer;

/// Signs with a single in-process private key. Suitable for a relayer
/// running with one hot wallet per chain; not suitable for custody of funds
/// beyond what the operator is willing to keep in a process's memory.
pub struct LocalSigner {
    inner: PrivateKeySigner,
    eip1559: bool,
}

impl LocalSigner {
    /// Builds a signer from a hex-encoded private key (`0x`-prefixed or not).
    /// `eip1559` selects whether `sign_transaction` produces an EIP-1559 or
    /// legacy transaction; chains without EIP-1559 support need the latter.
    pub fn from_private_key(hex_key: &str, eip1559: bool) -> Result<Self> {
        let inner: PrivateKeySigner = hex_key
            .parse()
            .map_err(|e: alloy_signer_local::LocalSignerError| RelayerError::InvalidConfig(e.to_string()))?;
        Ok(Self { inner, eip1559 })
    }
}

#[async_trait]
impl Signer for LocalSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_transaction(
        &self,
        chain_id: u64,
        to: Address,
        nonce: u64,
        gas_limit: u64,
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
        value: U256,
        data: Bytes,
    ) -> Result<Bytes> {
        if self.eip1559 {
            let mut tx = TxEip1559 {
                chain_id,
                nonce,
                gas_limit,
                max_fee_per_gas,
                max_priority_fee_per_gas,
                to: TxKind::Call(to),
                value,
                access_list: Default::default(),
                input: data,
            };
            let signature = TxSigner::sign_transaction(&self.inner, &mut tx)
                .await
                .map_err(|e| RelayerError::Provider(e.to_string()))?;
            Ok(Bytes::from(tx.into_signed(signature).encoded_2718()))
        } else {
            let mut tx = TxLegacy {
                chain_id: Some(chain_id),
                nonce,
                gas_price: max_fee_per_gas,
                gas_limit,
                to: TxKind::Call(to),
                value,
                input: data,
            };
            let signature = TxSigner::sign_transaction(&self.inner, &mut tx)
                .await
                .map_err(|e| RelayerError::Provider(e.to_string()))?;
            Ok(Bytes::from(tx.into_signed(signature).encoded_2718()))
        }
    }
}
