//! Chain access: dry-runs, reads, receipts and wallet submission.

pub mod rpc;

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;
use ovc_types::Action;

use crate::abi::Interface;
use crate::encoder;
use crate::errors::{ChainError, MissingClient, ReadError};

/// A call that passed simulation, ready to be handed to the wallet unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulatedRequest {
    pub account: Address,
    pub action: Action,
    /// Return data of the dry-run.
    pub result: Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    pub success: bool,
}

/// Read-only node access.
#[async_trait]
pub trait PublicClient: Send + Sync {
    /// `eth_call` of `action`, optionally from `account`.
    async fn call(&self, account: Option<Address>, action: &Action) -> Result<Bytes, ChainError>;

    /// Dry-run `action` as `account`.
    async fn simulate(
        &self,
        account: Address,
        action: Action,
    ) -> Result<SimulatedRequest, ChainError> {
        let result = self.call(Some(account), &action).await?;
        Ok(SimulatedRequest {
            account,
            action,
            result,
        })
    }

    /// Block until the transaction is mined.
    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Receipt, ChainError>;
}

/// Signing connection of the user.
#[async_trait]
pub trait WalletClient: Send + Sync {
    fn account(&self) -> Address;

    /// Sign and broadcast exactly the simulated request.
    async fn write(&self, request: &SimulatedRequest) -> Result<TxHash, ChainError>;
}

/// Call a view function, returning the raw return data.
pub async fn read(
    client: Option<&dyn PublicClient>,
    interface: &Interface,
    to: Address,
    function: &str,
    args: &[DynSolValue],
) -> Result<Bytes, ReadError> {
    let client = client.ok_or(ReadError::ClientUnavailable(MissingClient::Public))?;
    let data = encoder::encode_call(interface, function, args)?;
    Ok(client.call(None, &Action::call(to, data)).await?)
}
