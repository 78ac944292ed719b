//! JSON-RPC implementations of the chain traits on top of `ethers`.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, PendingTransaction, Provider, ProviderError, RpcError};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{TransactionRequest, H160, H256, U256 as EthU256, U64};
use ovc_types::Action;
use tracing::{debug, info, warn};

use super::{PublicClient, Receipt, SimulatedRequest, WalletClient};
use crate::errors::ChainError;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

fn h160(address: Address) -> H160 {
    H160::from_slice(address.as_slice())
}

fn tx_request(from: Option<Address>, action: &Action) -> TransactionRequest {
    let mut tx = TransactionRequest::new()
        .to(h160(action.to()))
        .value(EthU256::from_big_endian(&action.value().to_be_bytes::<32>()))
        .data(action.data().to_vec());
    if let Some(from) = from {
        tx = tx.from(h160(from));
    }
    tx
}

/// Keep the node's revert payload so the caller can decode the error.
fn provider_error(err: ProviderError) -> ChainError {
    if let Some(response) = err.as_error_response() {
        let data = response
            .as_revert_data()
            .map(|data| Bytes::from(data.to_vec()));
        return ChainError::Reverted {
            message: response.message.clone(),
            data,
        };
    }
    ChainError::Transport(err.to_string())
}

fn connect(rpc_url: &str) -> Result<Provider<Http>, ChainError> {
    Provider::<Http>::try_from(rpc_url)
        .map(|p| p.interval(POLL_INTERVAL))
        .map_err(|e| ChainError::Transport(format!("invalid rpc url {rpc_url}: {e}")))
}

#[derive(Clone, Debug)]
pub struct RpcPublicClient {
    provider: Provider<Http>,
}

impl RpcPublicClient {
    pub fn connect(rpc_url: &str) -> Result<Self, ChainError> {
        Ok(Self {
            provider: connect(rpc_url)?,
        })
    }
}

#[async_trait]
impl PublicClient for RpcPublicClient {
    async fn call(&self, account: Option<Address>, action: &Action) -> Result<Bytes, ChainError> {
        let tx: TypedTransaction = tx_request(account, action).into();
        let out = self
            .provider
            .call(&tx, None)
            .await
            .map_err(provider_error)?;
        Ok(Bytes::from(out.to_vec()))
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Receipt, ChainError> {
        let pending = PendingTransaction::new(H256::from(hash.0), &self.provider);
        let receipt = pending
            .await
            .map_err(provider_error)?
            .ok_or(ChainError::Dropped(hash))?;
        Ok(Receipt {
            transaction_hash: hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
            success: receipt.status == Some(U64::from(1u64)),
        })
    }
}

/// Local private key signer. The chain id is fixed at construction.
#[derive(Debug)]
pub struct RpcWalletClient {
    client: SignerMiddleware<Provider<Http>, LocalWallet>,
}

impl RpcWalletClient {
    pub fn connect(rpc_url: &str, private_key: &str, chain_id: u64) -> Result<Self, ChainError> {
        let wallet: LocalWallet = private_key
            .trim()
            .trim_start_matches("0x")
            .parse()
            .map_err(|e| ChainError::Rejected(format!("invalid private key: {e}")))?;
        let wallet = wallet.with_chain_id(chain_id);
        info!(account = ?wallet.address(), chain_id, "wallet connected");
        Ok(Self {
            client: SignerMiddleware::new(connect(rpc_url)?, wallet),
        })
    }
}

#[async_trait]
impl WalletClient for RpcWalletClient {
    fn account(&self) -> Address {
        Address::from(self.client.address().0)
    }

    async fn write(&self, request: &SimulatedRequest) -> Result<TxHash, ChainError> {
        let tx = tx_request(Some(request.account), &request.action);
        debug!(to = %request.action.to(), "sending transaction");
        let pending = self.client.send_transaction(tx, None).await.map_err(|e| {
            warn!(error = %e, "wallet refused transaction");
            ChainError::Rejected(e.to_string())
        })?;
        Ok(TxHash::from(pending.tx_hash().0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use mockito::Matcher;
    use serde_json::json;

    fn action() -> Action {
        Action::call(
            address!("0000000000000000000000000000000000000a02"),
            vec![0xde, 0xad, 0xbe, 0xef],
        )
    }

    async fn eth_call_returning(
        server: &mut mockito::Server,
        status: usize,
        body: &str,
    ) -> mockito::Mock {
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": "eth_call" })))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn call_returns_result_bytes() {
        let mut server = mockito::Server::new_async().await;
        let mock = eth_call_returning(
            &mut server,
            200,
            r#"{"jsonrpc":"2.0","id":1,"result":"0x2a"}"#,
        )
        .await;

        let client = RpcPublicClient::connect(&server.url()).unwrap();
        let out = client.call(None, &action()).await.unwrap();
        assert_eq!(out.as_ref(), &[0x2a]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn revert_keeps_the_error_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = eth_call_returning(
            &mut server,
            200,
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":3,"message":"execution reverted","data":"0x3d693ada"}}"#,
        )
        .await;

        let client = RpcPublicClient::connect(&server.url()).unwrap();
        let err = client
            .call(Some(Address::repeat_byte(0xaa)), &action())
            .await
            .unwrap_err();
        match err {
            ChainError::Reverted { message, data } => {
                assert_eq!(message, "execution reverted");
                assert_eq!(data.unwrap().as_ref(), &[0x3d, 0x69, 0x3a, 0xda]);
            }
            other => panic!("expected a revert, got {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_rpc_failure_is_transport() {
        let mut server = mockito::Server::new_async().await;
        let mock = eth_call_returning(&mut server, 502, "bad gateway").await;

        let client = RpcPublicClient::connect(&server.url()).unwrap();
        let err = client.call(None, &action()).await.unwrap_err();
        assert!(matches!(err, ChainError::Transport(_)), "got {err:?}");
        assert!(err.revert_data().is_none());
        mock.assert_async().await;
    }

    #[test]
    fn bad_rpc_url_is_rejected() {
        assert!(matches!(
            RpcPublicClient::connect("not a url"),
            Err(ChainError::Transport(_))
        ));
    }
}
