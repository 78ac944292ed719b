//! Verified contributor staking: claimable rewards and stake/unstake/claim.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use alloy_primitives::{Address, TxHash, U256};
use ovc_types::Action;
use tracing::{info, warn};

use crate::abi::Contracts;
use crate::chain::{self, PublicClient, WalletClient};
use crate::config::Deployment;
use crate::decoder::{collect_errors, simulation_error};
use crate::encoder::{address, decode_uint, encode_call, format_units, uint256};
use crate::errors::{EncodingError, MissingClient, ReadError, SubmissionError, WorkflowError};
use crate::workflow::SubmittingGuard;

/// Decimals of the staking reward token.
pub const REWARD_DECIMALS: u8 = 18;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StakeCall {
    Stake,
    Unstake,
    Claim,
}

impl StakeCall {
    pub fn function(self) -> &'static str {
        match self {
            StakeCall::Stake => "stake",
            StakeCall::Unstake => "unstake",
            StakeCall::Claim => "claim",
        }
    }
}

pub struct StakingClient {
    contracts: Contracts,
    deployment: Deployment,
    public: Option<Arc<dyn PublicClient>>,
    wallet: Option<Arc<dyn WalletClient>>,
    submitting: AtomicBool,
}

impl StakingClient {
    pub fn new(
        deployment: Deployment,
        public: Option<Arc<dyn PublicClient>>,
        wallet: Option<Arc<dyn WalletClient>>,
    ) -> Result<Self, EncodingError> {
        Ok(Self {
            contracts: Contracts::load()?,
            deployment,
            public,
            wallet,
            submitting: AtomicBool::new(false),
        })
    }

    /// First verified contributor token of `owner`, or 0 when it holds none.
    pub async fn token_of(&self, owner: Address) -> Result<U256, ReadError> {
        let nft = &self.contracts.verified_contributor;
        let to = self.deployment.verified_contributor;
        let out = chain::read(self.public.as_deref(), nft, to, "balanceOf", &[address(owner)]).await?;
        if decode_uint(nft, "balanceOf", 1, &out)?.is_zero() {
            return Ok(U256::ZERO);
        }
        let out = chain::read(
            self.public.as_deref(),
            nft,
            to,
            "tokenOfOwnerByIndex",
            &[address(owner), uint256(U256::ZERO)],
        )
        .await?;
        Ok(decode_uint(nft, "tokenOfOwnerByIndex", 2, &out)?)
    }

    /// Rewards claimable by `token_id`, in base units.
    pub async fn claimable(&self, token_id: U256) -> Result<U256, ReadError> {
        if token_id.is_zero() {
            return Ok(U256::ZERO);
        }
        let staking = &self.contracts.staking;
        let out = chain::read(
            self.public.as_deref(),
            staking,
            self.deployment.staking,
            "claimable",
            &[uint256(token_id)],
        )
        .await?;
        Ok(decode_uint(staking, "claimable", 1, &out)?)
    }

    pub fn format_claimable(amount: U256) -> String {
        format_units(amount, REWARD_DECIMALS)
    }

    /// Simulate `call` for `token_id` as the wallet account, then submit it.
    pub async fn send(&self, call: StakeCall, token_id: U256) -> Result<TxHash, WorkflowError> {
        let Some(_guard) = SubmittingGuard::acquire(&self.submitting) else {
            return Err(WorkflowError::Busy);
        };
        self.simulate_and_write(call, token_id).await
    }

    async fn simulate_and_write(
        &self,
        call: StakeCall,
        token_id: U256,
    ) -> Result<TxHash, WorkflowError> {
        let public = self
            .public
            .as_deref()
            .ok_or(WorkflowError::ClientUnavailable(MissingClient::Public))?;
        let wallet = self
            .wallet
            .as_deref()
            .ok_or(WorkflowError::ClientUnavailable(MissingClient::Wallet))?;

        let staking = &self.contracts.staking;
        let data = encode_call(staking, call.function(), &[uint256(token_id)])?;
        let request = public
            .simulate(wallet.account(), Action::call(self.deployment.staking, data))
            .await
            .map_err(|e| simulation_error(&e, &collect_errors(&[staking])))?;

        let hash = wallet.write(&request).await.map_err(|e| {
            warn!(?call, error = %e, "staking transaction not submitted");
            SubmissionError::Rejected
        })?;
        info!(?call, %token_id, tx = %hash, "staking transaction submitted");
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Receipt, SimulatedRequest};
    use crate::config::tests::sample;
    use crate::errors::ChainError;
    use alloy_dyn_abi::DynSolValue;
    use alloy_primitives::{address, Bytes};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const OWNER: Address = address!("00000000000000000000000000000000000000aa");

    /// Answers NFT and staking reads from fixed values.
    struct FakeChain {
        balance: u64,
        token: u64,
        claimable: u64,
        calls: Mutex<Vec<Action>>,
    }

    #[async_trait]
    impl PublicClient for FakeChain {
        async fn call(&self, _: Option<Address>, action: &Action) -> Result<Bytes, ChainError> {
            self.calls.lock().unwrap().push(action.clone());
            let contracts = Contracts::load().unwrap();
            let selector = action.selector().unwrap();
            let nft = &contracts.verified_contributor;
            let value = if selector == nft.function("balanceOf", 1).unwrap().selector().0 {
                self.balance
            } else if selector == nft.function("tokenOfOwnerByIndex", 2).unwrap().selector().0 {
                self.token
            } else {
                self.claimable
            };
            Ok(DynSolValue::Uint(U256::from(value), 256).abi_encode().into())
        }

        async fn wait_for_receipt(&self, hash: TxHash) -> Result<Receipt, ChainError> {
            Ok(Receipt {
                transaction_hash: hash,
                block_number: Some(1),
                success: true,
            })
        }
    }

    struct FakeWallet;

    #[async_trait]
    impl WalletClient for FakeWallet {
        fn account(&self) -> Address {
            OWNER
        }

        async fn write(&self, request: &SimulatedRequest) -> Result<TxHash, ChainError> {
            assert_eq!(request.account, OWNER);
            Ok(TxHash::repeat_byte(0x11))
        }
    }

    fn client(balance: u64) -> StakingClient {
        let chain = Arc::new(FakeChain {
            balance,
            token: 77,
            claimable: 1_500_000_000_000_000_000,
            calls: Mutex::default(),
        });
        StakingClient::new(sample(), Some(chain), Some(Arc::new(FakeWallet))).unwrap()
    }

    #[tokio::test]
    async fn token_is_first_owned_or_zero() {
        assert_eq!(client(2).token_of(OWNER).await.unwrap(), U256::from(77u64));
        assert_eq!(client(0).token_of(OWNER).await.unwrap(), U256::ZERO);
    }

    #[tokio::test]
    async fn claimable_reads_only_for_real_tokens() {
        let staking = client(1);
        assert_eq!(staking.claimable(U256::ZERO).await.unwrap(), U256::ZERO);
        let amount = staking.claimable(U256::from(77u64)).await.unwrap();
        assert_eq!(StakingClient::format_claimable(amount), "1.5");
    }

    #[tokio::test]
    async fn stake_is_simulated_then_written() {
        let hash = client(1)
            .send(StakeCall::Stake, U256::from(77u64))
            .await
            .unwrap();
        assert_eq!(hash, TxHash::repeat_byte(0x11));
    }

    /// Never answers its first call.
    struct StalledChain(std::sync::atomic::AtomicBool);

    #[async_trait]
    impl PublicClient for StalledChain {
        async fn call(&self, _: Option<Address>, _: &Action) -> Result<Bytes, ChainError> {
            if self.0.swap(false, std::sync::atomic::Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            Ok(Bytes::new())
        }

        async fn wait_for_receipt(&self, hash: TxHash) -> Result<Receipt, ChainError> {
            Ok(Receipt {
                transaction_hash: hash,
                block_number: None,
                success: true,
            })
        }
    }

    #[tokio::test]
    async fn abandoned_send_releases_the_busy_flag() {
        let chain = Arc::new(StalledChain(std::sync::atomic::AtomicBool::new(true)));
        let staking =
            StakingClient::new(sample(), Some(chain), Some(Arc::new(FakeWallet))).unwrap();

        let first = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            staking.send(StakeCall::Stake, U256::from(1u64)),
        )
        .await;
        assert!(first.is_err());

        let second = staking.send(StakeCall::Claim, U256::from(1u64)).await;
        assert_eq!(second.unwrap(), TxHash::repeat_byte(0x11));
    }

    #[tokio::test]
    async fn reads_need_a_public_client() {
        let staking = StakingClient::new(sample(), None, None).unwrap();
        assert!(matches!(
            staking.token_of(OWNER).await,
            Err(ReadError::ClientUnavailable(MissingClient::Public))
        ));
        assert!(matches!(
            staking.send(StakeCall::Claim, U256::from(1u64)).await,
            Err(WorkflowError::ClientUnavailable(MissingClient::Public))
        ));
    }
}
