//! One-off multisig proposal that lets a department DAO use optimistic payments.
//!
//! The proposal grants `EXECUTE_PERMISSION` to both trustless management contracts, gives the
//! optimistic actions role full access through address trustless management, and opens the
//! department zone to the optimistic actions contract.

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{keccak256, Address, TxHash, U256};
use ovc_types::Action;
use tracing::info;

use crate::abi::constants::{EXECUTE_PERMISSION, FULL_ACCESS, SETUP_PROPOSAL_DURATION};
use crate::abi::Contracts;
use crate::chain::{PublicClient, WalletClient};
use crate::config::Deployment;
use crate::decoder::{collect_errors, simulation_error};
use crate::encoder::{action_array, address, bytes32, encode_call, uint, uint256};
use crate::errors::{DaoSetupError, EncodingError, MissingClient};

/// The four DAO actions of the setup proposal, in execution order.
pub fn setup_actions(
    contracts: &Contracts,
    deployment: &Deployment,
    dao: Address,
    department: U256,
) -> Result<Vec<Action>, EncodingError> {
    let permission = bytes32(keccak256(EXECUTE_PERMISSION.as_bytes()));
    let grant = |who: Address| {
        encode_call(
            &contracts.dao,
            "grant",
            &[address(dao), address(who), permission.clone()],
        )
    };

    Ok(vec![
        Action::call(dao, grant(deployment.address_trustless_management)?),
        Action::call(
            deployment.address_trustless_management,
            encode_call(
                &contracts.address_trustless_management,
                "changeFullAccess",
                &[
                    address(dao),
                    uint256(deployment.optimistic_actions_role),
                    address(FULL_ACCESS),
                ],
            )?,
        ),
        Action::call(dao, grant(deployment.trustless_management)?),
        Action::call(
            deployment.trustless_management,
            encode_call(
                &contracts.trustless_management,
                "changeZoneAccess",
                &[
                    address(dao),
                    uint256(department),
                    address(deployment.optimistic_actions),
                    address(FULL_ACCESS),
                ],
            )?,
        ),
    ])
}

/// `createProposal` on the multisig plugin: approved by the sender, executed early when
/// possible, open until `now + 7 days`.
pub fn setup_proposal(
    contracts: &Contracts,
    deployment: &Deployment,
    dao: Address,
    department: U256,
    now: u64,
) -> Result<Action, DaoSetupError> {
    let multisig = deployment
        .multisig_plugin
        .ok_or_else(|| DaoSetupError::NoMultisig {
            network: deployment.network.clone(),
        })?;
    let actions = setup_actions(contracts, deployment, dao, department)?;
    let end = now.saturating_add(SETUP_PROPOSAL_DURATION);
    let data = encode_call(
        &contracts.multisig,
        "createProposal",
        &[
            DynSolValue::Bytes(Vec::new()),
            action_array(&actions),
            uint256(U256::ZERO),
            DynSolValue::Bool(true),
            DynSolValue::Bool(true),
            uint(U256::ZERO, 64),
            uint(U256::from(end), 64),
        ],
    )?;
    Ok(Action::call(multisig, data))
}

/// Simulate and submit the setup proposal from the wallet account.
pub async fn propose_setup(
    public: Option<&dyn PublicClient>,
    wallet: Option<&dyn WalletClient>,
    contracts: &Contracts,
    deployment: &Deployment,
    dao: Address,
    department: U256,
    now: u64,
) -> Result<TxHash, DaoSetupError> {
    let public = public.ok_or(DaoSetupError::ClientUnavailable(MissingClient::Public))?;
    let wallet = wallet.ok_or(DaoSetupError::ClientUnavailable(MissingClient::Wallet))?;

    let proposal = setup_proposal(contracts, deployment, dao, department, now)?;
    let errors = collect_errors(&[
        &contracts.multisig,
        &contracts.dao,
        &contracts.trustless_management,
        &contracts.address_trustless_management,
    ]);
    let request = public
        .simulate(wallet.account(), proposal)
        .await
        .map_err(|e| simulation_error(&e, &errors))?;
    let hash = wallet.write(&request).await.map_err(DaoSetupError::Rejected)?;
    info!(%dao, %department, tx = %hash, "department setup proposed");
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Receipt, SimulatedRequest};
    use crate::config::tests::sample;
    use crate::errors::ChainError;
    use alloy_dyn_abi::JsonAbiExt;
    use alloy_primitives::{address, Bytes, B256};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const DAO: Address = address!("0000000000000000000000000000000000000d40");
    const MULTISIG: Address = address!("25ec2b7236bdaad095afe9b39024a8003aff5545");

    fn deployment() -> Deployment {
        Deployment {
            multisig_plugin: Some(MULTISIG),
            ..sample()
        }
    }

    fn args(contracts: &Contracts, action: &Action) -> Vec<DynSolValue> {
        contracts
            .multisig
            .function("createProposal", 7)
            .unwrap()
            .abi_decode_input(&action.data()[4..], true)
            .unwrap()
    }

    #[test]
    fn actions_grant_then_open_access() {
        let contracts = Contracts::load().unwrap();
        let deployment = deployment();
        let actions = setup_actions(&contracts, &deployment, DAO, U256::from(5u64)).unwrap();
        let targets: Vec<Address> = actions.iter().map(Action::to).collect();
        assert_eq!(
            targets,
            [
                DAO,
                deployment.address_trustless_management,
                DAO,
                deployment.trustless_management
            ]
        );

        let grant = contracts.dao.function("grant", 3).unwrap();
        let first = grant.abi_decode_input(&actions[0].data()[4..], true).unwrap();
        assert_eq!(first[1], DynSolValue::Address(deployment.address_trustless_management));
        assert_eq!(
            first[2],
            DynSolValue::FixedBytes(keccak256("EXECUTE_PERMISSION"), 32)
        );

        let zone = contracts
            .trustless_management
            .function("changeZoneAccess", 4)
            .unwrap();
        let last = zone.abi_decode_input(&actions[3].data()[4..], true).unwrap();
        assert_eq!(last[1], DynSolValue::Uint(U256::from(5u64), 256));
        assert_eq!(last[2], DynSolValue::Address(deployment.optimistic_actions));
        assert_eq!(last[3], DynSolValue::Address(FULL_ACCESS));
    }

    #[test]
    fn proposal_runs_for_a_week() {
        let contracts = Contracts::load().unwrap();
        let proposal =
            setup_proposal(&contracts, &deployment(), DAO, U256::from(5u64), 1_000).unwrap();
        assert_eq!(proposal.to(), MULTISIG);

        let args = args(&contracts, &proposal);
        assert_eq!(args[0], DynSolValue::Bytes(Vec::new()));
        assert_eq!(args[3], DynSolValue::Bool(true));
        assert_eq!(args[4], DynSolValue::Bool(true));
        assert_eq!(args[5], DynSolValue::Uint(U256::ZERO, 64));
        assert_eq!(args[6], DynSolValue::Uint(U256::from(1_000 + 604_800u64), 64));
    }

    #[test]
    fn missing_multisig_is_reported() {
        let contracts = Contracts::load().unwrap();
        let err = setup_proposal(&contracts, &sample(), DAO, U256::ZERO, 0).unwrap_err();
        assert!(matches!(err, DaoSetupError::NoMultisig { ref network } if network == "polygon"));
    }

    struct RecordingChain(Mutex<Vec<Action>>);

    #[async_trait]
    impl PublicClient for RecordingChain {
        async fn call(&self, _: Option<Address>, action: &Action) -> Result<Bytes, ChainError> {
            self.0.lock().unwrap().push(action.clone());
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

    struct RejectingWallet;

    #[async_trait]
    impl WalletClient for RejectingWallet {
        fn account(&self) -> Address {
            Address::ZERO
        }

        async fn write(&self, _: &SimulatedRequest) -> Result<TxHash, ChainError> {
            Err(ChainError::Rejected("user denied".into()))
        }
    }

    #[tokio::test]
    async fn rejected_proposal_was_simulated_first() {
        let contracts = Contracts::load().unwrap();
        let chain = RecordingChain(Mutex::default());
        let err = propose_setup(
            Some(&chain),
            Some(&RejectingWallet),
            &contracts,
            &deployment(),
            DAO,
            U256::from_be_bytes(B256::repeat_byte(1).0),
            0,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DaoSetupError::Rejected(_)));
        assert_eq!(chain.0.lock().unwrap()[0].to(), MULTISIG);
    }
}
