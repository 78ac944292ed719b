//! Endpoints and contract deployment addresses.
//!
//! Deployments use the same JSON layout the deployer writes:
//!
//! ```json
//! {
//!   "network": "polygon",
//!   "chain_id": 137,
//!   "explorer_url": "https://polygonscan.com",
//!   "deployments": {
//!     "tasks": { "address": "0x..." },
//!     "optimistic-actions": { "address": "0x..." }
//!   },
//!   "optimistic_actions_role": { "__type": "bigint", "value": "..." },
//!   "payment_decimals": 6
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use alloy_primitives::{Address, U256};
use ovc_types::json::bigint;
use serde::Deserialize;

use crate::abi::constants::DEFAULT_PAYMENT_DECIMALS;
use crate::errors::ConfigError;

pub const DEFAULT_INDEXER_URL: &str = "https://ovc.plopmenz.com/indexer";
pub const DEFAULT_OPENRD_INDEXER_URL: &str = "https://openrd.plopmenz.com/indexer";
pub const DEFAULT_IPFS_API_URL: &str = "http://127.0.0.1:5001";
pub const DEFAULT_OPENRD_URL: &str = "https://openrd.plopmenz.com";

/// Contract keys under `deployments`.
pub mod keys {
    pub const TASKS: &str = "tasks";
    pub const OPTIMISTIC_ACTIONS: &str = "optimistic-actions";
    pub const TRUSTLESS_MANAGEMENT: &str = "tag-trustless-management";
    pub const ADDRESS_TRUSTLESS_MANAGEMENT: &str = "address-trustless-management";
    pub const STAKING: &str = "verified-contributor-staking";
    pub const VERIFIED_CONTRIBUTOR: &str = "verified-contributor";
    pub const MULTISIG_PLUGIN: &str = "multisig-plugin";
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub rpc_url: String,
    pub indexer_url: String,
    pub openrd_indexer_url: String,
    pub ipfs_api_url: String,
    /// Task pages are linked as `{openrd_url}/tasks/{chain}:{task}`.
    pub openrd_url: String,
}

impl Endpoints {
    pub fn with_rpc(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            indexer_url: DEFAULT_INDEXER_URL.to_string(),
            openrd_indexer_url: DEFAULT_OPENRD_INDEXER_URL.to_string(),
            ipfs_api_url: DEFAULT_IPFS_API_URL.to_string(),
            openrd_url: DEFAULT_OPENRD_URL.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct Entry {
    address: Address,
}

#[derive(Deserialize)]
struct DeploymentFile {
    #[serde(default)]
    network: String,
    chain_id: u64,
    explorer_url: String,
    deployments: BTreeMap<String, Entry>,
    #[serde(with = "bigint")]
    optimistic_actions_role: U256,
    #[serde(default = "default_decimals")]
    payment_decimals: u8,
}

fn default_decimals() -> u8 {
    DEFAULT_PAYMENT_DECIMALS
}

/// Addresses and protocol parameters of one network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deployment {
    pub network: String,
    pub chain_id: u64,
    pub explorer_url: String,
    pub tasks: Address,
    pub optimistic_actions: Address,
    /// Verified-contributor-tag trustless management, the `asDAO` entry point.
    pub trustless_management: Address,
    pub address_trustless_management: Address,
    pub staking: Address,
    pub verified_contributor: Address,
    pub multisig_plugin: Option<Address>,
    /// Role under which optimistic actions execute on the DAO.
    pub optimistic_actions_role: U256,
    pub payment_decimals: u8,
}

impl Deployment {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw, &path.display().to_string())
    }

    pub fn parse(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        let file: DeploymentFile =
            serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
                path: origin.to_string(),
                source,
            })?;

        let address = |key: &'static str| -> Result<Address, ConfigError> {
            file.deployments
                .get(key)
                .map(|e| e.address)
                .ok_or(ConfigError::Invalid {
                    field: "deployments",
                    reason: format!("missing `{key}`"),
                })
        };
        if file.payment_decimals > 30 {
            return Err(ConfigError::Invalid {
                field: "payment_decimals",
                reason: format!("{} is out of range", file.payment_decimals),
            });
        }

        Ok(Self {
            tasks: address(keys::TASKS)?,
            optimistic_actions: address(keys::OPTIMISTIC_ACTIONS)?,
            trustless_management: address(keys::TRUSTLESS_MANAGEMENT)?,
            address_trustless_management: address(keys::ADDRESS_TRUSTLESS_MANAGEMENT)?,
            staking: address(keys::STAKING)?,
            verified_contributor: address(keys::VERIFIED_CONTRIBUTOR)?,
            multisig_plugin: address(keys::MULTISIG_PLUGIN).ok(),
            network: file.network,
            chain_id: file.chain_id,
            explorer_url: file.explorer_url.trim_end_matches('/').to_string(),
            optimistic_actions_role: file.optimistic_actions_role,
            payment_decimals: file.payment_decimals,
        })
    }

    pub fn explorer_tx_url(&self, hash: impl std::fmt::Display) -> String {
        format!("{}/tx/{hash}", self.explorer_url)
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub endpoints: Endpoints,
    pub deployment: Deployment,
}
