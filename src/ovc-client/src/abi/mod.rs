//! Contract interfaces the client talks to.
//!
//! Interfaces are built from human-readable Solidity signatures. They are used both for call
//! encoding (function entries) and for revert decoding (error entries).

pub mod constants;
pub mod interfaces;

use alloy_json_abi::{Error, Function, JsonAbi};

use crate::errors::EncodingError;

/// A named contract interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interface {
    name: String,
    abi: JsonAbi,
}

impl Interface {
    /// Parse `function ...` / `error ...` items into an interface.
    pub fn parse(name: &str, items: &[&str]) -> Result<Self, EncodingError> {
        let mut abi = JsonAbi::default();
        for item in items {
            let item = item.trim();
            let invalid = |reason: String| EncodingError::InvalidInterface {
                item: item.to_string(),
                reason,
            };
            if item.starts_with("function ") {
                let function = Function::parse(item).map_err(|e| invalid(e.to_string()))?;
                abi.functions
                    .entry(function.name.clone())
                    .or_default()
                    .push(function);
            } else if item.starts_with("error ") {
                let error = Error::parse(item).map_err(|e| invalid(e.to_string()))?;
                abi.errors.entry(error.name.clone()).or_default().push(error);
            } else {
                return Err(invalid("expected a `function` or `error` item".to_string()));
            }
        }
        Ok(Self {
            name: name.to_string(),
            abi,
        })
    }

    pub(crate) fn from_abi(name: &str, abi: JsonAbi) -> Self {
        Self {
            name: name.to_string(),
            abi,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    /// Overload of `name` taking `arity` inputs.
    pub fn function(&self, name: &str, arity: usize) -> Result<&Function, EncodingError> {
        let overloads = self
            .abi
            .functions
            .get(name)
            .ok_or_else(|| EncodingError::UnknownFunction(name.to_string()))?;
        overloads
            .iter()
            .find(|f| f.inputs.len() == arity)
            .ok_or_else(|| EncodingError::InvalidArguments {
                function: name.to_string(),
                reason: format!("no overload takes {arity} arguments"),
            })
    }

    pub fn errors(&self) -> impl Iterator<Item = &Error> {
        self.abi.errors.values().flatten()
    }

    /// Error signatures in a stable order.
    pub fn error_signatures(&self) -> Vec<String> {
        let mut sigs: Vec<String> = self.errors().map(Error::signature).collect();
        sigs.sort();
        sigs
    }
}

/// All interfaces used by the client, parsed once.
#[derive(Clone, Debug)]
pub struct Contracts {
    pub tasks: Interface,
    pub optimistic_actions: Interface,
    pub trustless_management: Interface,
    pub address_trustless_management: Interface,
    pub dao: Interface,
    pub staking: Interface,
    pub verified_contributor: Interface,
    pub multisig: Interface,
}

impl Contracts {
    pub fn load() -> Result<Self, EncodingError> {
        Ok(Self {
            tasks: Interface::parse("Tasks", interfaces::TASKS)?,
            optimistic_actions: Interface::parse(
                "OptimisticActions",
                interfaces::OPTIMISTIC_ACTIONS,
            )?,
            trustless_management: Interface::parse(
                "VerifiedContributorTagTrustlessManagement",
                interfaces::TRUSTLESS_MANAGEMENT,
            )?,
            address_trustless_management: Interface::parse(
                "AddressTrustlessManagement",
                interfaces::ADDRESS_TRUSTLESS_MANAGEMENT,
            )?,
            dao: Interface::parse("DAO", interfaces::DAO)?,
            staking: Interface::parse("VerifiedContributorStaking", interfaces::STAKING)?,
            verified_contributor: Interface::parse(
                "VerifiedContributor",
                interfaces::VERIFIED_CONTRIBUTOR,
            )?,
            multisig: Interface::parse("Multisig", interfaces::MULTISIG)?,
        })
    }
}
