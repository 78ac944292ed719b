//! Revert decoding for simulated calls.

use std::collections::BTreeMap;

use alloy_json_abi::{Error, JsonAbi};
use alloy_sol_types::{decode_revert_reason, Panic, Revert, SolError};

use crate::abi::Interface;
use crate::errors::{ChainError, SimulationError};

const SIMULATION_FAILED: &str = "Simulation failed.";

/// Merge the error declarations of `interfaces` into one decoding-only interface.
///
/// Functions and events are dropped. Identical declarations collapse and the result does not
/// depend on input order.
pub fn collect_errors(interfaces: &[&Interface]) -> Interface {
    let mut errors: BTreeMap<String, Vec<Error>> = BTreeMap::new();
    for interface in interfaces {
        for error in interface.errors() {
            let entry = errors.entry(error.name.clone()).or_default();
            if !entry.contains(error) {
                entry.push(error.clone());
            }
        }
    }
    for overloads in errors.values_mut() {
        overloads.sort_by_cached_key(|e| (e.signature(), input_names(e)));
    }

    let name = {
        let mut names: Vec<&str> = interfaces.iter().map(|i| i.name()).collect();
        names.sort_unstable();
        names.dedup();
        format!("Errors({})", names.join(","))
    };
    Interface::from_abi(
        &name,
        JsonAbi {
            errors,
            ..Default::default()
        },
    )
}

fn input_names(error: &Error) -> Vec<String> {
    error.inputs.iter().map(|p| p.name.clone()).collect()
}

/// Name of the declared error `data` reverted with.
///
/// The builtin `Error(string)` and `Panic(uint256)` reverts decode to `Error` and `Panic`.
pub fn decode_revert(interface: &Interface, data: &[u8]) -> Option<String> {
    let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;
    if selector == Revert::SELECTOR {
        return Some("Error".to_string());
    }
    if selector == Panic::SELECTOR {
        return Some("Panic".to_string());
    }
    interface
        .errors()
        .find(|e| e.selector().0 == selector)
        .map(|e| e.name.clone())
}

/// Turn a failed dry-run into the message shown to the user.
pub fn simulation_error(err: &ChainError, errors: &Interface) -> SimulationError {
    let message = match err.short_message() {
        m if m.trim().is_empty() => SIMULATION_FAILED.to_string(),
        m => m,
    };
    let decoded = err.revert_data().and_then(|data| {
        if let Some(reason) = decode_revert_reason(data) {
            tracing::debug!(%reason, "revert reason");
        }
        decode_revert(errors, data)
    });
    SimulationError { message, decoded }
}
