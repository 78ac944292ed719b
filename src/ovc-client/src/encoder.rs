use alloy_dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy_primitives::{Address, Bytes, B256, U256};
use ovc_types::Action;
use tracing::debug;

use crate::abi::constants::{REWARD_BITS, SECONDS_PER_WEEK};
use crate::abi::Interface;
use crate::errors::EncodingError;

/// Encode a call to `function` with `args`, selector included.
pub fn encode_call(
    interface: &Interface,
    function: &str,
    args: &[DynSolValue],
) -> Result<Bytes, EncodingError> {
    let func = interface.function(function, args.len())?;
    let data = func
        .abi_encode_input(args)
        .map_err(|e| EncodingError::InvalidArguments {
            function: function.to_string(),
            reason: e.to_string(),
        })?;
    debug!(
        interface = interface.name(),
        function,
        calldata = %Bytes::from(data.clone()),
        "encoded call"
    );
    Ok(data.into())
}

/// Decode the return data of a call built with [`encode_call`].
pub fn decode_output(
    interface: &Interface,
    function: &str,
    arity: usize,
    data: &[u8],
) -> Result<Vec<DynSolValue>, EncodingError> {
    let func = interface.function(function, arity)?;
    func.abi_decode_output(data, true)
        .map_err(|e| EncodingError::InvalidReturn {
            function: function.to_string(),
            reason: e.to_string(),
        })
}

/// First return value as an unsigned integer.
pub fn decode_uint(
    interface: &Interface,
    function: &str,
    arity: usize,
    data: &[u8],
) -> Result<U256, EncodingError> {
    match decode_output(interface, function, arity, data)?.first() {
        Some(DynSolValue::Uint(value, _)) => Ok(*value),
        other => Err(EncodingError::InvalidReturn {
            function: function.to_string(),
            reason: format!("expected uint, got {other:?}"),
        }),
    }
}

/// First return value as a bool.
pub fn decode_bool(
    interface: &Interface,
    function: &str,
    arity: usize,
    data: &[u8],
) -> Result<bool, EncodingError> {
    match decode_output(interface, function, arity, data)?.first() {
        Some(DynSolValue::Bool(value)) => Ok(*value),
        other => Err(EncodingError::InvalidReturn {
            function: function.to_string(),
            reason: format!("expected bool, got {other:?}"),
        }),
    }
}

pub fn address(value: Address) -> DynSolValue {
    DynSolValue::Address(value)
}

pub fn uint(value: U256, bits: usize) -> DynSolValue {
    DynSolValue::Uint(value, bits)
}

pub fn uint256(value: U256) -> DynSolValue {
    DynSolValue::Uint(value, 256)
}

pub fn bytes32(value: B256) -> DynSolValue {
    DynSolValue::FixedBytes(value, 32)
}

/// `uintN[]` array of the given values.
pub fn uint_array(values: &[U256], bits: usize) -> DynSolValue {
    DynSolValue::Array(values.iter().map(|v| uint(*v, bits)).collect())
}

/// `(address,uint256,bytes)` tuple of one action.
pub fn action_tuple(action: &Action) -> DynSolValue {
    DynSolValue::Tuple(vec![
        address(action.to()),
        uint256(action.value()),
        DynSolValue::Bytes(action.data().to_vec()),
    ])
}

/// `(address,uint256,bytes)[]` array of actions, order preserved.
pub fn action_array(actions: &[Action]) -> DynSolValue {
    DynSolValue::Array(actions.iter().map(action_tuple).collect())
}

fn unit(decimals: u8) -> Result<U256, EncodingError> {
    U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .ok_or_else(|| EncodingError::AmountOverflow(format!("10^{decimals}")))
}

/// Whole token units to base units. The result must fit a reward amount (`uint88`).
pub fn scale_amount(whole: U256, decimals: u8) -> Result<U256, EncodingError> {
    let scaled = whole
        .checked_mul(unit(decimals)?)
        .ok_or_else(|| EncodingError::AmountOverflow(whole.to_string()))?;
    if scaled.bit_len() > REWARD_BITS {
        return Err(EncodingError::AmountOverflow(scaled.to_string()));
    }
    Ok(scaled)
}

/// Base units back to whole token units, truncating any fraction.
pub fn unscale_amount(amount: U256, decimals: u8) -> U256 {
    match unit(decimals) {
        Ok(unit) => amount / unit,
        Err(_) => U256::ZERO,
    }
}

/// Render base units as a decimal string, e.g. `1500000` with 6 decimals is `1.5`.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let Ok(unit) = unit(decimals) else {
        return amount.to_string();
    };
    let (whole, fraction) = amount.div_rem(unit);
    if fraction.is_zero() {
        return whole.to_string();
    }
    let fraction = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}

pub fn weeks_to_seconds(weeks: u64) -> Result<u64, EncodingError> {
    weeks
        .checked_mul(SECONDS_PER_WEEK)
        .ok_or_else(|| EncodingError::AmountOverflow(format!("{weeks} weeks")))
}
