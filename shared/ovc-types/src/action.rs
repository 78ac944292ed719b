use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// One on-chain call: `(to, value, data)`.
///
/// Fields are private so an action cannot be altered after it was built; batches of actions are
/// submitted exactly as constructed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    to: Address,
    value: U256,
    data: Bytes,
}

impl Action {
    pub fn new(to: Address, value: U256, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            value,
            data: data.into(),
        }
    }

    /// Call without native value attached.
    pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
        Self::new(to, U256::ZERO, data)
    }

    pub fn to(&self) -> Address {
        self.to
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// 4-byte function selector, if the calldata carries one.
    pub fn selector(&self) -> Option<[u8; 4]> {
        let head = self.data.get(0..4)?;
        let mut sel = [0u8; 4];
        sel.copy_from_slice(head);
        Some(sel)
    }
}
