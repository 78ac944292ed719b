//! Protocol constants shared by the workflows.

use std::time::Duration;

use alloy_primitives::{address, Address};

pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
pub const SECONDS_PER_WEEK: u64 = 7 * SECONDS_PER_DAY;

/// Decimals of the payment token when the deployment does not specify them.
pub const DEFAULT_PAYMENT_DECIMALS: u8 = 6;

/// Width of the `uint88` reward arrays of the task contract.
pub const REWARD_BITS: usize = 88;

pub const IPFS_URI_PREFIX: &str = "ipfs://";

/// Permission checker that allows every call.
pub const FULL_ACCESS: Address = address!("FFfFfFffFFfffFFfFFfFFFFFffFFFffffFfFFFfF");

/// Aragon permission id preimage granting `execute` on the DAO.
pub const EXECUTE_PERMISSION: &str = "EXECUTE_PERMISSION";

/// Voting window of the one-time DAO setup proposal.
pub const SETUP_PROPOSAL_DURATION: u64 = 7 * SECONDS_PER_DAY;

/// Lifetime of the "transaction submitted" notice.
pub const SUBMITTED_NOTICE: Duration = Duration::from_secs(120);
