//! Client for Verified Contributor departments.
//!
//! The core is [`workflow::PaymentWorkflow`], which creates, rejects and executes optimistic
//! payment requests against a department DAO. Around it sit the indexer and IPFS clients, chain
//! access behind the [`chain::PublicClient`] / [`chain::WalletClient`] seams, presentation
//! helpers for indexed payments, staking and the one-off department setup proposal.

pub mod abi;
pub mod chain;
pub mod config;
pub mod dao_setup;
pub mod decoder;
pub mod encoder;
pub mod errors;
pub mod indexer;
pub mod metadata;
pub mod notify;
pub mod staking;
pub mod views;
pub mod workflow;


pub use abi::Contracts;
pub use chain::rpc::{RpcPublicClient, RpcWalletClient};
pub use chain::{PublicClient, Receipt, SimulatedRequest, WalletClient};
pub use config::{ClientConfig, Deployment, Endpoints};
pub use errors::{
    ChainError, ConfigError, DaoSetupError, EncodingError, IndexerError, ReadError,
    SimulationError, SubmissionError, UploadError, WorkflowError,
};
pub use indexer::IndexerClient;
pub use metadata::{ContentId, IpfsClient, MetadataStore};
pub use notify::{LogNotifier, Notification, Notifier};
pub use staking::{StakeCall, StakingClient};
pub use workflow::{
    CreatePayment, ExecutePayment, PaymentWorkflow, Refresh, RejectPayment, WorkflowState,
};
