use alloy_primitives::{Bytes, TxHash};
use thiserror::Error;

/// Errors during metadata upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("metadata storage unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("metadata storage returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("metadata storage returned a malformed content id `{0}`")]
    InvalidContentId(String),

    #[error("content id pattern does not compile: {0}")]
    Pattern(#[from] regex::Error),

    #[error("could not serialise metadata document: {0}")]
    Serialise(#[from] serde_json::Error),
}

/// Errors during call construction. These indicate a programming error, not a user error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("invalid interface item `{item}`: {reason}")]
    InvalidInterface { item: String, reason: String },

    #[error("function `{0}` is not part of the interface")]
    UnknownFunction(String),

    #[error("arguments do not match `{function}`: {reason}")]
    InvalidArguments { function: String, reason: String },

    #[error("unexpected return data from `{function}`: {reason}")]
    InvalidReturn { function: String, reason: String },

    #[error("amount {0} does not fit the encoded integer width")]
    AmountOverflow(String),
}

/// Errors reported by the chain or the wallet.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// The call reverted. `data` is the raw revert payload when the node returned one.
    #[error("{message}")]
    Reverted {
        message: String,
        data: Option<Bytes>,
    },

    /// The wallet refused to sign or submit.
    #[error("{0}")]
    Rejected(String),

    #[error("transaction {0} was dropped before it was mined")]
    Dropped(TxHash),

    #[error("{0}")]
    Transport(String),
}

impl ChainError {
    /// Short human message, comparable to a wallet library's `shortMessage`.
    pub fn short_message(&self) -> String {
        self.to_string()
    }

    pub fn revert_data(&self) -> Option<&[u8]> {
        match self {
            ChainError::Reverted { data: Some(data), .. } => Some(data.as_ref()),
            _ => None,
        }
    }
}

/// Which connection is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingClient {
    Public,
    Wallet,
}

impl std::fmt::Display for MissingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingClient::Public => f.write_str("PublicClient"),
            MissingClient::Wallet => f.write_str("WalletClient"),
        }
    }
}

/// Dry-run failure with the decoded revert cause, when one was found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.describe())]
pub struct SimulationError {
    pub message: String,
    pub decoded: Option<String>,
}

impl SimulationError {
    /// `<BaseMessage> -> <DecodedErrorName>` when a declared error matched.
    pub fn describe(&self) -> String {
        match &self.decoded {
            Some(name) => format!("{} -> {}", self.message, name),
            None => self.message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Transaction rejected.")]
    Rejected,

    #[error("Transaction reverted.")]
    Reverted(TxHash),

    #[error("Transaction could not be confirmed.")]
    Unconfirmed(TxHash),
}

/// Terminal outcome of a failed workflow run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("a previous submission is still running")]
    Busy,

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("{0} is undefined.")]
    ClientUnavailable(MissingClient),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl WorkflowError {
    /// Text of the terminal failure notification.
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::Busy => "The past submission is still running.".to_string(),
            WorkflowError::Upload(_) => "Could not upload metadata to IPFS.".to_string(),
            WorkflowError::ClientUnavailable(_) => self.to_string(),
            WorkflowError::Simulation(e) => e.describe(),
            WorkflowError::Submission(e) => e.to_string(),
            WorkflowError::Encoding(_) => "Could not encode the transaction.".to_string(),
        }
    }
}

/// Errors from the indexer HTTP API.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("indexer request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{what} error: HTTP {status}: {body}")]
    Status {
        what: &'static str,
        status: u16,
        body: String,
    },

    #[error("{what} error: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors during read-only contract calls.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("{0} is undefined.")]
    ClientUnavailable(MissingClient),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed parsing {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors while proposing the department setup.
#[derive(Debug, Error)]
pub enum DaoSetupError {
    #[error("no multisig plugin configured for {network}")]
    NoMultisig { network: String },

    #[error("{0} is undefined.")]
    ClientUnavailable(MissingClient),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("setup proposal not submitted: {0}")]
    Rejected(#[source] ChainError),
}
