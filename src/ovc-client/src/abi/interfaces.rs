//! Human-readable ABI of the deployed contracts.
//!
//! Only the functions the client calls are listed, together with every error the contracts
//! declare, so that reverts bubbling up through nested calls can be named.

/// OpenR&D task contract.
pub const TASKS: &[&str] = &[
    "function partialPayment(uint256 _taskId, uint96[] _partialNativeReward, uint88[] _partialReward)",
    "function increaseBudget(uint256 _taskId, uint96[] _increase)",
    "function increaseReward(uint256 _taskId, uint32 _applicationId, uint96[] _nativeIncrease, uint88[] _increase)",
    "function extendDeadline(uint256 _taskId, uint64 _extension)",
    "error TaskDoesNotExist()",
    "error TaskNotOpen()",
    "error TaskNotTaken()",
    "error TaskClosed()",
    "error NotManager()",
    "error NotExecutor()",
    "error ApplicationDoesNotExist()",
    "error PartialRewardAboveFullReward()",
    "error ArrayLargerThanSupported()",
    "error ERC20TransferReverted()",
];

/// Optimistic action queue: actions executable after a delay unless rejected.
pub const OPTIMISTIC_ACTIONS: &[&str] = &[
    "function createAction(address _trustlessManagement, uint256 _role, (address,uint256,bytes)[] _actions, uint256 _failureMap, string _metadata) returns (uint32 id)",
    "function rejectAction(uint32 _id, string _metadata)",
    "function executeAction(address _dao, uint32 _id) returns (bytes[] returnValues, uint256 failureMap)",
    "error RequestDoesNotExist()",
    "error RequestNotExecutableYet()",
    "error RequestAlreadyExecuted()",
    "error RequestWasRejected()",
];

/// Governance-permission contract scoped to verified contributor tags.
pub const TRUSTLESS_MANAGEMENT: &[&str] = &[
    "function asDAO(address _dao, uint256 _role, (address,uint256,bytes)[] _actions, uint256 _failureMap) returns (bytes[] returnValues, uint256 failureMap)",
    "function hasRole(address _account, uint256 _role) view returns (bool)",
    "function changeZoneAccess(address _dao, uint256 _role, address _zone, address _permissionChecker)",
    "error NotAuthorized()",
    "error PermissionDenied()",
    "error FunctionBlacklisted()",
];

/// Governance-permission contract keyed by plain addresses.
pub const ADDRESS_TRUSTLESS_MANAGEMENT: &[&str] = &[
    "function changeFullAccess(address _dao, uint256 _role, address _permissionChecker)",
    "error NotAuthorized()",
    "error PermissionDenied()",
];

/// Aragon DAO core.
pub const DAO: &[&str] = &[
    "function grant(address _where, address _who, bytes32 _permissionId)",
    "error Unauthorized(address where, address who, bytes32 permissionId)",
    "error ActionFailed(uint256 index)",
    "error TooManyActions()",
    "error InsufficientGas()",
];

pub const STAKING: &[&str] = &[
    "function stake(uint256 _tokenId)",
    "function unstake(uint256 _tokenId)",
    "function claim(uint256 _tokenId)",
    "function claimable(uint256 _tokenId) view returns (uint256)",
    "error NotYourToken()",
    "error AlreadyStaking()",
    "error NotStaking()",
];

/// Verified contributor NFT (ERC-721 enumerable).
pub const VERIFIED_CONTRIBUTOR: &[&str] = &[
    "function balanceOf(address _owner) view returns (uint256)",
    "function tokenOfOwnerByIndex(address _owner, uint256 _index) view returns (uint256)",
];

/// Aragon multisig plugin of the department DAO.
pub const MULTISIG: &[&str] = &[
    "function createProposal(bytes _metadata, (address,uint256,bytes)[] _actions, uint256 _allowFailureMap, bool _approveProposal, bool _tryExecution, uint64 _startDate, uint64 _endDate) returns (uint256 proposalId)",
    "error ProposalCreationForbidden(address sender)",
    "error DateOutOfBounds(uint64 limit, uint64 actual)",
];
