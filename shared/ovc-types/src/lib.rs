//! Shared types for actions, indexed departments/tasks/payments and off-chain metadata.

pub mod action;
pub mod indexer;
pub mod json;
pub mod metadata;

pub use action::Action;
pub use indexer::{
    Application, DaoRole, Department, DepartmentRef, IndexedTask, OptimisticPayment,
    OptimisticPayments, PaymentAction, TaskFilter, TaskRef, TaskState, User, ValueFilter,
};
pub use metadata::{DaoMetadata, PaymentMetadata, RejectionMetadata};
