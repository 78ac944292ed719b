//! Read-side interpretation of indexed payments and tasks.

use std::fmt;

use alloy_primitives::{Address, U256};
use ovc_types::metadata::parse_cached;
use ovc_types::{IndexedTask, OptimisticPayment, PaymentAction, PaymentMetadata, RejectionMetadata, TaskState};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::abi::constants::SECONDS_PER_DAY;
use crate::abi::Contracts;
use crate::chain::{self, PublicClient};
use crate::config::Deployment;
use crate::encoder::{address, decode_bool, format_units, uint256};
use crate::errors::ReadError;

const NO_REASON: &str = "No reason was provided.";

/// One task call of a payment, as shown to reviewers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionLine {
    PartialPayment { task_id: U256, amount: String },
    BudgetIncrease { task_id: U256, amount: String },
    DeadlineExtension { task_id: U256, days: u64 },
    /// Native payment attached, or not exactly one token amount.
    IllegalPartialPayment,
    /// Native increase attached, or not exactly one token amount.
    IllegalBudgetIncrease,
}

impl ActionLine {
    pub fn from_action(action: &PaymentAction, decimals: u8) -> Self {
        match action {
            PaymentAction::PartialPayment {
                task_id,
                partial_native_payment,
                partial_payment,
            } => match partial_payment.as_slice() {
                [amount] if partial_native_payment.is_empty() => ActionLine::PartialPayment {
                    task_id: *task_id,
                    amount: format_units(*amount, decimals),
                },
                _ => ActionLine::IllegalPartialPayment,
            },
            PaymentAction::BudgetIncrease {
                task_id,
                native_budget_increase,
                budget_increase,
            } => match budget_increase.as_slice() {
                [amount] if native_budget_increase.is_zero() => ActionLine::BudgetIncrease {
                    task_id: *task_id,
                    amount: format_units(*amount, decimals),
                },
                _ => ActionLine::IllegalBudgetIncrease,
            },
            PaymentAction::DeadlineExtension {
                task_id,
                deadline_extension,
            } => ActionLine::DeadlineExtension {
                task_id: *task_id,
                days: deadline_extension / SECONDS_PER_DAY,
            },
        }
    }

    pub fn is_illegal(&self) -> bool {
        matches!(
            self,
            ActionLine::IllegalPartialPayment | ActionLine::IllegalBudgetIncrease
        )
    }
}

impl fmt::Display for ActionLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionLine::PartialPayment { task_id, amount } => {
                write!(f, "Partial payment of task {task_id} for ${amount}.")
            }
            ActionLine::BudgetIncrease { task_id, amount } => {
                write!(f, "Increase budget of task {task_id} with ${amount}.")
            }
            ActionLine::DeadlineExtension { task_id, days } => {
                write!(f, "Deadline extension of task {task_id} of {days} days")
            }
            ActionLine::IllegalPartialPayment => {
                f.write_str("Illegal partial payment, please reject!")
            }
            ActionLine::IllegalBudgetIncrease => {
                f.write_str("Illegal budget increase, please reject!")
            }
        }
    }
}

/// What a viewer may do with a payment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Controls {
    /// Finalised, or the viewer lacks the role.
    None,
    /// Reject only; execution opens at the given date.
    RejectOnly { executable_on: String },
    ExecuteOrReject,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentView {
    pub request_id: u32,
    pub title: String,
    pub description: Option<String>,
    pub executed: bool,
    pub rejected: bool,
    pub lines: Vec<ActionLine>,
    /// Set on rejected payments.
    pub rejection_reason: Option<String>,
    pub controls: Controls,
}

impl PaymentView {
    /// `now` is a unix timestamp in seconds.
    pub fn new(
        request_id: u32,
        payment: &OptimisticPayment,
        decimals: u8,
        has_role: bool,
        now: u64,
    ) -> Self {
        let metadata: PaymentMetadata =
            parse_cached(payment.cached_metadata.as_deref()).unwrap_or_default();
        let rejection_reason = payment.rejected.then(|| {
            parse_cached::<RejectionMetadata>(payment.cached_rejection_metadata.as_deref())
                .and_then(|m| m.reason)
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| NO_REASON.to_string())
        });

        let controls = if !has_role || payment.rejected || payment.executed {
            Controls::None
        } else if payment.executable_from < now {
            Controls::ExecuteOrReject
        } else {
            Controls::RejectOnly {
                executable_on: date_string(payment.executable_from),
            }
        };

        Self {
            request_id,
            title: metadata
                .title
                .unwrap_or_else(|| format!("#{request_id}")),
            description: metadata.description,
            executed: payment.executed,
            rejected: payment.rejected,
            lines: payment
                .actions
                .iter()
                .map(|a| ActionLine::from_action(a, decimals))
                .collect(),
            rejection_reason,
            controls,
        }
    }

    pub fn has_illegal_actions(&self) -> bool {
        self.lines.iter().any(ActionLine::is_illegal)
    }
}

impl fmt::Display for PaymentView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.request_id, self.title)?;
        if self.rejected {
            f.write_str(" (Rejected)")?;
        }
        if self.executed {
            f.write_str(" (Executed)")?;
        }
        writeln!(f)?;
        if let Some(description) = &self.description {
            writeln!(f, "  {description}")?;
        }
        for line in &self.lines {
            writeln!(f, "  - {line}")?;
        }
        if let Some(reason) = &self.rejection_reason {
            writeln!(f, "  Rejected: {reason}")?;
        }
        match &self.controls {
            Controls::None => Ok(()),
            Controls::RejectOnly { executable_on } => {
                writeln!(f, "  Becomes executable on {executable_on}")
            }
            Controls::ExecuteOrReject => writeln!(f, "  Executable now"),
        }
    }
}

/// `Tue Oct 20 2026`.
pub fn date_string(timestamp: u64) -> String {
    let format = format_description!("[weekday repr:short] [month repr:short] [day] [year]");
    i64::try_from(timestamp)
        .ok()
        .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok())
        .and_then(|dt| dt.format(format).ok())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Link to a task on the OpenR&D front-end.
pub fn task_url(openrd_url: &str, chain_id: u64, task_id: U256) -> String {
    format!("{}/tasks/{chain_id}:{task_id}", openrd_url.trim_end_matches('/'))
}

/// Task title from cached metadata, or `#<id>`.
pub fn task_title(task: &IndexedTask, task_id: U256) -> String {
    parse_cached::<PaymentMetadata>(task.cached_metadata.as_deref())
        .and_then(|m| m.title)
        .unwrap_or_else(|| format!("#{task_id}"))
}

/// A payment may be requested by a role holder who is the executor of a taken task.
pub fn can_create_payment(has_role: bool, account: Option<Address>, task: &IndexedTask) -> bool {
    let Some(account) = account else {
        return false;
    };
    has_role && task.state == TaskState::Taken && task.executor() == Some(account)
}

/// `hasRole(account, role)` on the trustless management contract.
pub async fn has_role(
    public: Option<&dyn PublicClient>,
    contracts: &Contracts,
    deployment: &Deployment,
    account: Address,
    role: U256,
) -> Result<bool, ReadError> {
    let out = chain::read(
        public,
        &contracts.trustless_management,
        deployment.trustless_management,
        "hasRole",
        &[address(account), uint256(role)],
    )
    .await?;
    Ok(decode_bool(&contracts.trustless_management, "hasRole", 2, &out)?)
}
