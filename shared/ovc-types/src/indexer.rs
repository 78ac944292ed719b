//! Return types of the indexer HTTP API (departments, DAO roles, optimistic payments, tasks).
//!
//! Only the fields the client reads are modelled; unknown fields are ignored.

use std::collections::BTreeMap;

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Deserializer, Serialize};

use crate::json::{bigint, bigint_seq};

/// Entry of `GET /indexer/departments`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentRef {
    pub hash: B256,
}

/// `GET /indexer/department/:hash`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub name: String,
    pub dao: Address,
}

/// `GET /indexer/daoRole/:dao`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoRole {
    #[serde(with = "bigint")]
    pub role: U256,
}

/// `GET /indexer/optimisticPayments/:dao`, keyed by request id.
pub type OptimisticPayments = BTreeMap<u32, OptimisticPayment>;

/// An optimistic action as indexed: a batch of task calls awaiting execution or rejection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimisticPayment {
    #[serde(default)]
    pub actions: Vec<PaymentAction>,
    /// Unix timestamp (seconds) after which the batch may be executed.
    #[serde(with = "bigint")]
    pub executable_from: u64,
    #[serde(default)]
    pub executed: bool,
    #[serde(default)]
    pub rejected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_rejection_metadata: Option<String>,
}

/// Task call recognised inside an optimistic payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PaymentAction {
    #[serde(rename_all = "camelCase")]
    PartialPayment {
        #[serde(with = "bigint")]
        task_id: U256,
        #[serde(with = "bigint_seq", default)]
        partial_native_payment: Vec<U256>,
        #[serde(with = "bigint_seq", default)]
        partial_payment: Vec<U256>,
    },
    #[serde(rename_all = "camelCase")]
    BudgetIncrease {
        #[serde(with = "bigint")]
        task_id: U256,
        #[serde(with = "bigint")]
        native_budget_increase: U256,
        #[serde(with = "bigint_seq", default)]
        budget_increase: Vec<U256>,
    },
    #[serde(rename_all = "camelCase")]
    DeadlineExtension {
        #[serde(with = "bigint")]
        task_id: U256,
        /// Seconds.
        #[serde(with = "bigint")]
        deadline_extension: u64,
    },
}

impl PaymentAction {
    pub fn task_id(&self) -> U256 {
        match self {
            PaymentAction::PartialPayment { task_id, .. }
            | PaymentAction::BudgetIncrease { task_id, .. }
            | PaymentAction::DeadlineExtension { task_id, .. } => *task_id,
        }
    }
}

/// Task lifecycle as reported by the task contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TaskState {
    Open,
    Taken,
    Closed,
}

impl TryFrom<u8> for TaskState {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TaskState::Open),
            1 => Ok(TaskState::Taken),
            2 => Ok(TaskState::Closed),
            other => Err(format!("unknown task state {other}")),
        }
    }
}

impl From<TaskState> for u8 {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::Open => 0,
            TaskState::Taken => 1,
            TaskState::Closed => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub applicant: Address,
    #[serde(default)]
    pub accepted: bool,
}

/// `GET /openrd-indexer/task/:chainId/:taskId`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedTask {
    pub manager: Address,
    pub state: TaskState,
    #[serde(default)]
    pub executor_application: u32,
    #[serde(default, deserialize_with = "applications")]
    pub applications: BTreeMap<u32, Application>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_metadata: Option<String>,
}

impl IndexedTask {
    /// Applicant of the application that was accepted as executor.
    pub fn executor(&self) -> Option<Address> {
        self.applications
            .get(&self.executor_application)
            .map(|a| a.applicant)
    }
}

/// Applications arrive either as an id-keyed object or, from older indexers, as a plain list.
fn applications<'de, D>(deserializer: D) -> Result<BTreeMap<u32, Application>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    // Buffered (untagged) content keeps object keys as strings, so ids are parsed by hand.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Keyed(BTreeMap<String, Application>),
        List(Vec<Application>),
    }

    match Shape::deserialize(deserializer)? {
        Shape::Keyed(map) => map
            .into_iter()
            .map(|(id, app)| {
                id.parse::<u32>()
                    .map(|id| (id, app))
                    .map_err(|_| D::Error::custom(format!("invalid application id `{id}`")))
            })
            .collect(),
        Shape::List(list) => Ok((0u32..).zip(list).collect()),
    }
}

/// Entry of `POST /openrd-indexer/filterTasks/`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRef {
    pub chain_id: u64,
    #[serde(with = "bigint")]
    pub task_id: U256,
}

/// `GET /openrd-indexer/user/:address`; `metadata` is a JSON document encoded as a string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub metadata: Option<String>,
}

/// Single-property filter of the indexer's object filter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueFilter<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equal: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_equal: Option<T>,
}

impl<T> ValueFilter<T> {
    pub fn equal(value: T) -> Self {
        Self {
            equal: Some(value),
            not_equal: None,
        }
    }
}

/// Body of `filterTasks`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    /// Checksummed manager address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager: Option<ValueFilter<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<ValueFilter<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ValueFilter<TaskState>>,
}

impl TaskFilter {
    /// Tasks managed by `dao` on `chain_id`.
    pub fn managed_by(dao: Address, chain_id: u64) -> Self {
        Self {
            manager: Some(ValueFilter::equal(dao.to_checksum(None))),
            chain_id: Some(ValueFilter::equal(chain_id)),
            state: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use serde_json::json;

    #[test]
    fn decodes_optimistic_payments() {
        let raw = json!({
            "3": {
                "actions": [
                    {
                        "type": "partialPayment",
                        "taskId": {"__type": "bigint", "value": "12"},
                        "partialNativePayment": [],
                        "partialPayment": [{"__type": "bigint", "value": "2500000"}]
                    },
                    {
                        "type": "budgetIncrease",
                        "taskId": {"__type": "bigint", "value": "12"},
                        "nativeBudgetIncrease": {"__type": "bigint", "value": "0"},
                        "budgetIncrease": [{"__type": "bigint", "value": "100"}]
                    },
                    {
                        "type": "deadlineExtension",
                        "taskId": {"__type": "bigint", "value": "12"},
                        "deadlineExtension": {"__type": "bigint", "value": "604800"}
                    }
                ],
                "executableFrom": {"__type": "bigint", "value": "1700000000"},
                "executed": false,
                "rejected": false,
                "cachedMetadata": "{\"title\":\"Alice: May\"}"
            }
        });

        let payments: OptimisticPayments = serde_json::from_value(raw).unwrap();
        let payment = &payments[&3];
        assert_eq!(payment.executable_from, 1_700_000_000);
        assert_eq!(payment.actions.len(), 3);
        assert_eq!(
            payment.actions[0],
            PaymentAction::PartialPayment {
                task_id: U256::from(12u64),
                partial_native_payment: vec![],
                partial_payment: vec![U256::from(2_500_000u64)],
            }
        );
        assert_eq!(
            payment.actions[2],
            PaymentAction::DeadlineExtension {
                task_id: U256::from(12u64),
                deadline_extension: 604_800,
            }
        );
        assert!(payment.actions.iter().all(|a| a.task_id() == U256::from(12u64)));
    }

    #[test]
    fn task_executor_from_keyed_or_listed_applications() {
        let applicant = address!("00000000000000000000000000000000000000aa");
        let keyed: IndexedTask = serde_json::from_value(json!({
            "manager": "0x0000000000000000000000000000000000000001",
            "state": 1,
            "executorApplication": 2,
            "applications": {
                "2": {"applicant": applicant, "accepted": true}
            }
        }))
        .unwrap();
        assert_eq!(keyed.state, TaskState::Taken);
        assert_eq!(keyed.executor(), Some(applicant));

        let listed: IndexedTask = serde_json::from_value(json!({
            "manager": "0x0000000000000000000000000000000000000001",
            "state": 0,
            "applications": [{"applicant": applicant}]
        }))
        .unwrap();
        assert_eq!(listed.executor_application, 0);
        assert_eq!(listed.executor(), Some(applicant));
    }

    #[test]
    fn unknown_task_state_is_rejected() {
        let res = serde_json::from_value::<IndexedTask>(json!({
            "manager": "0x0000000000000000000000000000000000000001",
            "state": 9
        }));
        assert!(res.is_err());
    }

    #[test]
    fn manager_filter_uses_checksummed_address() {
        let dao = address!("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
        let body = serde_json::to_value(TaskFilter::managed_by(dao, 1)).unwrap();
        assert_eq!(
            body,
            json!({
                "manager": {"equal": "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"},
                "chainId": {"equal": 1}
            })
        );
    }
}
