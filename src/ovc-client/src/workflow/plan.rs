//! Action lists for the optimistic payment operations.

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, U256};
use ovc_types::Action;

use crate::abi::Contracts;
use crate::config::Deployment;
use crate::encoder::{
    action_array, address, encode_call, scale_amount, uint, uint256, uint_array,
    weeks_to_seconds,
};
use crate::errors::EncodingError;

/// Request a payment to the executor of `task_id`, paid from the DAO after the optimistic delay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatePayment {
    pub dao: Address,
    pub role: U256,
    pub task_id: U256,
    /// Application of the task's executor; `increaseReward` targets it.
    pub executor_application: Option<u32>,
    pub title: String,
    pub description: String,
    /// Whole token units.
    pub amount: U256,
    /// Whole token units added to both budget and reward.
    pub budget_increase: Option<U256>,
    pub deadline_extension_weeks: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectPayment {
    pub dao: Address,
    pub role: U256,
    pub request_id: u32,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutePayment {
    pub dao: Address,
    pub request_id: u32,
}

/// Task calls of a payment request: `partialPayment`, then optionally
/// `increaseBudget` + `increaseReward`, then optionally `extendDeadline`.
pub fn payment_actions(
    contracts: &Contracts,
    deployment: &Deployment,
    request: &CreatePayment,
) -> Result<Vec<Action>, EncodingError> {
    let decimals = deployment.payment_decimals;
    let tasks = &contracts.tasks;
    let task_id = uint256(request.task_id);
    let mut actions = Vec::with_capacity(4);

    let amount = scale_amount(request.amount, decimals)?;
    actions.push(Action::call(
        deployment.tasks,
        encode_call(
            tasks,
            "partialPayment",
            &[task_id.clone(), uint_array(&[], 96), uint_array(&[amount], 88)],
        )?,
    ));

    if let Some(increase) = request.budget_increase {
        let increase = scale_amount(increase, decimals)?;
        actions.push(Action::call(
            deployment.tasks,
            encode_call(
                tasks,
                "increaseBudget",
                &[task_id.clone(), uint_array(&[increase], 96)],
            )?,
        ));
        actions.push(Action::call(
            deployment.tasks,
            encode_call(
                tasks,
                "increaseReward",
                &[
                    task_id.clone(),
                    uint(U256::from(request.executor_application.unwrap_or(0)), 32),
                    uint_array(&[], 96),
                    uint_array(&[increase], 88),
                ],
            )?,
        ));
    }

    if let Some(weeks) = request.deadline_extension_weeks {
        let seconds = weeks_to_seconds(weeks)?;
        actions.push(Action::call(
            deployment.tasks,
            encode_call(
                tasks,
                "extendDeadline",
                &[task_id, uint(U256::from(seconds), 64)],
            )?,
        ));
    }

    Ok(actions)
}

/// `createAction` on the optimistic actions contract, executed under the configured role.
pub fn create_action(
    contracts: &Contracts,
    deployment: &Deployment,
    actions: &[Action],
    metadata_uri: &str,
) -> Result<Action, EncodingError> {
    let data = encode_call(
        &contracts.optimistic_actions,
        "createAction",
        &[
            address(deployment.address_trustless_management),
            uint256(deployment.optimistic_actions_role),
            action_array(actions),
            uint256(U256::ZERO),
            DynSolValue::String(metadata_uri.to_string()),
        ],
    )?;
    Ok(Action::call(deployment.optimistic_actions, data))
}

pub fn reject_action(
    contracts: &Contracts,
    deployment: &Deployment,
    request_id: u32,
    metadata_uri: &str,
) -> Result<Action, EncodingError> {
    let data = encode_call(
        &contracts.optimistic_actions,
        "rejectAction",
        &[uint(U256::from(request_id), 32), DynSolValue::String(metadata_uri.to_string())],
    )?;
    Ok(Action::call(deployment.optimistic_actions, data))
}

/// Direct call; execution needs no role once the delay passed.
pub fn execute_action(
    contracts: &Contracts,
    deployment: &Deployment,
    request: &ExecutePayment,
) -> Result<Action, EncodingError> {
    let data = encode_call(
        &contracts.optimistic_actions,
        "executeAction",
        &[address(request.dao), uint(U256::from(request.request_id), 32)],
    )?;
    Ok(Action::call(deployment.optimistic_actions, data))
}

/// Wrap `action` into `asDAO(dao, role, [action], 0)` on the trustless management contract.
pub fn as_dao(
    contracts: &Contracts,
    deployment: &Deployment,
    dao: Address,
    role: U256,
    action: Action,
) -> Result<Action, EncodingError> {
    let data = encode_call(
        &contracts.trustless_management,
        "asDAO",
        &[
            address(dao),
            uint256(role),
            action_array(&[action]),
            uint256(U256::ZERO),
        ],
    )?;
    Ok(Action::call(deployment.trustless_management, data))
}
