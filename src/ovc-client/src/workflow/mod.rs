//! Optimistic payment workflow: upload metadata, build the action list, simulate, submit and
//! wait for confirmation, reporting progress through a [`Notifier`].
//!
//! A workflow instance runs one operation at a time. A second invocation while one is in flight
//! is rejected with [`WorkflowError::Busy`], never queued.

pub mod plan;
pub mod state;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use alloy_primitives::TxHash;
use async_trait::async_trait;
use ovc_types::{Action, PaymentMetadata, RejectionMetadata};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::abi::constants::SUBMITTED_NOTICE;
use crate::abi::{Contracts, Interface};
use crate::chain::{PublicClient, Receipt, WalletClient};
use crate::config::Deployment;
use crate::decoder::{collect_errors, simulation_error};
use crate::errors::{EncodingError, MissingClient, SubmissionError, UploadError, WorkflowError};
use crate::metadata::{ContentId, MetadataStore};
use crate::notify::{Notification, NotificationAction, NotificationId, Notifier};

pub use plan::{CreatePayment, ExecutePayment, RejectPayment};
pub use state::{StateMachine, WorkflowState};

/// Caller hook run once after a confirmed transaction, e.g. to reload payments.
#[async_trait]
pub trait Refresh: Send + Sync {
    async fn refresh(&self);
}

#[async_trait]
impl<F, Fut> Refresh for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn refresh(&self) {
        (self)().await
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    Reject,
    Execute,
}

impl Operation {
    pub fn progress_title(self) -> &'static str {
        match self {
            Operation::Create => "Creating payment request",
            Operation::Reject => "Rejecting payment",
            Operation::Execute => "Generating transaction",
        }
    }

    pub fn failure_title(self) -> &'static str {
        match self {
            Operation::Create => "Payment request creation failed",
            Operation::Reject => "Payment rejection failed",
            Operation::Execute => "Payment execution failed",
        }
    }

    pub fn submitted_title(self) -> &'static str {
        match self {
            Operation::Create => "Payment request transaction submitted",
            Operation::Reject => "Rejection transaction submitted",
            Operation::Execute => "Execute transaction submitted",
        }
    }

    pub fn success_text(self) -> &'static str {
        match self {
            Operation::Create => "The payment request has been created.",
            Operation::Reject => "The payment has been rejected.",
            Operation::Execute => "The payment has been executed.",
        }
    }
}

const UPLOADING: &str = "Uploading metadata to IPFS...";
const SIGNING_TITLE: &str = "Generating transaction";
const SIGNING: &str = "Please sign the transaction in your wallet...";
const CONFIRMING: &str = "Waiting until confirmed on the blockchain...";

/// Clears the busy flag however the run ends, including when the future is dropped.
pub(crate) struct SubmittingGuard<'a>(&'a AtomicBool);

impl<'a> SubmittingGuard<'a> {
    /// Set `flag`, or `None` when it is already set.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The single in-flight progress notification of a run.
struct Progress<'a> {
    notifier: &'a dyn Notifier,
    id: Option<NotificationId>,
}

impl<'a> Progress<'a> {
    fn new(notifier: &'a dyn Notifier) -> Self {
        Self { notifier, id: None }
    }

    fn show(&mut self, notification: Notification) {
        match self.id {
            Some(id) => self.notifier.update(id, notification),
            None => self.id = Some(self.notifier.post(notification)),
        }
    }

    fn dismiss(&mut self) {
        if let Some(id) = self.id.take() {
            self.notifier.dismiss(id);
        }
    }
}

pub struct PaymentWorkflow {
    contracts: Contracts,
    deployment: Deployment,
    store: Arc<dyn MetadataStore>,
    public: Option<Arc<dyn PublicClient>>,
    wallet: Option<Arc<dyn WalletClient>>,
    notifier: Arc<dyn Notifier>,
    submitting: AtomicBool,
    machine: Mutex<StateMachine>,
}

impl PaymentWorkflow {
    pub fn new(
        deployment: Deployment,
        store: Arc<dyn MetadataStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, EncodingError> {
        Ok(Self {
            contracts: Contracts::load()?,
            deployment,
            store,
            public: None,
            wallet: None,
            notifier,
            submitting: AtomicBool::new(false),
            machine: Mutex::new(StateMachine::default()),
        })
    }

    pub fn with_public_client(mut self, client: Arc<dyn PublicClient>) -> Self {
        self.public = Some(client);
        self
    }

    pub fn with_wallet(mut self, wallet: Arc<dyn WalletClient>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn contracts(&self) -> &Contracts {
        &self.contracts
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    pub fn state(&self) -> WorkflowState {
        self.machine().state()
    }

    /// States passed through by the latest run.
    pub fn trace(&self) -> Vec<WorkflowState> {
        self.machine().trace().to_vec()
    }

    /// Create an optimistic payment request for a task.
    pub async fn create_payment(
        &self,
        request: CreatePayment,
        refresh: &dyn Refresh,
    ) -> Result<Receipt, WorkflowError> {
        let op = Operation::Create;
        let guard = self.begin(op)?;
        let mut progress = Progress::new(self.notifier.as_ref());
        let result = self.run_create(&request, &mut progress).await;
        self.finish(op, result, &mut progress, guard, refresh).await
    }

    /// Reject a pending payment request, with a reason.
    pub async fn reject_payment(
        &self,
        request: RejectPayment,
        refresh: &dyn Refresh,
    ) -> Result<Receipt, WorkflowError> {
        let op = Operation::Reject;
        let guard = self.begin(op)?;
        let mut progress = Progress::new(self.notifier.as_ref());
        let result = self.run_reject(&request, &mut progress).await;
        self.finish(op, result, &mut progress, guard, refresh).await
    }

    /// Execute a payment request whose delay has passed.
    pub async fn execute_payment(
        &self,
        request: ExecutePayment,
        refresh: &dyn Refresh,
    ) -> Result<Receipt, WorkflowError> {
        let op = Operation::Execute;
        let guard = self.begin(op)?;
        let mut progress = Progress::new(self.notifier.as_ref());
        let result = self.run_execute(&request, &mut progress).await;
        self.finish(op, result, &mut progress, guard, refresh).await
    }

    /// Error declarations used to decode a failed simulation of `op`.
    pub fn revert_errors(&self, op: Operation) -> Interface {
        let c = &self.contracts;
        match op {
            Operation::Create => collect_errors(&[
                &c.trustless_management,
                &c.optimistic_actions,
                &c.dao,
                &c.tasks,
            ]),
            Operation::Reject => {
                collect_errors(&[&c.trustless_management, &c.optimistic_actions, &c.dao])
            }
            Operation::Execute => collect_errors(&[
                &c.optimistic_actions,
                &c.trustless_management,
                &c.dao,
                &c.tasks,
            ]),
        }
    }

    fn machine(&self) -> MutexGuard<'_, StateMachine> {
        self.machine.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn advance(&self, next: WorkflowState) {
        self.machine().advance(next);
    }

    fn begin(&self, op: Operation) -> Result<SubmittingGuard<'_>, WorkflowError> {
        let Some(guard) = SubmittingGuard::acquire(&self.submitting) else {
            warn!(?op, "submission already running");
            self.notifier.post(Notification::failure(
                "Please wait",
                WorkflowError::Busy.user_message(),
            ));
            return Err(WorkflowError::Busy);
        };
        self.machine().restart();
        Ok(guard)
    }

    async fn finish(
        &self,
        op: Operation,
        result: Result<Receipt, WorkflowError>,
        progress: &mut Progress<'_>,
        guard: SubmittingGuard<'_>,
        refresh: &dyn Refresh,
    ) -> Result<Receipt, WorkflowError> {
        progress.dismiss();
        match result {
            Ok(receipt) => {
                info!(?op, tx = %receipt.transaction_hash, block = ?receipt.block_number, "transaction confirmed");
                self.notifier.post(
                    Notification::success(op.success_text())
                        .with_action(NotificationAction::Refresh),
                );
                // The hook may start the next operation.
                drop(guard);
                refresh.refresh().await;
                Ok(receipt)
            }
            Err(err) => {
                error!(?op, error = %err, "workflow failed");
                self.machine().fail();
                self.notifier
                    .post(Notification::failure(op.failure_title(), err.user_message()));
                Err(err)
            }
        }
    }

    async fn upload(
        &self,
        op: Operation,
        document: &impl Serialize,
        progress: &mut Progress<'_>,
    ) -> Result<ContentId, WorkflowError> {
        self.advance(WorkflowState::Uploading);
        progress.show(Notification::new(op.progress_title(), UPLOADING));
        let document = serde_json::to_value(document).map_err(UploadError::from)?;
        let cid = self.store.upload(&document).await?;
        info!(?op, %cid, "uploaded metadata");
        Ok(cid)
    }

    fn clients(&self) -> Result<(&dyn PublicClient, &dyn WalletClient), WorkflowError> {
        let public = self
            .public
            .as_deref()
            .ok_or(WorkflowError::ClientUnavailable(MissingClient::Public))?;
        let wallet = self
            .wallet
            .as_deref()
            .ok_or(WorkflowError::ClientUnavailable(MissingClient::Wallet))?;
        Ok((public, wallet))
    }

    async fn run_create(
        &self,
        request: &CreatePayment,
        progress: &mut Progress<'_>,
    ) -> Result<Receipt, WorkflowError> {
        let op = Operation::Create;
        let metadata = PaymentMetadata {
            title: Some(request.title.clone()),
            description: Some(request.description.clone()),
        };
        let cid = self.upload(op, &metadata, progress).await?;

        progress.show(Notification::new(SIGNING_TITLE, SIGNING));
        let (public, wallet) = self.clients()?;
        self.advance(WorkflowState::Building);
        let actions = plan::payment_actions(&self.contracts, &self.deployment, request)?;
        let create = plan::create_action(&self.contracts, &self.deployment, &actions, &cid.uri())?;
        let action = plan::as_dao(
            &self.contracts,
            &self.deployment,
            request.dao,
            request.role,
            create,
        )?;
        info!(task = %request.task_id, actions = actions.len(), "built payment request");

        self.submit(op, public, wallet, action, progress).await
    }

    async fn run_reject(
        &self,
        request: &RejectPayment,
        progress: &mut Progress<'_>,
    ) -> Result<Receipt, WorkflowError> {
        let op = Operation::Reject;
        let metadata = RejectionMetadata {
            reason: Some(request.reason.clone()),
        };
        let cid = self.upload(op, &metadata, progress).await?;

        progress.show(Notification::new(SIGNING_TITLE, SIGNING));
        let (public, wallet) = self.clients()?;
        self.advance(WorkflowState::Building);
        let reject = plan::reject_action(
            &self.contracts,
            &self.deployment,
            request.request_id,
            &cid.uri(),
        )?;
        let action = plan::as_dao(
            &self.contracts,
            &self.deployment,
            request.dao,
            request.role,
            reject,
        )?;

        self.submit(op, public, wallet, action, progress).await
    }

    async fn run_execute(
        &self,
        request: &ExecutePayment,
        progress: &mut Progress<'_>,
    ) -> Result<Receipt, WorkflowError> {
        let op = Operation::Execute;
        progress.show(Notification::new(op.progress_title(), SIGNING));
        let (public, wallet) = self.clients()?;
        self.advance(WorkflowState::Building);
        let action = plan::execute_action(&self.contracts, &self.deployment, request)?;

        self.submit(op, public, wallet, action, progress).await
    }

    /// Simulate, hand the simulated request to the wallet, then wait for the receipt.
    async fn submit(
        &self,
        op: Operation,
        public: &dyn PublicClient,
        wallet: &dyn WalletClient,
        action: Action,
        progress: &mut Progress<'_>,
    ) -> Result<Receipt, WorkflowError> {
        self.advance(WorkflowState::Simulating);
        let request = public
            .simulate(wallet.account(), action)
            .await
            .map_err(|e| {
                let err = simulation_error(&e, &self.revert_errors(op));
                warn!(?op, error = %err, "simulation failed");
                err
            })?;

        self.advance(WorkflowState::AwaitingSignature);
        let hash: TxHash = wallet.write(&request).await.map_err(|e| {
            warn!(?op, error = %e, "transaction not submitted");
            SubmissionError::Rejected
        })?;

        self.advance(WorkflowState::Submitted);
        info!(?op, tx = %hash, "transaction submitted");
        progress.show(
            Notification::new(op.submitted_title(), CONFIRMING)
                .with_duration(SUBMITTED_NOTICE)
                .with_action(NotificationAction::ViewOnExplorer {
                    url: self.deployment.explorer_tx_url(hash),
                }),
        );

        let receipt = public.wait_for_receipt(hash).await.map_err(|e| {
            warn!(?op, tx = %hash, error = %e, "receipt unavailable");
            SubmissionError::Unconfirmed(hash)
        })?;
        if !receipt.success {
            return Err(SubmissionError::Reverted(hash).into());
        }
        self.advance(WorkflowState::Confirmed);
        Ok(receipt)
    }
}
