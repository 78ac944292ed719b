use std::{fs, path::PathBuf, sync::Arc};

use alloy_primitives::{Address, B256, U256};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use ovc_client::{
    dao_setup, views, CreatePayment, Deployment, Endpoints, ExecutePayment, IndexerClient,
    IpfsClient, LogNotifier, PaymentWorkflow, PublicClient, Refresh, RejectPayment,
    RpcPublicClient, RpcWalletClient, StakeCall, StakingClient, WalletClient,
};
use ovc_types::Department;
use time::OffsetDateTime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Browse Verified Contributor departments and manage their optimistic payments.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Deployment file with contract addresses (eg, deployments.polygon.json).
    #[arg(long, env = "DEPLOYMENTS_PATH", default_value = "deployments.polygon.json")]
    deployments_path: PathBuf,

    /// RPC URL of the chain the deployment lives on. Required for anything touching the chain.
    #[arg(long, env = "RPC_URL")]
    rpc_url: Option<String>,

    #[arg(long, env = "INDEXER_URL", default_value = ovc_client::config::DEFAULT_INDEXER_URL)]
    indexer_url: String,

    #[arg(long, env = "OPENRD_INDEXER_URL", default_value = ovc_client::config::DEFAULT_OPENRD_INDEXER_URL)]
    openrd_indexer_url: String,

    /// IPFS HTTP API used to pin payment and rejection metadata.
    #[arg(long, env = "IPFS_API_URL", default_value = ovc_client::config::DEFAULT_IPFS_API_URL)]
    ipfs_api_url: String,

    #[arg(long, env = "OPENRD_URL", default_value = ovc_client::config::DEFAULT_OPENRD_URL)]
    openrd_url: String,

    /// Path to a file containing the signing private key.
    #[arg(long, env = "PRIV_KEY_PATH", conflicts_with = "private_key")]
    private_key_path: Option<String>,

    /// Private key (hex string, 0x...).
    #[arg(long, env = "PKEY", conflicts_with = "private_key_path")]
    private_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all departments.
    Departments,
    /// Show one department and its DAO profile.
    Department { hash: B256 },
    /// List the optimistic payments of a department.
    Payments { hash: B256 },
    /// List the tasks a department manages.
    Tasks { hash: B256 },
    /// Show one task and whether the signer may request a payment for it.
    Task { task_id: U256 },
    /// Request a payment for a task the signer executes.
    CreatePayment {
        hash: B256,
        task_id: U256,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Whole token units.
        #[arg(long)]
        amount: U256,
        /// Whole token units added to budget and reward.
        #[arg(long)]
        budget_increase: Option<U256>,
        #[arg(long)]
        extend_weeks: Option<u64>,
    },
    /// Reject a pending payment request.
    RejectPayment {
        hash: B256,
        request_id: u32,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Execute a payment request whose delay has passed.
    ExecutePayment { hash: B256, request_id: u32 },
    /// Show claimable staking rewards, or stake/unstake/claim.
    Staking {
        #[arg(value_enum)]
        action: Option<StakeArg>,
    },
    /// Propose the multisig setup that enables optimistic payments for a department.
    PrepareDao { hash: B256 },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StakeArg {
    Stake,
    Unstake,
    Claim,
}

impl From<StakeArg> for StakeCall {
    fn from(arg: StakeArg) -> Self {
        match arg {
            StakeArg::Stake => StakeCall::Stake,
            StakeArg::Unstake => StakeCall::Unstake,
            StakeArg::Claim => StakeCall::Claim,
        }
    }
}

/// Reloads and prints the payments of a department after a confirmed transaction.
struct ReloadPayments {
    indexer: IndexerClient,
    dao: Address,
}

#[async_trait]
impl Refresh for ReloadPayments {
    async fn refresh(&self) {
        match self.indexer.optimistic_payments(self.dao).await {
            Ok(payments) => info!(dao = %self.dao, count = payments.len(), "payments reloaded"),
            Err(e) => warn!(dao = %self.dao, error = %e, "could not reload payments"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let app = App::new(&cli)?;

    match cli.command {
        Command::Departments => app.departments().await,
        Command::Department { hash } => app.department(hash).await,
        Command::Payments { hash } => app.payments(hash).await,
        Command::Tasks { hash } => app.tasks(hash).await,
        Command::Task { task_id } => app.task(task_id).await,
        Command::CreatePayment {
            hash,
            task_id,
            title,
            description,
            amount,
            budget_increase,
            extend_weeks,
        } => {
            app.create_payment(
                hash,
                task_id,
                title,
                description,
                amount,
                budget_increase,
                extend_weeks,
            )
            .await
        }
        Command::RejectPayment {
            hash,
            request_id,
            reason,
        } => app.reject_payment(hash, request_id, reason).await,
        Command::ExecutePayment { hash, request_id } => {
            app.execute_payment(hash, request_id).await
        }
        Command::Staking { action } => app.staking(action.map(StakeCall::from)).await,
        Command::PrepareDao { hash } => app.prepare_dao(hash).await,
    }
}

struct App {
    endpoints: Endpoints,
    deployment: Deployment,
    indexer: IndexerClient,
    public: Option<Arc<dyn PublicClient>>,
    wallet: Option<Arc<dyn WalletClient>>,
}

impl App {
    fn new(cli: &Cli) -> Result<Self> {
        let deployment = Deployment::load(&cli.deployments_path)?;
        let endpoints = Endpoints {
            rpc_url: cli.rpc_url.clone().unwrap_or_default(),
            indexer_url: cli.indexer_url.clone(),
            openrd_indexer_url: cli.openrd_indexer_url.clone(),
            ipfs_api_url: cli.ipfs_api_url.clone(),
            openrd_url: cli.openrd_url.clone(),
        };
        let indexer = IndexerClient::new(&endpoints.indexer_url, &endpoints.openrd_indexer_url);

        let (public, wallet) = match &cli.rpc_url {
            Some(rpc_url) => {
                let public: Arc<dyn PublicClient> = Arc::new(RpcPublicClient::connect(rpc_url)?);
                let wallet = match signing_key(cli)? {
                    Some(key) => Some(Arc::new(RpcWalletClient::connect(
                        rpc_url,
                        &key,
                        deployment.chain_id,
                    )?) as Arc<dyn WalletClient>),
                    None => None,
                };
                (Some(public), wallet)
            }
            None => (None, None),
        };

        Ok(Self {
            endpoints,
            deployment,
            indexer,
            public,
            wallet,
        })
    }

    fn account(&self) -> Option<Address> {
        self.wallet.as_ref().map(|w| w.account())
    }

    fn workflow(&self) -> Result<PaymentWorkflow> {
        let store = Arc::new(IpfsClient::new(&self.endpoints.ipfs_api_url));
        let mut workflow =
            PaymentWorkflow::new(self.deployment.clone(), store, Arc::new(LogNotifier::default()))?;
        if let Some(public) = &self.public {
            workflow = workflow.with_public_client(public.clone());
        }
        if let Some(wallet) = &self.wallet {
            workflow = workflow.with_wallet(wallet.clone());
        }
        Ok(workflow)
    }

    async fn has_role(&self, workflow: &PaymentWorkflow, role: U256) -> Result<bool> {
        let Some(account) = self.account() else {
            return Ok(false);
        };
        Ok(views::has_role(
            self.public.as_deref(),
            workflow.contracts(),
            &self.deployment,
            account,
            role,
        )
        .await?)
    }

    async fn department_of(&self, hash: B256) -> Result<Department> {
        self.indexer
            .department(hash)
            .await
            .with_context(|| format!("department {hash} not found"))
    }

    async fn departments(&self) -> Result<()> {
        for department in self.indexer.departments().await? {
            match self.indexer.department(department.hash).await {
                Ok(d) => println!("{}  {} ({})", department.hash, d.name, d.dao),
                Err(e) => println!("{}  <{e}>", department.hash),
            }
        }
        Ok(())
    }

    async fn department(&self, hash: B256) -> Result<()> {
        let department = self.department_of(hash).await?;
        let metadata = self.indexer.dao_metadata(department.dao).await?;
        let role = self.indexer.dao_role(department.dao).await?;
        println!("{} ({})", department.name, department.dao);
        if let Some(title) = metadata.title {
            println!("{title}");
        }
        if let Some(description) = metadata.description {
            println!("{description}");
        }
        println!("Role: {}", role.role);
        Ok(())
    }

    async fn payments(&self, hash: B256) -> Result<()> {
        let department = self.department_of(hash).await?;
        let role = self.indexer.dao_role(department.dao).await?.role;
        let workflow = self.workflow()?;
        let has_role = self.has_role(&workflow, role).await?;
        let now = now();

        let payments = self.indexer.optimistic_payments(department.dao).await?;
        if payments.is_empty() {
            println!("No payments yet.");
        }
        for (id, payment) in payments.iter().rev() {
            let view = views::PaymentView::new(
                *id,
                payment,
                self.deployment.payment_decimals,
                has_role,
                now,
            );
            if view.has_illegal_actions() {
                warn!(request = id, "payment contains actions outside the payment whitelist");
            }
            print!("{view}");
        }
        Ok(())
    }

    async fn tasks(&self, hash: B256) -> Result<()> {
        let department = self.department_of(hash).await?;
        for task in self
            .indexer
            .department_tasks(department.dao, self.deployment.chain_id)
            .await?
        {
            let title = match self.indexer.task(task.chain_id, task.task_id).await {
                Ok(indexed) => views::task_title(&indexed, task.task_id),
                Err(_) => format!("#{}", task.task_id),
            };
            println!(
                "{title}  {}",
                views::task_url(&self.endpoints.openrd_url, task.chain_id, task.task_id)
            );
        }
        Ok(())
    }

    async fn task(&self, task_id: U256) -> Result<()> {
        let task = self.indexer.task(self.deployment.chain_id, task_id).await?;
        let role = self.indexer.dao_role(task.manager).await?.role;
        let workflow = self.workflow()?;
        let has_role = self.has_role(&workflow, role).await?;
        println!(
            "{} ({:?})  {}",
            views::task_title(&task, task_id),
            task.state,
            views::task_url(&self.endpoints.openrd_url, self.deployment.chain_id, task_id)
        );
        if views::can_create_payment(has_role, self.account(), &task) {
            println!("You can request a payment for this task.");
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_payment(
        &self,
        hash: B256,
        task_id: U256,
        title: String,
        description: String,
        amount: U256,
        budget_increase: Option<U256>,
        extend_weeks: Option<u64>,
    ) -> Result<()> {
        let department = self.department_of(hash).await?;
        let role = self.indexer.dao_role(department.dao).await?.role;
        let task = self.indexer.task(self.deployment.chain_id, task_id).await?;
        let workflow = self.workflow()?;
        if !views::can_create_payment(self.has_role(&workflow, role).await?, self.account(), &task)
        {
            bail!("the signer is not a role holder executing task {task_id}");
        }

        let request = CreatePayment {
            dao: department.dao,
            role,
            task_id,
            executor_application: Some(task.executor_application),
            title,
            description,
            amount,
            budget_increase,
            deadline_extension_weeks: extend_weeks,
        };
        let receipt = workflow
            .create_payment(request, &self.reload(department.dao))
            .await?;
        println!("Payment requested in {}", receipt.transaction_hash);
        Ok(())
    }

    async fn reject_payment(&self, hash: B256, request_id: u32, reason: String) -> Result<()> {
        let department = self.department_of(hash).await?;
        let role = self.indexer.dao_role(department.dao).await?.role;
        let request = RejectPayment {
            dao: department.dao,
            role,
            request_id,
            reason,
        };
        let receipt = self
            .workflow()?
            .reject_payment(request, &self.reload(department.dao))
            .await?;
        println!("Payment rejected in {}", receipt.transaction_hash);
        Ok(())
    }

    async fn execute_payment(&self, hash: B256, request_id: u32) -> Result<()> {
        let department = self.department_of(hash).await?;
        let request = ExecutePayment {
            dao: department.dao,
            request_id,
        };
        let receipt = self
            .workflow()?
            .execute_payment(request, &self.reload(department.dao))
            .await?;
        println!("Payment executed in {}", receipt.transaction_hash);
        Ok(())
    }

    async fn staking(&self, call: Option<StakeCall>) -> Result<()> {
        let account = self
            .account()
            .ok_or_else(|| anyhow!("staking needs a signer: provide --private-key-path or --private-key"))?;
        let staking = StakingClient::new(
            self.deployment.clone(),
            self.public.clone(),
            self.wallet.clone(),
        )?;
        let token_id = staking.token_of(account).await?;
        if token_id.is_zero() {
            bail!("{account} holds no verified contributor token");
        }

        match call {
            None => {
                let claimable = staking.claimable(token_id).await?;
                println!(
                    "Token {token_id}: {} claimable",
                    StakingClient::format_claimable(claimable)
                );
            }
            Some(call) => {
                let hash = staking.send(call, token_id).await?;
                println!("{} submitted: {}", call.function(), self.deployment.explorer_tx_url(hash));
            }
        }
        Ok(())
    }

    async fn prepare_dao(&self, hash: B256) -> Result<()> {
        let department = self.department_of(hash).await?;
        let workflow = self.workflow()?;
        let tx = dao_setup::propose_setup(
            self.public.as_deref(),
            self.wallet.as_deref(),
            workflow.contracts(),
            &self.deployment,
            department.dao,
            U256::from_be_bytes(hash.0),
            now(),
        )
        .await?;
        println!("Setup proposed: {}", self.deployment.explorer_tx_url(tx));
        Ok(())
    }

    fn reload(&self, dao: Address) -> ReloadPayments {
        ReloadPayments {
            indexer: self.indexer.clone(),
            dao,
        }
    }
}

fn signing_key(cli: &Cli) -> Result<Option<String>> {
    if let Some(ref path) = cli.private_key_path {
        let key = fs::read_to_string(path).with_context(|| format!("failed reading {path}"))?;
        return Ok(Some(key.trim().to_string()));
    }
    Ok(cli.private_key.clone())
}

fn now() -> u64 {
    u64::try_from(OffsetDateTime::now_utc().unix_timestamp()).unwrap_or_default()
}
