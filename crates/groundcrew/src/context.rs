//! Shared command context
//!
//! Every subcommand starts from the same place: parse the stack arguments,
//! check the az session, and build an immutable [`StackSpec`] for the run.
//! There is no global state; the context is passed explicitly.

use clap::Args;
use colored::Colorize;
use groundcrew_cloud::RetryConfig;
use groundcrew_cloud_azure::AzureProvider;
use groundcrew_core::{parse_tag, StackSpec};

#[derive(Args, Clone)]
pub struct StackArgs {
    /// Resource group to provision into
    #[arg(short = 'g', long, env = "CREW_RESOURCE_GROUP")]
    pub resource_group: String,

    /// Region for newly created resources
    #[arg(short = 'l', long, env = "CREW_LOCATION", default_value = "westus")]
    pub location: String,

    /// Prefix for derived resource names
    #[arg(short = 'p', long, env = "CREW_PROJECT", default_value = "proj")]
    pub project: String,

    /// Subscription id (defaults to the signed-in account's subscription)
    #[arg(long, env = "CREW_SUBSCRIPTION")]
    pub subscription: Option<String>,

    /// Reuse this existing API gateway instead of creating one
    #[arg(long)]
    pub gateway: Option<String>,

    /// Tag applied to created resources (key=value, repeatable)
    #[arg(short, long = "tag", value_name = "KEY=VALUE")]
    pub tags: Vec<String>,
}

#[derive(Args, Clone)]
pub struct RetryArgs {
    /// Attempts per provider call before giving up on transient faults
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Base backoff delay in milliseconds (doubles per attempt)
    #[arg(long, default_value_t = 500)]
    pub retry_base_ms: u64,
}

impl RetryArgs {
    pub fn to_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retries,
            initial_delay: std::time::Duration::from_millis(self.retry_base_ms),
            ..RetryConfig::default()
        }
    }
}

pub struct RunContext {
    pub spec: StackSpec,
    pub provider: AzureProvider,
    pub retry: RetryConfig,
}

pub async fn build(stack: &StackArgs, retry: Option<&RetryArgs>) -> anyhow::Result<RunContext> {
    let provider = AzureProvider::new(stack.subscription.clone());

    let subscription = match &stack.subscription {
        Some(id) => id.clone(),
        None => {
            let account = provider.account().await.map_err(|err| {
                anyhow::anyhow!("{err}\nHint: run 'az login' and retry")
            })?;
            println!("Account: {}", format!("{} ({})", account.name, account.id).cyan());
            account.id
        }
    };

    let mut spec = StackSpec::new(
        subscription,
        &stack.resource_group,
        &stack.location,
        &stack.project,
    );
    spec.existing_gateway = stack.gateway.clone();
    for raw in &stack.tags {
        let (key, value) = parse_tag(raw)?;
        spec.tags.insert(key, value);
    }

    Ok(RunContext {
        spec,
        provider,
        retry: retry.map(RetryArgs::to_config).unwrap_or_default(),
    })
}
