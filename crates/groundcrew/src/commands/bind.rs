use crate::context::{self, RetryArgs, StackArgs};
use colored::Colorize;
use groundcrew_cloud::{AccessBinder, Provisioner};
use groundcrew_cloud_azure::stack_grants;

pub async fn handle(stack: StackArgs, retry: RetryArgs) -> anyhow::Result<()> {
    println!("{}", "Binding access on the provisioned stack...".blue().bold());

    let ctx = context::build(&stack, Some(&retry)).await?;
    let provisioner = Provisioner::new(&ctx.provider, &ctx.spec).with_retry(ctx.retry.clone());
    let (names, outputs) = provisioner.collect_outputs().await?;

    let grants = stack_grants(&outputs);
    if grants.is_empty() {
        anyhow::bail!(
            "no workflow identity found in resource group '{}'; run 'crew deploy' first",
            ctx.spec.resource_group
        );
    }

    let binder = AccessBinder::new(&ctx.provider).with_retry(ctx.retry.clone());
    let (outcomes, failures) = binder.ensure_all(&grants).await?;

    println!();
    for outcome in &outcomes {
        if outcome.created {
            println!("  {} {} ({})", "✓".green(), outcome.grant.description, outcome.grant.role);
        } else {
            println!("  {} {} (already granted)", "•".normal(), outcome.grant.description);
        }
    }
    for failure in &failures {
        println!("  {} {failure}", "⚠".yellow());
    }

    let consents = binder.consent_steps(&names, &outputs);
    let pending: Vec<_> = consents.iter().filter(|c| !c.consented).collect();
    if pending.is_empty() {
        println!();
        println!("  {} all connections are consented", "✓".green());
    } else {
        println!();
        println!("{}", "Manual follow-up (OAuth consent cannot be automated):".yellow().bold());
        for step in pending {
            println!("  {} {}", "→".yellow(), step.instruction());
        }
    }

    if !failures.is_empty() {
        anyhow::bail!("{} grant(s) failed; 'crew bind' is safe to re-run", failures.len());
    }
    Ok(())
}
