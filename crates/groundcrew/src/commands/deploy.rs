use crate::context::{self, RetryArgs, StackArgs};
use colored::Colorize;
use groundcrew_cloud::{
    AccessBinder, Outcome, Provisioner, SettingsMaterializer, settings::settings_from_run,
};
use groundcrew_cloud_azure::stack_grants;
use std::path::PathBuf;

pub async fn handle(
    stack: StackArgs,
    retry: RetryArgs,
    settings_out: PathBuf,
    timestamp_fallback: bool,
    yes: bool,
) -> anyhow::Result<()> {
    println!("{}", "Provisioning the loan-agent stack...".blue().bold());

    let ctx = context::build(&stack, Some(&retry)).await?;
    println!("Resource group: {}", ctx.spec.resource_group.cyan());
    println!("Location: {}", ctx.spec.location.cyan());

    let provisioner = Provisioner::new(&ctx.provider, &ctx.spec)
        .with_retry(ctx.retry.clone())
        .with_timestamp_fallback(timestamp_fallback);

    // Preview first unless the operator already said yes.
    if !yes {
        println!();
        println!("{}", "Planned actions:".bold());
        for step in provisioner.plan().await? {
            let marker = match step.action {
                groundcrew_cloud::PlannedAction::Create => "+".green(),
                groundcrew_cloud::PlannedAction::Reuse => "=".normal(),
                groundcrew_cloud::PlannedAction::Conflict => "!".red(),
            };
            println!("  {} {} {}", marker, step.display, step.physical_name.cyan());
        }
        println!();
        println!("{}", "Run again with --yes to apply.".yellow());
        return Ok(());
    }

    // Step 1: resources
    println!();
    println!("{}", "[1/3] Reconciling resources...".bold());
    let run = provisioner.run().await?;
    for record in &run.report.records {
        match record.outcome {
            Outcome::Created => {
                println!("  {} {} {}", "✓".green(), record.display, record.physical_name.cyan());
            }
            Outcome::Reused => {
                println!(
                    "  {} {} {} (already exists)",
                    "•".normal(),
                    record.display,
                    record.physical_name.cyan()
                );
            }
            Outcome::Skipped => {
                println!(
                    "  {} {} skipped: {}",
                    "⚠".yellow(),
                    record.display,
                    record.detail.as_deref().unwrap_or("-")
                );
            }
            Outcome::Failed | Outcome::Deleted => {
                println!(
                    "  {} {} failed: {}",
                    "✗".red(),
                    record.display,
                    record.detail.as_deref().unwrap_or("-")
                );
            }
        }
    }

    if !run.report.is_success() {
        println!();
        println!(
            "{}",
            "Every step probes before it creates; fix the cause above and re-run \
             'crew deploy' to resume."
                .yellow()
        );
        anyhow::bail!("provisioning failed: {}", run.report);
    }

    // Step 2: access
    println!();
    println!("{}", "[2/3] Binding access...".bold());
    let binder = AccessBinder::new(&ctx.provider).with_retry(ctx.retry.clone());
    let grants = stack_grants(&run.outputs);
    if grants.is_empty() {
        println!("  {} no workflow identity found, skipping grants", "⚠".yellow());
    }
    let (outcomes, failures) = binder.ensure_all(&grants).await?;
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
    if !failures.is_empty() {
        println!("  {}", "Grants are idempotent; re-run 'crew bind' after fixing.".yellow());
    }

    let consents = binder.consent_steps(&run.names, &run.outputs);
    let pending: Vec<_> = consents.iter().filter(|c| !c.consented).collect();
    if !pending.is_empty() {
        println!();
        println!("{}", "Manual follow-up (OAuth consent cannot be automated):".yellow().bold());
        for step in pending {
            println!("  {} {}", "→".yellow(), step.instruction());
        }
    }

    // Step 3: settings
    println!();
    println!("{}", "[3/3] Materializing settings...".bold());
    let materializer = SettingsMaterializer::new(&settings_out);
    let document = materializer
        .materialize(&settings_from_run(&ctx.spec, &run.outputs))
        .await?;
    println!("  {} wrote {}", "✓".green(), settings_out.display().to_string().cyan());
    for key in document.unresolved() {
        println!("  {} {key} is still {}", "⚠".yellow(), groundcrew_cloud::PLACEHOLDER.yellow());
    }

    println!();
    println!("{} {}", "✓".green().bold(), format!("Done: {}", run.report).bold());
    for warning in &run.report.warnings {
        println!("  {} {warning}", "⚠".yellow());
    }

    Ok(())
}
