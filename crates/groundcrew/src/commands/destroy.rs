use crate::context::{self, StackArgs};
use colored::Colorize;
use groundcrew_cloud::{Outcome, Provisioner};

pub async fn handle(stack: StackArgs, delete_group: bool, yes: bool) -> anyhow::Result<()> {
    println!("{}", "Destroying the loan-agent stack...".yellow().bold());

    let ctx = context::build(&stack, None).await?;
    println!("Resource group: {}", ctx.spec.resource_group.cyan());

    if !yes {
        println!();
        println!(
            "{}",
            "This deletes every stack resource the resolver can locate.".yellow()
        );
        if delete_group {
            println!("{}", "The resource group itself will also be deleted.".red());
        }
        println!("Run again with --yes to proceed.");
        return Ok(());
    }

    let provisioner = Provisioner::new(&ctx.provider, &ctx.spec).with_retry(ctx.retry.clone());
    let report = provisioner.destroy(delete_group).await?;

    println!();
    for record in &report.records {
        match record.outcome {
            Outcome::Deleted => {
                println!("  {} {} {}", "✓".green(), record.display, record.physical_name.cyan());
            }
            Outcome::Skipped => {
                println!("  {} {} (not found)", "•".normal(), record.display);
            }
            _ => {
                println!(
                    "  {} {} failed: {}",
                    "✗".red(),
                    record.display,
                    record.detail.as_deref().unwrap_or("-")
                );
            }
        }
    }

    for warning in &report.warnings {
        println!("  {} {warning}", "⚠".yellow());
    }

    if !report.is_success() {
        anyhow::bail!("some resources could not be deleted; 'crew destroy' is safe to re-run");
    }

    println!();
    println!(
        "{} {} resource(s) deleted",
        "✓".green(),
        report.count(Outcome::Deleted)
    );
    Ok(())
}
