use crate::context::{self, StackArgs};
use colored::Colorize;
use groundcrew_cloud::{PlannedAction, Provisioner};

pub async fn handle(stack: StackArgs) -> anyhow::Result<()> {
    println!("{}", "Planning (read-only)...".blue().bold());

    let ctx = context::build(&stack, None).await?;
    let provisioner = Provisioner::new(&ctx.provider, &ctx.spec);
    let steps = provisioner.plan().await?;

    println!();
    let mut conflicts = 0;
    for step in &steps {
        match step.action {
            PlannedAction::Create => {
                let slice = if step.attempt > 0 {
                    format!(" (digest slice {})", step.attempt)
                } else {
                    String::new()
                };
                println!(
                    "  {} create {} {}{}",
                    "+".green(),
                    step.display,
                    step.physical_name.cyan(),
                    slice
                );
            }
            PlannedAction::Reuse => {
                println!("  {} reuse  {} {}", "=".normal(), step.display, step.physical_name.cyan());
            }
            PlannedAction::Conflict => {
                conflicts += 1;
                println!(
                    "  {} conflict {}; all deterministic names taken by other owners",
                    "!".red(),
                    step.display
                );
            }
        }
    }

    let create = steps.iter().filter(|s| s.action == PlannedAction::Create).count();
    let reuse = steps.iter().filter(|s| s.action == PlannedAction::Reuse).count();
    println!();
    println!("{create} to create, {reuse} to reuse, {conflicts} conflicts");
    if conflicts > 0 {
        println!(
            "{}",
            "Hint: deploy with --timestamp-fallback to escape exhausted names.".yellow()
        );
    }

    Ok(())
}
