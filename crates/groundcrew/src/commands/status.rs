use crate::context::{self, StackArgs};
use colored::Colorize;
use groundcrew_cloud::{AccessBinder, CloudProvider, Provisioner};

pub async fn handle(stack: StackArgs) -> anyhow::Result<()> {
    println!("{}", "Stack status...".blue().bold());

    let ctx = context::build(&stack, None).await?;

    let auth = ctx.provider.check_auth().await?;
    if auth.authenticated {
        println!(
            "  {} authenticated as {}",
            "✓".green(),
            auth.account_info.as_deref().unwrap_or("unknown").cyan()
        );
    } else {
        println!(
            "  {} not authenticated: {}",
            "✗".red(),
            auth.error.as_deref().unwrap_or("unknown")
        );
        anyhow::bail!("run 'az login' and retry");
    }

    let provisioner = Provisioner::new(&ctx.provider, &ctx.spec);
    let (names, outputs) = provisioner.collect_outputs().await?;

    println!();
    let mut missing = 0;
    for resource in ctx.spec.desired_resources() {
        match names.get(resource.slug()) {
            Some(physical) => {
                println!("  {} {} {}", "✓".green(), resource.kind.display_name(), physical.cyan());
            }
            None => {
                missing += 1;
                println!("  {} {} missing", "•".normal(), resource.kind.display_name());
            }
        }
    }

    let binder = AccessBinder::new(&ctx.provider);
    let consents = binder.consent_steps(&names, &outputs);
    if !consents.is_empty() {
        println!();
        for step in &consents {
            if step.consented {
                println!("  {} {} connection consented", "✓".green(), step.connector);
            } else {
                println!("  {} {} connection awaiting consent", "⚠".yellow(), step.connector);
            }
        }
    }

    println!();
    if missing == 0 {
        println!("{}", "Stack is fully provisioned.".green());
    } else {
        println!("{missing} resource(s) missing; run 'crew deploy' to reconcile.");
    }

    Ok(())
}
