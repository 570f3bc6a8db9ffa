use crate::context::{self, StackArgs};
use colored::Colorize;
use groundcrew_cloud::{settings::settings_from_run, Provisioner, SettingsMaterializer};
use std::path::PathBuf;

pub async fn handle(stack: StackArgs, settings_out: PathBuf) -> anyhow::Result<()> {
    println!("{}", "Re-materializing settings...".blue().bold());

    let ctx = context::build(&stack, None).await?;
    let provisioner = Provisioner::new(&ctx.provider, &ctx.spec);
    let (_names, outputs) = provisioner.collect_outputs().await?;

    let materializer = SettingsMaterializer::new(&settings_out);
    let document = materializer
        .materialize(&settings_from_run(&ctx.spec, &outputs))
        .await?;

    println!(
        "  {} wrote {} ({} keys)",
        "✓".green(),
        settings_out.display().to_string().cyan(),
        document.values.len()
    );
    let unresolved = document.unresolved();
    if unresolved.is_empty() {
        println!("  {} every setting is resolved", "✓".green());
    } else {
        for key in unresolved {
            println!("  {} {key} is still {}", "⚠".yellow(), groundcrew_cloud::PLACEHOLDER.yellow());
        }
    }

    Ok(())
}
