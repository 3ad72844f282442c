//! Runs the built-in tools until SIGINT or SIGTERM.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use toolbelt::{register_builtin, Belt, ShutdownDelivery, StopOrder};

#[derive(Parser)]
#[command(name = "toolbelt")]
#[command(about = "Start a set of tools and stop them on SIGINT or SIGTERM", long_about = None)]
struct Cli {
    /// Config file, one table per tool. A default is written next to it when missing.
    #[arg(short, long, default_value = "toolbelt.toml")]
    config: PathBuf,

    /// Tool to run; its dependencies are started too.
    #[arg(short, long = "tool", default_value = "http")]
    tools: Vec<String>,

    /// Stop tools in reverse start order.
    #[arg(long)]
    reverse_stop: bool,

    /// Keep a shutdown request made before the wait point.
    #[arg(long)]
    latch_shutdown: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("toolbelt: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = register_builtin(Belt::builder()).config_file(&cli.config);
    if cli.reverse_stop {
        builder = builder.stop_order(StopOrder::Reverse);
    }
    if cli.latch_shutdown {
        builder = builder.shutdown_delivery(ShutdownDelivery::Latch);
    }
    let belt = builder.build()?;

    for name in &cli.tools {
        let id = belt
            .find(name)
            .ok_or_else(|| format!("unknown tool `{name}`, expected one of {:?}", names(&belt)))?;
        belt.tool(id, None).await?;
    }

    belt.serve().await?;
    Ok(())
}

fn names(belt: &Belt) -> Vec<&'static str> {
    belt.registered().into_iter().map(|id| id.name()).collect()
}
