use std::process::ExitCode;

use axonops_reconciler::util::telemetry;
use axonops_reconciler::AxonOpsClient;
use clap::Parser;
use serde_json::{json, Value};

mod args;
mod commands;

use args::{Cli, Command, OutputFormat};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    let format = cli.output;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(format, &e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Everything that can be checked locally is checked before the client exists
    let cluster = cli.cluster_ref()?;
    let config = cli.client_config()?;
    tracing::debug!("Org: {} Cluster: {} ({})", cluster.org, cluster.cluster, cluster.cluster_type);

    let api = AxonOpsClient::new(config)?;

    match &cli.command {
        Command::Repair(args) => commands::repair::run(&api, &cluster, args, cli.output).await,
        Command::ScheduledRepair(args) => {
            commands::scheduled_repair::run(&api, &cluster, args, cli.output).await
        }
        Command::Dashboard(args) => commands::dashboard::run(&api, &cluster, args, cli.output).await,
    }
}

fn report_error(format: OutputFormat, error: &anyhow::Error) {
    match (format, error.downcast_ref::<axonops_reconciler::Error>()) {
        (OutputFormat::Json, Some(e)) => {
            let progress = match e {
                axonops_reconciler::Error::ErrorWithProgress(p) => json!(p.progress),
                axonops_reconciler::Error::StdError(_) => Value::Null,
            };
            println!(
                "{}",
                json!({
                    "changed": progress.is_object(),
                    "error": e.kind_label(),
                    "message": e.to_string(),
                    "progress": progress,
                })
            );
        }
        (OutputFormat::Json, None) => {
            println!("{}", json!({ "changed": false, "error": "error", "message": error.to_string() }));
        }
        (OutputFormat::Text, _) => eprintln!("Error: {}", error),
    }
}
