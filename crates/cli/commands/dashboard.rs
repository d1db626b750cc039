use axonops_reconciler::controllers::dashboard::{self, Dashboard, ImportRequest};
use axonops_reconciler::controllers::Outcome;
use axonops_reconciler::{Api, ClusterRef};
use tracing::info;

use super::emit;
use crate::args::{DashboardArgs, OutputFormat};

pub async fn run<A: Api>(
    api: &A,
    cluster: &ClusterRef,
    args: &DashboardArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    info!("Running dashboard management on {}/{}", cluster.org, cluster.cluster);

    if args.list {
        let outcome = dashboard::list_dashboards(api, cluster).await?;
        return emit(format, &outcome, |o| {
            if o.after.is_empty() {
                println!("No dashboards found in AxonOps.");
            } else {
                println!("Dashboards in AxonOps:");
                for name in &o.after {
                    println!("- {}", name);
                }
            }
        });
    }

    if let Some(dir) = &args.export_path {
        let report = dashboard::export_dashboard(api, cluster, dir, args.dashboard_name.as_deref()).await?;
        return emit(format, &report, |r| {
            for file in &r.files {
                println!("Exported dashboard to file '{}'", file.display());
            }
            if let Some(message) = &r.message {
                println!("{}", message);
            }
        });
    }

    if let Some(file) = &args.import_file {
        let request = ImportRequest {
            dashboard: Dashboard::load(file).await?,
            name: args.dashboard_name.clone(),
            position: args.position,
            overwrite: args.overwrite,
        };
        let outcome = dashboard::import_dashboard(api, cluster, request).await?;
        return emit(format, &outcome, print_message);
    }

    if let Some(name) = &args.delete_dashboard {
        let outcome = dashboard::delete_dashboard(api, cluster, Some(name.as_str())).await?;
        return emit(format, &outcome, print_message);
    }

    println!("No action specified for dashboard management.");
    Ok(())
}

fn print_message(outcome: &Outcome<Vec<String>>) {
    if let Some(message) = &outcome.message {
        println!("{}", message);
    }
}
