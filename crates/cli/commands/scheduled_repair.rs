use axonops_reconciler::controllers::{
    delete_all_scheduled_repairs, reconcile_scheduled_repair, ScheduledRepairOutcome,
};
use axonops_reconciler::{Api, ClusterRef};
use tracing::info;

use super::emit;
use crate::args::{OutputFormat, ScheduledRepairArgs};

pub async fn run<A: Api>(
    api: &A,
    cluster: &ClusterRef,
    args: &ScheduledRepairArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    // Flag combinations are rejected before anything is listed or deleted
    let request = args.to_request()?;

    if args.delete_all {
        info!("Deleting all scheduled repairs on {}/{}", cluster.org, cluster.cluster);
        let outcome = delete_all_scheduled_repairs(api, cluster, args.dry_run).await?;
        return emit(format, &outcome, print_outcome);
    }

    info!("Reconciling scheduled repair on {}/{}", cluster.org, cluster.cluster);
    let outcome = reconcile_scheduled_repair(api, cluster, &request, args.dry_run).await?;
    emit(format, &outcome, print_outcome)
}

fn print_outcome(outcome: &ScheduledRepairOutcome) {
    if outcome.dry_run {
        for job in &outcome.before {
            println!("Would delete scheduled repair {}", job.id);
        }
        if let Some(job) = &outcome.after {
            println!("Would add scheduled repair tagged '{}'", job.tag);
        }
        return;
    }

    for id in &outcome.report.deleted {
        println!("Deleted scheduled repair {}", id);
    }
    if outcome.report.created {
        if let Some(job) = &outcome.after {
            println!("Added scheduled repair tagged '{}' ({})", job.tag, job.schedule_expr);
        }
    }
    if !outcome.changed {
        println!("No scheduled repairs to delete.");
    }
}
