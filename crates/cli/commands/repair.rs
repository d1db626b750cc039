use axonops_reconciler::controllers::{reconcile_adaptive_repair, AdaptiveRepairOutcome};
use axonops_reconciler::{Api, ClusterRef};
use serde_json::Value;
use tracing::info;

use super::emit;
use crate::args::{OutputFormat, RepairArgs};

pub async fn run<A: Api>(
    api: &A,
    cluster: &ClusterRef,
    args: &RepairArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let request = args.to_request()?;
    info!("Reconciling adaptive repair on {}/{}", cluster.org, cluster.cluster);

    let outcome = reconcile_adaptive_repair(api, cluster, &request, args.dry_run).await?;
    emit(format, &outcome, print_outcome)
}

fn print_outcome(outcome: &AdaptiveRepairOutcome) {
    if !outcome.changed {
        println!("Adaptive Repair is already up to date.");
        return;
    }

    if outcome.dry_run {
        println!("Adaptive Repair would change:");
    } else {
        println!("Adaptive Repair updated:");
    }
    for (field, before, after) in changed_fields(outcome) {
        println!("  {}: {} -> {}", field, before, after);
    }
}

/// Fields whose value differs between `before` and `after`.
fn changed_fields(outcome: &AdaptiveRepairOutcome) -> Vec<(String, Value, Value)> {
    let (Ok(Value::Object(before)), Ok(Value::Object(after))) =
        (serde_json::to_value(&outcome.before), serde_json::to_value(&outcome.after))
    else {
        return Vec::new();
    };

    after
        .into_iter()
        .filter_map(|(field, new)| {
            let old = before.get(&field).cloned().unwrap_or(Value::Null);
            (old != new).then_some((field, old, new))
        })
        .collect()
}
