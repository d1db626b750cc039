use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{Api, ClusterRef};
use crate::settings::{Parallelism, PaxosMode, ScheduledRepairRequest};
use crate::util::errors::{Error, ErrorWithProgress, Result, StdError};

/// Payload of the add-repair call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledRepairJob {
    pub keyspace: String,
    pub tables: Vec<String>,
    #[serde(rename = "blacklistedTables")]
    pub excluded_tables: Vec<String>,
    pub nodes: Vec<String>,
    pub segments_per_node: u32,
    pub segmented: bool,
    pub incremental: bool,
    pub job_threads: u32,
    pub schedule: bool,
    pub schedule_expr: String,
    pub primary_range: bool,
    pub parallelism: Parallelism,
    pub optimise_streams: bool,
    #[serde(rename = "specificDataCenters")]
    pub datacenters: Vec<String>,
    pub tag: String,
    #[serde(flatten)]
    pub paxos: PaxosMode,
}

/// A scheduled repair as returned by the list call. `ID` is the only stable
/// identity; the tag is client-chosen and may repeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRepairJob {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(rename = "Params", default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

#[derive(Debug, Deserialize)]
struct ScheduledRepairList {
    #[serde(rename = "ScheduledRepairs", default)]
    scheduled_repairs: Option<Vec<RemoteRepairJob>>,
}

/// Deletions to issue in order, then an optional creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepairPlan {
    pub deletes: Vec<RemoteRepairJob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create: Option<ScheduledRepairJob>,
}

impl RepairPlan {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.create.is_none()
    }
}

/// Steps of a plan that have been applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanReport {
    pub deleted: Vec<String>,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledRepairOutcome {
    pub changed: bool,
    pub dry_run: bool,
    /// Jobs matched for removal.
    pub before: Vec<RemoteRepairJob>,
    /// Job created in their place, if any.
    pub after: Option<ScheduledRepairJob>,
    pub report: PlanReport,
}

impl ScheduledRepairOutcome {
    fn new(plan: RepairPlan, report: PlanReport, dry_run: bool) -> Self {
        Self {
            changed: !report.deleted.is_empty() || report.created,
            dry_run,
            before: plan.deletes,
            after: plan.create,
            report,
        }
    }
}

pub async fn list_scheduled_repairs<A: Api + ?Sized>(
    api: &A,
    cluster: &ClusterRef,
) -> Result<Vec<RemoteRepairJob>> {
    let response = api.get(&cluster.scheduled_repairs_path()).await?;
    if response.is_null() {
        return Ok(Vec::new());
    }
    let list: ScheduledRepairList =
        serde_json::from_value(response).map_err(|e| Error::StdError(StdError::JsonSerializationError(e)))?;
    Ok(list.scheduled_repairs.unwrap_or_default())
}

/// Works out which jobs to replace and what to create.
///
/// Validation happens before any remote call. An empty tag never matches
/// existing jobs, so an untagged request only ever adds a job.
pub async fn plan_scheduled_repair<A: Api + ?Sized>(
    api: &A,
    cluster: &ClusterRef,
    request: &ScheduledRepairRequest,
) -> Result<RepairPlan> {
    let desired = request.normalize()?;

    let deletes = if desired.tag.is_empty() {
        debug!("No tag given, treating as a new scheduled repair");
        Vec::new()
    } else {
        let jobs = list_scheduled_repairs(api, cluster).await?;
        let matches: Vec<RemoteRepairJob> = jobs
            .into_iter()
            .filter(|job| job.tag.as_deref() == Some(desired.tag.as_str()))
            .collect();
        debug!("Found {} scheduled repairs tagged '{}'", matches.len(), desired.tag);
        matches
    };

    let create = if request.delete_only { None } else { Some(desired) };
    Ok(RepairPlan { deletes, create })
}

/// Applies a plan one call at a time.
///
/// The first failure stops the run. Steps already applied are not rolled
/// back and are reported on the returned error.
pub async fn execute_plan<A: Api + ?Sized>(
    api: &A,
    cluster: &ClusterRef,
    plan: &RepairPlan,
) -> Result<PlanReport> {
    let mut report = PlanReport::default();

    for job in &plan.deletes {
        info!("Deleting scheduled repair {}", job.id);
        if let Err(e) = api.delete(&cluster.delete_repair_path(&job.id)).await {
            warn!("Deleting scheduled repair {} failed after {} deletions", job.id, report.deleted.len());
            return Err(with_progress(e, report));
        }
        report.deleted.push(job.id.clone());
    }

    if let Some(job) = &plan.create {
        info!("Adding scheduled repair tagged '{}'", job.tag);
        let payload =
            serde_json::to_value(job).map_err(|e| Error::StdError(StdError::JsonSerializationError(e)))?;
        if let Err(e) = api.post(&cluster.add_repair_path(), &payload).await {
            return Err(with_progress(e, report));
        }
        report.created = true;
    }

    Ok(report)
}

fn with_progress(error: Error, report: PlanReport) -> Error {
    match error {
        Error::StdError(e) if !report.deleted.is_empty() => {
            Error::ErrorWithProgress(ErrorWithProgress::new(e, report))
        }
        other => other,
    }
}

/// Replaces every job carrying the request's tag with a freshly built one, or
/// only removes them when the request is delete-only.
pub async fn reconcile_scheduled_repair<A: Api + ?Sized>(
    api: &A,
    cluster: &ClusterRef,
    request: &ScheduledRepairRequest,
    dry_run: bool,
) -> Result<ScheduledRepairOutcome> {
    let plan = plan_scheduled_repair(api, cluster, request).await?;
    if dry_run {
        return Ok(dry_run_outcome(plan));
    }
    let report = execute_plan(api, cluster, &plan).await?;
    Ok(ScheduledRepairOutcome::new(plan, report, false))
}

/// Removes every scheduled repair of the cluster regardless of tag.
pub async fn delete_all_scheduled_repairs<A: Api + ?Sized>(
    api: &A,
    cluster: &ClusterRef,
    dry_run: bool,
) -> Result<ScheduledRepairOutcome> {
    let plan = RepairPlan {
        deletes: list_scheduled_repairs(api, cluster).await?,
        create: None,
    };
    if dry_run {
        return Ok(dry_run_outcome(plan));
    }
    let report = execute_plan(api, cluster, &plan).await?;
    Ok(ScheduledRepairOutcome::new(plan, report, false))
}

fn dry_run_outcome(plan: RepairPlan) -> ScheduledRepairOutcome {
    ScheduledRepairOutcome {
        changed: !plan.is_empty(),
        dry_run: true,
        before: plan.deletes,
        after: plan.create,
        report: PlanReport::default(),
    }
}
