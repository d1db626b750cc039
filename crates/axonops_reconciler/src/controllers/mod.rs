pub mod adaptive_repair;
pub mod dashboard;
pub mod scheduled_repair;

pub use adaptive_repair::{reconcile_adaptive_repair, AdaptiveRepairOutcome, AdaptiveRepairSettings};
pub use dashboard::{
    delete_dashboard, export_dashboard, import_dashboard, list_dashboards, Dashboard, DashboardCollection,
    ExportReport, ImportRequest,
};
pub use scheduled_repair::{
    delete_all_scheduled_repairs, reconcile_scheduled_repair, PlanReport, RemoteRepairJob, RepairPlan,
    ScheduledRepairJob, ScheduledRepairOutcome,
};

use serde::Serialize;

/// Result of a reconcile: whether the remote state was mutated, and the state
/// before and after.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub changed: bool,
    pub before: T,
    pub after: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Clone> Outcome<T> {
    pub fn unchanged(state: T) -> Self {
        Self {
            changed: false,
            before: state.clone(),
            after: state,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
