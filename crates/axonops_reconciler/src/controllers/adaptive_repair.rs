use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::client::{Api, ClusterRef};
use crate::settings::AdaptiveRepairRequest;
use crate::util::errors::{Error, Result, StdError};

/// Field present in every adaptive repair settings response.
pub const SETTINGS_MARKER: &str = "Active";

/// Adaptive repair settings under their remote field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptiveRepairSettings {
    #[serde(rename = "Active")]
    pub active: bool,
    #[serde(rename = "BlacklistedTables", default, deserialize_with = "null_as_empty")]
    pub excluded_tables: Vec<String>,
    #[serde(rename = "FilterTWCSTables")]
    pub filter_twcs: bool,
    #[serde(rename = "GcGraceThreshold")]
    pub gc_grace: i64,
    #[serde(rename = "MaxSegmentsPerTable")]
    pub max_segments_per_table: i64,
    #[serde(rename = "SegmentRetries")]
    pub segment_retries: i64,
    #[serde(rename = "SegmentTargetSizeMB")]
    pub segment_target_size_mb: i64,
    #[serde(rename = "SegmentTimeout")]
    pub segment_timeout: String,
    #[serde(rename = "TableParallelism")]
    pub table_parallelism: i64,
}

impl Default for AdaptiveRepairSettings {
    fn default() -> Self {
        Self {
            active: true,
            excluded_tables: Vec::new(),
            filter_twcs: true,
            gc_grace: 86400,
            max_segments_per_table: 0,
            segment_retries: 3,
            segment_target_size_mb: 0,
            segment_timeout: "2h".to_string(),
            table_parallelism: 10,
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl AdaptiveRepairSettings {
    /// Parses a settings response, rejecting one without the marker field.
    pub fn from_response(response: Value) -> Result<Self> {
        if response.get(SETTINGS_MARKER).is_none() {
            return Err(Error::StdError(StdError::RemoteStateError(
                "Adaptive Repair settings not found for the cluster".to_string(),
            )));
        }
        serde_json::from_value(response).map_err(|e| {
            Error::StdError(StdError::RemoteStateError(format!(
                "Unexpected Adaptive Repair settings: {}",
                e
            )))
        })
    }

    pub fn to_payload(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| Error::StdError(StdError::JsonSerializationError(e)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdaptiveRepairOutcome {
    pub changed: bool,
    pub dry_run: bool,
    pub before: AdaptiveRepairSettings,
    pub after: AdaptiveRepairSettings,
    /// Remote state read back after a write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<AdaptiveRepairSettings>,
}

pub async fn fetch_adaptive_repair<A: Api + ?Sized>(
    api: &A,
    cluster: &ClusterRef,
) -> Result<AdaptiveRepairSettings> {
    let response = api.get(&cluster.adaptive_repair_path()).await?;
    AdaptiveRepairSettings::from_response(response)
}

/// Brings the remote adaptive repair settings in line with `request`.
///
/// Nothing is written when the settings already match or when `dry_run` is
/// set. After a write the settings are read back as confirmation.
pub async fn reconcile_adaptive_repair<A: Api + ?Sized>(
    api: &A,
    cluster: &ClusterRef,
    request: &AdaptiveRepairRequest,
    dry_run: bool,
) -> Result<AdaptiveRepairOutcome> {
    let desired = request.normalize()?;
    let current = fetch_adaptive_repair(api, cluster).await?;

    let changed = current != desired;
    debug!("Adaptive repair current={:?} desired={:?}", current, desired);

    let mut outcome = AdaptiveRepairOutcome {
        changed,
        dry_run,
        before: current,
        after: desired,
        confirmed: None,
    };

    if dry_run || !changed {
        info!(
            "Adaptive repair for {}/{} {}",
            cluster.org,
            cluster.cluster,
            if changed { "would change" } else { "is up to date" }
        );
        return Ok(outcome);
    }

    info!("Updating adaptive repair for {}/{}", cluster.org, cluster.cluster);
    api.post(&cluster.adaptive_repair_path(), &outcome.after.to_payload()?)
        .await?;

    outcome.confirmed = Some(fetch_adaptive_repair(api, cluster).await?);
    Ok(outcome)
}
