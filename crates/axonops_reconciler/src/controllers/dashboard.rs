use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use super::Outcome;
use crate::client::{Api, ClusterRef};
use crate::util::errors::{Error, Result, StdError};

/// A dashboard as stored by the remote service. Only `name` is interpreted,
/// the rest of the body is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub name: String,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Dashboard {
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::StdError(StdError::IoError(e)))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::StdError(StdError::JsonSerializationError(e)))
    }

    /// Pretty JSON with four-space indentation.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)
            .map_err(|e| Error::StdError(StdError::JsonSerializationError(e)))?;
        Ok(buffer)
    }
}

/// The ordered dashboard list of one cluster. It is only ever written back
/// as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardCollection {
    dashboards: Vec<Dashboard>,
}

impl DashboardCollection {
    pub fn new(dashboards: Vec<Dashboard>) -> Self {
        Self { dashboards }
    }

    /// Reads `{type, dashboards}`. A missing or null list is an empty collection.
    pub fn from_response(response: Value) -> Result<Self> {
        let dashboards = match response {
            Value::Object(mut map) => match map.remove("dashboards") {
                Some(Value::Null) | None => Vec::new(),
                Some(list) => serde_json::from_value(list)
                    .map_err(|e| Error::StdError(StdError::JsonSerializationError(e)))?,
            },
            _ => Vec::new(),
        };
        Ok(Self { dashboards })
    }

    pub fn to_payload(&self, cluster_type: &str) -> Value {
        json!({
            "type": cluster_type,
            "dashboards": self.dashboards,
        })
    }

    pub fn len(&self) -> usize {
        self.dashboards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dashboards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dashboard> {
        self.dashboards.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.dashboards.iter().map(|d| d.name.clone()).collect()
    }

    /// Index of the first dashboard with this exact name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.dashboards.iter().position(|d| d.name == name)
    }

    pub fn remove(&mut self, index: usize) -> Dashboard {
        self.dashboards.remove(index)
    }

    /// Removes every dashboard with this name and returns how many went.
    pub fn remove_named(&mut self, name: &str) -> usize {
        let before = self.dashboards.len();
        self.dashboards.retain(|d| d.name != name);
        before - self.dashboards.len()
    }

    /// Inserts at `index` clamped to `[0, len]` and returns the index used.
    pub fn insert_at(&mut self, index: usize, dashboard: Dashboard) -> usize {
        let index = index.min(self.dashboards.len());
        self.dashboards.insert(index, dashboard);
        index
    }

    /// Places `dashboard` following the import rules and returns its index.
    ///
    /// A name clash is a conflict unless `overwrite` is set, in which case the
    /// first clashing entry is replaced and its slot is the default target.
    /// On conflict the collection is left as it was.
    pub fn import(&mut self, dashboard: Dashboard, position: Option<i64>, overwrite: bool) -> Result<usize> {
        let mut old_position = None;
        if let Some(index) = self.position(&dashboard.name) {
            if !overwrite {
                return Err(Error::StdError(StdError::ConflictError(dashboard.name)));
            }
            debug!("Overwriting dashboard '{}' at position {}", dashboard.name, index + 1);
            self.remove(index);
            old_position = Some(index);
        }

        let index = insertion_index(self.len(), position, old_position);
        Ok(self.insert_at(index, dashboard))
    }
}

/// Zero-based insertion index for a 1-based `position` in a list of `len`.
///
/// Positive positions wrap around the list, zero and negative positions count
/// back from the end, and no position reuses `old_position` or appends.
pub fn insertion_index(len: usize, position: Option<i64>, old_position: Option<usize>) -> usize {
    let n = len as i64;
    let index = match position {
        Some(p) if p > 0 => {
            if n == 0 {
                0
            } else {
                (p - 1).rem_euclid(n)
            }
        }
        Some(p) => n + p + 1,
        None => return old_position.unwrap_or(len).min(len),
    };
    index.clamp(0, n) as usize
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportRequest {
    pub dashboard: Dashboard,
    /// When set, the dashboard is only imported if its name matches.
    pub name: Option<String>,
    pub position: Option<i64>,
    pub overwrite: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportReport {
    pub changed: bool,
    pub files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub async fn fetch_dashboards<A: Api + ?Sized>(api: &A, cluster: &ClusterRef) -> Result<DashboardCollection> {
    debug!("Fetching dashboards for {}/{}", cluster.org, cluster.cluster);
    let response = api.get(&cluster.dashboards_path()).await?;
    let collection = DashboardCollection::from_response(response)?;
    debug!("Found {} dashboards", collection.len());
    Ok(collection)
}

async fn push_dashboards<A: Api + ?Sized>(
    api: &A,
    cluster: &ClusterRef,
    collection: &DashboardCollection,
) -> Result<()> {
    info!("Writing {} dashboards to {}/{}", collection.len(), cluster.org, cluster.cluster);
    api.put(&cluster.dashboards_path(), &collection.to_payload(&cluster.cluster_type))
        .await?;
    Ok(())
}

pub async fn list_dashboards<A: Api + ?Sized>(api: &A, cluster: &ClusterRef) -> Result<Outcome<Vec<String>>> {
    let collection = fetch_dashboards(api, cluster).await?;
    let outcome = Outcome::unchanged(collection.names());
    if collection.is_empty() {
        return Ok(outcome.with_message("No dashboards found"));
    }
    Ok(outcome)
}

/// Writes dashboards to `<dir>/<name>_dashboard.json`. With a name only the
/// first match is written, otherwise every dashboard is.
pub async fn export_dashboard<A: Api + ?Sized>(
    api: &A,
    cluster: &ClusterRef,
    dir: &Path,
    name: Option<&str>,
) -> Result<ExportReport> {
    let collection = fetch_dashboards(api, cluster).await?;
    if collection.is_empty() {
        warn!("No dashboard data available to export");
        return Ok(ExportReport {
            message: Some("No dashboards data available to export".to_string()),
            ..Default::default()
        });
    }

    let selected: Vec<&Dashboard> = match name {
        Some(name) => collection.iter().filter(|d| d.name == name).take(1).collect(),
        None => collection.iter().collect(),
    };

    let mut report = ExportReport::default();
    for dashboard in selected {
        let file = dir.join(format!("{}_dashboard.json", dashboard.name));
        tokio::fs::write(&file, dashboard.to_pretty_json()?)
            .await
            .map_err(|e| Error::StdError(StdError::IoError(e)))?;
        info!("Exported dashboard '{}' to '{}'", dashboard.name, file.display());
        report.files.push(file);
    }

    if report.files.is_empty() {
        if let Some(name) = name {
            report.message = Some(format!("Dashboard '{}' not found", name));
        }
    }
    Ok(report)
}

pub async fn import_dashboard<A: Api + ?Sized>(
    api: &A,
    cluster: &ClusterRef,
    request: ImportRequest,
) -> Result<Outcome<Vec<String>>> {
    let mut collection = fetch_dashboards(api, cluster).await?;
    let before = collection.names();

    if let Some(name) = &request.name {
        if *name != request.dashboard.name {
            return Ok(Outcome::unchanged(before)
                .with_message(format!("Dashboard '{}' not found in the import file", name)));
        }
    }

    let dashboard_name = request.dashboard.name.clone();
    let index = collection.import(request.dashboard, request.position, request.overwrite)?;
    info!("Inserting dashboard '{}' at position {}", dashboard_name, index + 1);
    push_dashboards(api, cluster, &collection).await?;

    Ok(Outcome {
        changed: true,
        before,
        after: collection.names(),
        message: Some(format!("Imported dashboard '{}' at position {}", dashboard_name, index + 1)),
    })
}

/// Removes every dashboard with this name and writes the rest back.
pub async fn delete_dashboard<A: Api + ?Sized>(
    api: &A,
    cluster: &ClusterRef,
    name: Option<&str>,
) -> Result<Outcome<Vec<String>>> {
    let mut collection = fetch_dashboards(api, cluster).await?;
    let before = collection.names();

    if collection.is_empty() {
        return Ok(Outcome::unchanged(before).with_message("No dashboards data available to delete"));
    }
    let Some(name) = name.filter(|n| !n.is_empty()) else {
        return Ok(Outcome::unchanged(before).with_message("No dashboard name provided to delete"));
    };

    let removed = collection.remove_named(name);
    if removed == 0 {
        return Ok(Outcome::unchanged(before).with_message(format!("Dashboard '{}' not found", name)));
    }

    push_dashboards(api, cluster, &collection).await?;
    info!("Deleted {} dashboard(s) named '{}'", removed, name);

    Ok(Outcome {
        changed: true,
        before,
        after: collection.names(),
        message: Some(format!("Deleted dashboard '{}'", name)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FakeApi;
    use assert_json_diff::assert_json_eq;
    use pretty_assertions::assert_eq;
    use reqwest::Method;

    fn dashboard(name: &str) -> Dashboard {
        serde_json::from_value(json!({"name": name, "panels": [{"title": format!("{name} panel")}]})).unwrap()
    }

    fn collection(names: &[&str]) -> DashboardCollection {
        DashboardCollection::new(names.iter().map(|n| dashboard(n)).collect())
    }

    fn cluster() -> ClusterRef {
        ClusterRef::new("acme", "prod")
    }

    fn remote(names: &[&str]) -> Value {
        collection(names).to_payload("cassandra")
    }

    #[test]
    fn insertion_index_positions() {
        assert_eq!(insertion_index(5, Some(1), None), 0);
        assert_eq!(insertion_index(5, Some(5), None), 4);
        assert_eq!(insertion_index(5, Some(6), None), 0);
        assert_eq!(insertion_index(5, Some(0), None), 5);
        assert_eq!(insertion_index(5, Some(-1), None), 5);
        assert_eq!(insertion_index(5, Some(-2), None), 4);
        assert_eq!(insertion_index(5, Some(-10), None), 0);
        assert_eq!(insertion_index(5, None, None), 5);
        assert_eq!(insertion_index(5, None, Some(2)), 2);
    }

    #[test]
    fn insertion_index_into_empty_list() {
        assert_eq!(insertion_index(0, Some(3), None), 0);
        assert_eq!(insertion_index(0, Some(0), None), 0);
        assert_eq!(insertion_index(0, None, None), 0);
    }

    #[test]
    fn insert_at_clamps() {
        let mut dashboards = collection(&["a", "b"]);
        assert_eq!(dashboards.insert_at(10, dashboard("c")), 2);
        assert_eq!(dashboards.names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn import_conflict_leaves_collection_untouched() {
        let mut dashboards = collection(&["a", "X", "b"]);
        let err = dashboards.import(dashboard("X"), None, false).unwrap_err();
        assert!(matches!(err, Error::StdError(StdError::ConflictError(ref name)) if name == "X"));
        assert_eq!(dashboards, collection(&["a", "X", "b"]));
    }

    #[test]
    fn overwrite_keeps_old_slot() {
        let mut dashboards = collection(&["a", "X", "b"]);
        let mut replacement = dashboard("X");
        replacement.body.insert("version".to_string(), json!(2));

        assert_eq!(dashboards.import(replacement.clone(), None, true).unwrap(), 1);
        assert_eq!(dashboards.names(), vec!["a", "X", "b"]);
        assert_eq!(dashboards.iter().nth(1), Some(&replacement));
    }

    #[test]
    fn overwrite_only_replaces_first_duplicate() {
        let mut dashboards = collection(&["X", "a", "X"]);
        dashboards.import(dashboard("X"), Some(-1), true).unwrap();
        assert_eq!(dashboards.names(), vec!["a", "X", "X"]);
    }

    #[test]
    fn body_round_trips_unknown_fields() {
        let raw = json!({"name": "n", "filters": {"dc": "dc1"}, "panels": []});
        let parsed: Dashboard = serde_json::from_value(raw.clone()).unwrap();
        assert_json_eq!(serde_json::to_value(&parsed).unwrap(), raw);
    }

    #[test]
    fn missing_dashboard_list_is_empty() {
        assert!(DashboardCollection::from_response(Value::Null).unwrap().is_empty());
        assert!(DashboardCollection::from_response(json!({"type": "cassandra", "dashboards": null}))
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn list_reports_names_in_order() {
        let api = FakeApi::new().reply(Method::GET, cluster().dashboards_path(), remote(&["b", "a", "c"]));
        let outcome = list_dashboards(&api, &cluster()).await.unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.after, vec!["b", "a", "c"]);
        assert!(outcome.message.is_none());
        assert!(api.mutations().is_empty());
    }

    #[tokio::test]
    async fn list_empty_collection() {
        let api = FakeApi::new();
        let outcome = list_dashboards(&api, &cluster()).await.unwrap();
        assert!(outcome.after.is_empty());
        assert_eq!(outcome.message.as_deref(), Some("No dashboards found"));
    }

    #[tokio::test]
    async fn import_pushes_full_collection() {
        let remote_list = remote(&["a", "b", "c", "d", "e"]);
        let api = FakeApi::new().reply(Method::GET, cluster().dashboards_path(), remote_list);
        let request = ImportRequest {
            dashboard: dashboard("new"),
            position: Some(1),
            ..Default::default()
        };

        let outcome = import_dashboard(&api, &cluster(), request).await.unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.after, vec!["new", "a", "b", "c", "d", "e"]);

        let puts = api.calls_with(Method::PUT);
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].path, "/api/v1/dashboardtemplate/acme/cassandra/prod?dashver=2.0");
        assert_json_eq!(
            puts[0].body.clone().unwrap(),
            remote(&["new", "a", "b", "c", "d", "e"])
        );
    }

    #[tokio::test]
    async fn import_conflict_issues_no_write() {
        let api = FakeApi::new().reply(Method::GET, cluster().dashboards_path(), remote(&["X"]));
        let request = ImportRequest {
            dashboard: dashboard("X"),
            ..Default::default()
        };
        let err = import_dashboard(&api, &cluster(), request).await.unwrap_err();
        assert!(matches!(err.std_error(), StdError::ConflictError(_)));
        assert!(api.mutations().is_empty());
    }

    #[tokio::test]
    async fn import_skips_dashboard_with_other_name() {
        let api = FakeApi::new().reply(Method::GET, cluster().dashboards_path(), remote(&["a"]));
        let request = ImportRequest {
            dashboard: dashboard("b"),
            name: Some("c".to_string()),
            ..Default::default()
        };
        let outcome = import_dashboard(&api, &cluster(), request).await.unwrap();
        assert!(!outcome.changed);
        assert!(api.mutations().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_every_match() {
        let api = FakeApi::new().reply(Method::GET, cluster().dashboards_path(), remote(&["X", "a", "X"]));
        let outcome = delete_dashboard(&api, &cluster(), Some("X")).await.unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.after, vec!["a"]);
        assert_json_eq!(api.calls_with(Method::PUT)[0].body.clone().unwrap(), remote(&["a"]));
    }

    #[tokio::test]
    async fn delete_without_match_or_name_is_noop() {
        let api = FakeApi::new().reply(Method::GET, cluster().dashboards_path(), remote(&["a"]));
        assert!(!delete_dashboard(&api, &cluster(), Some("zz")).await.unwrap().changed);
        assert!(!delete_dashboard(&api, &cluster(), None).await.unwrap().changed);
        assert!(api.mutations().is_empty());

        let empty = FakeApi::new();
        let outcome = delete_dashboard(&empty, &cluster(), Some("a")).await.unwrap();
        assert!(!outcome.changed);
        assert!(empty.mutations().is_empty());
    }

    #[tokio::test]
    async fn transport_error_on_write_surfaces() {
        let api = FakeApi::new()
            .reply(Method::GET, cluster().dashboards_path(), remote(&["a"]))
            .fail(Method::PUT, cluster().dashboards_path(), 500);
        let err = delete_dashboard(&api, &cluster(), Some("a")).await.unwrap_err();
        assert!(matches!(err.std_error(), StdError::TransportError { status: 500, .. }));
    }

    #[tokio::test]
    async fn export_writes_one_file_per_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        let api = FakeApi::new().reply(Method::GET, cluster().dashboards_path(), remote(&["a", "b"]));

        let report = export_dashboard(&api, &cluster(), dir.path(), None).await.unwrap();
        assert_eq!(
            report.files,
            vec![dir.path().join("a_dashboard.json"), dir.path().join("b_dashboard.json")]
        );

        let written = std::fs::read_to_string(dir.path().join("a_dashboard.json")).unwrap();
        assert!(written.starts_with("{\n    \""));
        let parsed: Dashboard = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, dashboard("a"));
    }

    #[tokio::test]
    async fn export_single_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let api = FakeApi::new().reply(Method::GET, cluster().dashboards_path(), remote(&["a", "b"]));
        let report = export_dashboard(&api, &cluster(), dir.path(), Some("b")).await.unwrap();
        assert_eq!(report.files, vec![dir.path().join("b_dashboard.json")]);

        let empty = FakeApi::new();
        let report = export_dashboard(&empty, &cluster(), dir.path(), None).await.unwrap();
        assert!(report.files.is_empty());
        assert!(report.message.is_some());
    }

    #[tokio::test]
    async fn load_reads_dashboard_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.json");
        std::fs::write(&path, r#"{"name": "x", "panels": []}"#).unwrap();
        let loaded = Dashboard::load(&path).await.unwrap();
        assert_eq!(loaded.name, "x");

        let missing = Dashboard::load(&dir.path().join("missing.json")).await.unwrap_err();
        assert!(matches!(missing.std_error(), StdError::IoError(_)));
    }
}
