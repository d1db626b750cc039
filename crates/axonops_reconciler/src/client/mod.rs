pub mod http;

pub use http::{AxonOpsClient, ClientConfig, Credential};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::util::errors::Result;

pub const DEFAULT_CLUSTER_TYPE: &str = "cassandra";

/// Authenticated access to the AxonOps API.
///
/// Every call takes a path relative to the dashboard URL and returns the
/// decoded JSON body, or `Value::Null` when the body is empty. Reconcilers
/// only ever talk to this trait.
#[async_trait]
pub trait Api: Send + Sync {
    async fn request(&self, path: &str, method: Method, body: Option<&Value>) -> Result<Value>;

    async fn get(&self, path: &str) -> Result<Value> {
        self.request(path, Method::GET, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(path, Method::POST, Some(body)).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(path, Method::PUT, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        self.request(path, Method::DELETE, None).await
    }
}

/// Identifies the remote namespace a single invocation works against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRef {
    pub org: String,
    pub cluster: String,
    pub cluster_type: String,
}

impl ClusterRef {
    pub fn new(org: impl Into<String>, cluster: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            cluster: cluster.into(),
            cluster_type: DEFAULT_CLUSTER_TYPE.to_string(),
        }
    }

    pub fn with_cluster_type(mut self, cluster_type: impl Into<String>) -> Self {
        self.cluster_type = cluster_type.into();
        self
    }

    fn scoped(&self, resource: &str) -> String {
        format!(
            "/api/v1/{}/{}/{}/{}",
            resource, self.org, self.cluster_type, self.cluster
        )
    }

    pub fn dashboards_path(&self) -> String {
        format!("{}?dashver=2.0", self.scoped("dashboardtemplate"))
    }

    pub fn adaptive_repair_path(&self) -> String {
        self.scoped("adaptiveRepair")
    }

    pub fn scheduled_repairs_path(&self) -> String {
        self.scoped("repair")
    }

    pub fn add_repair_path(&self) -> String {
        self.scoped("addrepair")
    }

    pub fn delete_repair_path(&self, id: &str) -> String {
        format!("{}?id={}", self.scoped("cassandrascheduledrepair"), id)
    }
}
