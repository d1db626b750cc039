//! In-memory `Api` used by reconciler tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::client::Api;
use crate::util::errors::{Error, Result, StdError};

#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Replies are queued per method and path. The last queued reply for a route
/// keeps being returned; unknown routes answer `null`.
#[derive(Default)]
pub struct FakeApi {
    replies: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, method: Method, path: impl Into<String>, body: Value) -> Self {
        self.push(method, path.into(), Reply::Json(body));
        self
    }

    pub fn fail(self, method: Method, path: impl Into<String>, status: u16) -> Self {
        self.push(method, path.into(), Reply::Status(status));
        self
    }

    fn push(&self, method: Method, path: String, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry((method, path))
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_with(&self, method: Method) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.method == method).collect()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.method != Method::GET).collect()
    }
}

#[async_trait]
impl Api for FakeApi {
    async fn request(&self, path: &str, method: Method, body: Option<&Value>) -> Result<Value> {
        self.calls.lock().unwrap().push(Call {
            method: method.clone(),
            path: path.to_string(),
            body: body.cloned(),
        });

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(&(method, path.to_string())) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Status(status)) => Err(Error::StdError(StdError::TransportError {
                url: path.to_string(),
                status,
            })),
            None => Ok(Value::Null),
        }
    }
}
