pub mod client;
pub mod controllers;
pub mod settings;
pub mod util;

pub use client::{Api, AxonOpsClient, ClientConfig, ClusterRef, Credential};
pub use reqwest::Method;
pub use util::errors::{Error, Result, StdError};

#[cfg(test)]
pub mod fixtures;
