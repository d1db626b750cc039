//! Turns caller-supplied options into canonical remote settings.
//!
//! Defaults are applied only to absent values. A present but empty string or
//! list is kept as given.

use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::controllers::adaptive_repair::AdaptiveRepairSettings;
use crate::controllers::scheduled_repair::ScheduledRepairJob;
use crate::util::errors::{Error, Result, StdError};

pub const DEFAULT_SCHEDULE_EXPR: &str = "0 * * 1 *";
pub const SEGMENT_TIMEOUT_UNITS: &[char] = &['s', 'm', 'h', 'd', 'w', 'M', 'y'];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Parallelism {
    Sequential,
    #[default]
    Parallel,
    #[serde(rename = "DC-Aware")]
    DcAware,
}

impl Parallelism {
    pub const ALL: [Parallelism; 3] = [Parallelism::Sequential, Parallelism::Parallel, Parallelism::DcAware];

    pub fn as_str(&self) -> &'static str {
        match self {
            Parallelism::Sequential => "Sequential",
            Parallelism::Parallel => "Parallel",
            Parallelism::DcAware => "DC-Aware",
        }
    }
}

impl std::fmt::Display for Parallelism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Parallelism {
    type Err = Error;

    /// Matches on the lowercase alphanumeric form, so `dc aware`, `dc_aware`
    /// and `DC-Aware` are the same value.
    fn from_str(value: &str) -> Result<Self> {
        let wanted = alphanumeric_lowercase(value);
        Parallelism::ALL
            .into_iter()
            .find(|choice| alphanumeric_lowercase(choice.as_str()) == wanted)
            .ok_or_else(|| {
                Error::StdError(StdError::InvalidEnumValue {
                    field: "parallelism",
                    value: value.to_string(),
                    choices: Parallelism::ALL.iter().map(Parallelism::as_str).collect(),
                })
            })
    }
}

fn alphanumeric_lowercase(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Paxos handling for a scheduled repair.
///
/// Serializes as the three wire fields `paxos`, `skipPaxos` and `paxosOnly`
/// so it can be flattened into the job payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaxosMode {
    #[default]
    Default,
    SkipPaxos,
    PaxosOnly,
}

impl PaxosMode {
    pub fn from_flags(skip_paxos: bool, paxos_only: bool) -> Result<Self> {
        match (skip_paxos, paxos_only) {
            (true, true) => Err(Error::StdError(StdError::ValidationError(
                "skip-paxos and paxos-only are mutually exclusive".to_string(),
            ))),
            (true, false) => Ok(PaxosMode::SkipPaxos),
            (false, true) => Ok(PaxosMode::PaxosOnly),
            (false, false) => Ok(PaxosMode::Default),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaxosMode::Default => "Default",
            PaxosMode::SkipPaxos => "Skip Paxos",
            PaxosMode::PaxosOnly => "Paxos Only",
        }
    }
}

impl Serialize for PaxosMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("paxos", self.label())?;
        map.serialize_entry("skipPaxos", &(*self == PaxosMode::SkipPaxos))?;
        map.serialize_entry("paxosOnly", &(*self == PaxosMode::PaxosOnly))?;
        map.end()
    }
}

/// Splits a comma-separated option. Entries are not trimmed.
pub fn split_list(value: Option<&str>) -> Vec<String> {
    match value {
        Some(value) if !value.is_empty() => value.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

pub fn parse_flag(field: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(Error::StdError(StdError::ValidationError(format!(
            "{} expects true or false, got '{}'",
            field, value
        )))),
    }
}

/// Accepts an integer followed by a single unit, e.g. `30m` or `2h`.
pub fn validate_segment_timeout(value: &str) -> Result<()> {
    let invalid = || {
        Error::StdError(StdError::ValidationError(format!(
            "segment timeout '{}' must be an integer followed by one of {}",
            value,
            SEGMENT_TIMEOUT_UNITS
                .iter()
                .map(char::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        )))
    };

    let mut chars = value.chars();
    let unit = chars.next_back().ok_or_else(invalid)?;
    let amount = chars.as_str();
    if !SEGMENT_TIMEOUT_UNITS.contains(&unit)
        || amount.is_empty()
        || !amount.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    Ok(())
}

/// Raw adaptive repair options as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdaptiveRepairRequest {
    pub active: Option<bool>,
    pub gc_grace: Option<i64>,
    pub table_parallelism: Option<i64>,
    pub excluded_tables: Option<Vec<String>>,
    pub filter_twcs: Option<bool>,
    pub segment_retries: Option<i64>,
    pub segment_target_size_mb: Option<i64>,
    pub segment_timeout: Option<String>,
    pub max_segments_per_table: Option<i64>,
}

impl AdaptiveRepairRequest {
    pub fn normalize(&self) -> Result<AdaptiveRepairSettings> {
        let defaults = AdaptiveRepairSettings::default();
        if let Some(timeout) = &self.segment_timeout {
            validate_segment_timeout(timeout)?;
        }

        Ok(AdaptiveRepairSettings {
            active: self.active.unwrap_or(defaults.active),
            excluded_tables: self.excluded_tables.clone().unwrap_or(defaults.excluded_tables),
            filter_twcs: self.filter_twcs.unwrap_or(defaults.filter_twcs),
            gc_grace: self.gc_grace.unwrap_or(defaults.gc_grace),
            max_segments_per_table: self
                .max_segments_per_table
                .unwrap_or(defaults.max_segments_per_table),
            segment_retries: self.segment_retries.unwrap_or(defaults.segment_retries),
            segment_target_size_mb: self
                .segment_target_size_mb
                .unwrap_or(defaults.segment_target_size_mb),
            segment_timeout: self.segment_timeout.clone().unwrap_or(defaults.segment_timeout),
            table_parallelism: self.table_parallelism.unwrap_or(defaults.table_parallelism),
        })
    }
}

/// Raw scheduled repair options as supplied by the caller.
///
/// List options are kept as the comma-separated text they arrive as.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduledRepairRequest {
    pub keyspace: Option<String>,
    pub tables: Option<String>,
    pub excluded_tables: Option<String>,
    pub nodes: Option<String>,
    pub datacenters: Option<String>,
    pub segments_per_node: Option<u32>,
    pub job_threads: Option<u32>,
    pub schedule_expr: Option<String>,
    pub parallelism: Option<String>,
    pub tag: Option<String>,
    pub segmented: bool,
    pub incremental: bool,
    pub primary_range: bool,
    pub optimise_streams: bool,
    pub skip_paxos: bool,
    pub paxos_only: bool,
    pub delete_only: bool,
}

impl ScheduledRepairRequest {
    /// Rejects option combinations that need a companion option.
    pub fn validate(&self) -> Result<()> {
        let has_keyspace = is_set(&self.keyspace);
        if is_set(&self.tables) && !has_keyspace {
            return Err(validation("--tables requires --keyspace"));
        }
        if is_set(&self.excluded_tables) && !has_keyspace {
            return Err(validation("--excludedtables requires --keyspace"));
        }
        if self.delete_only && !is_set(&self.tag) {
            return Err(validation("--delete requires --tags"));
        }
        PaxosMode::from_flags(self.skip_paxos, self.paxos_only).map(|_| ())
    }

    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or_default()
    }

    pub fn normalize(&self) -> Result<ScheduledRepairJob> {
        self.validate()?;

        let parallelism = match &self.parallelism {
            Some(value) => value.parse()?,
            None => Parallelism::default(),
        };

        // An explicit expression enables the schedule; without one a monthly
        // placeholder is recorded and scheduling stays off.
        let (schedule, schedule_expr) = match self.schedule_expr.as_deref() {
            Some(expr) if !expr.is_empty() => (true, expr.to_string()),
            _ => (false, DEFAULT_SCHEDULE_EXPR.to_string()),
        };

        Ok(ScheduledRepairJob {
            keyspace: self.keyspace.clone().unwrap_or_default(),
            tables: split_list(self.tables.as_deref()),
            excluded_tables: split_list(self.excluded_tables.as_deref()),
            nodes: split_list(self.nodes.as_deref()),
            segments_per_node: self.segments_per_node.unwrap_or(1),
            segmented: self.segmented,
            incremental: self.incremental,
            job_threads: self.job_threads.unwrap_or(1),
            schedule,
            schedule_expr,
            primary_range: self.primary_range,
            parallelism,
            optimise_streams: self.optimise_streams,
            datacenters: split_list(self.datacenters.as_deref()),
            tag: self.tag().to_string(),
            paxos: PaxosMode::from_flags(self.skip_paxos, self.paxos_only)?,
        })
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

fn validation(message: &str) -> Error {
    Error::StdError(StdError::ValidationError(message.to_string()))
}
