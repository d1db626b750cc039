use std::path::PathBuf;
use std::time::Duration;

use axonops_reconciler::client::http::DEFAULT_TIMEOUT;
use axonops_reconciler::settings::{parse_flag, split_list, AdaptiveRepairRequest, ScheduledRepairRequest};
use axonops_reconciler::{ClientConfig, ClusterRef, Credential, Error, Result, StdError};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "axonops", about = "Manage AxonOps repairs and dashboards")]
#[command(version)]
pub struct Cli {
    /// Name of your organisation
    #[arg(long, env = "AXONOPS_ORG")]
    pub org: Option<String>,

    /// Name of your cluster
    #[arg(long, env = "AXONOPS_CLUSTER")]
    pub cluster: Option<String>,

    /// Cluster type, e.g. cassandra or dse
    #[arg(long = "cluster-type", env = "AXONOPS_CLUSTER_TYPE", default_value = "cassandra")]
    pub cluster_type: String,

    /// API token used to authenticate with AxonOps SaaS
    #[arg(long, env = "AXONOPS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Username for AxonOps Self-Hosted when authentication is enabled
    #[arg(long, env = "AXONOPS_USERNAME")]
    pub username: Option<String>,

    /// Password for AxonOps Self-Hosted when authentication is enabled
    #[arg(long, env = "AXONOPS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// AxonOps URL when not using AxonOps Cloud
    #[arg(long, env = "AXONOPS_URL")]
    pub url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "AXONOPS_TIMEOUT", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Verbosity, repeat for more
    #[arg(short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Result format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the Adaptive Repair
    #[command(visible_alias = "adaptiverepair")]
    Repair(RepairArgs),

    /// Manage Scheduled Repairs
    #[command(name = "scheduledrepair")]
    ScheduledRepair(ScheduledRepairArgs),

    /// Manage dashboards
    Dashboard(DashboardArgs),
}

impl Cli {
    /// Org and cluster are mandatory for every command.
    pub fn cluster_ref(&self) -> Result<ClusterRef> {
        match (self.org.as_deref(), self.cluster.as_deref()) {
            (Some(org), Some(cluster)) if !org.is_empty() && !cluster.is_empty() => {
                Ok(ClusterRef::new(org, cluster).with_cluster_type(self.cluster_type.clone()))
            }
            _ => Err(validation("The org and the cluster are mandatory")),
        }
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        let credential = match (&self.token, &self.username, &self.password) {
            (Some(token), _, _) if !token.is_empty() => Credential::ApiToken(token.clone()),
            (_, Some(username), Some(password)) => Credential::Login {
                username: username.clone(),
                password: password.clone(),
            },
            (_, Some(_), None) => return Err(validation("--username requires --password")),
            _ => Credential::Anonymous,
        };

        let mut config = ClientConfig::new(self.org.clone().unwrap_or_default())
            .with_credential(credential)
            .with_timeout(Duration::from_secs(self.timeout));
        if let Some(url) = &self.url {
            config = config.with_base_url(url.clone());
        }
        Ok(config)
    }
}

#[derive(Args, Debug, Default)]
pub struct RepairArgs {
    /// Enable the Adaptive Repair
    #[arg(long)]
    pub enabled: bool,

    /// Disable the Adaptive Repair
    #[arg(long)]
    pub disabled: bool,

    /// GC grace threshold in seconds
    #[arg(long = "gcgrace")]
    pub gc_grace: Option<i64>,

    /// Concurrent repair processes
    #[arg(long = "tableparallelism")]
    pub table_parallelism: Option<i64>,

    /// Max segments per table
    #[arg(long = "maxsegmentspertable")]
    pub max_segments_per_table: Option<i64>,

    /// Segment retries
    #[arg(long = "segmentretries")]
    pub segment_retries: Option<i64>,

    /// Comma-separated list of tables excluded from the Adaptive Repair
    #[arg(long = "excludedtables")]
    pub excluded_tables: Option<String>,

    /// Exclude TWCS tables from the Adaptive Repair, true or false
    #[arg(long = "excludetwcstables")]
    pub exclude_twcs_tables: Option<String>,

    /// Segment target size in MB
    #[arg(long = "segmenttargetsizemb")]
    pub segment_target_size_mb: Option<i64>,

    /// Segment timeout, an integer followed by one of s, m, h, d, w, M, y
    #[arg(long = "segmenttimeout")]
    pub segment_timeout: Option<String>,

    /// Show the difference without applying it
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

impl RepairArgs {
    pub fn to_request(&self) -> Result<AdaptiveRepairRequest> {
        let active = match (self.enabled, self.disabled) {
            (true, true) => {
                return Err(validation(
                    "The options enabled and disabled are mutually exclusive, \
                     you can't choose both at the same time",
                ))
            }
            (false, false) => {
                return Err(validation("At least one option enabled or disabled should be present"))
            }
            (enabled, _) => enabled,
        };

        let filter_twcs = self
            .exclude_twcs_tables
            .as_deref()
            .map(|value| parse_flag("--excludetwcstables", value))
            .transpose()?;

        Ok(AdaptiveRepairRequest {
            active: Some(active),
            gc_grace: self.gc_grace,
            table_parallelism: self.table_parallelism,
            excluded_tables: self.excluded_tables.as_deref().map(|v| split_list(Some(v))),
            filter_twcs,
            segment_retries: self.segment_retries,
            segment_target_size_mb: self.segment_target_size_mb,
            segment_timeout: self.segment_timeout.clone(),
            max_segments_per_table: self.max_segments_per_table,
        })
    }
}

#[derive(Args, Debug, Default)]
pub struct ScheduledRepairArgs {
    /// Keyspace to repair, all keyspaces when empty
    #[arg(long)]
    pub keyspace: Option<String>,

    /// Comma-separated list of tables in the keyspace, all tables when empty
    #[arg(long)]
    pub tables: Option<String>,

    /// Comma-separated list of tables to exclude
    #[arg(long = "excludedtables")]
    pub excluded_tables: Option<String>,

    /// Comma-separated list of nodes to repair
    #[arg(long)]
    pub nodes: Option<String>,

    /// Number of segments per node
    #[arg(long = "segmentspernode")]
    pub segments_per_node: Option<u32>,

    /// Enable segmented repair
    #[arg(long)]
    pub segmented: bool,

    /// Enable incremental repair
    #[arg(long)]
    pub incremental: bool,

    /// Number of job threads
    #[arg(long = "jobthreads")]
    pub job_threads: Option<u32>,

    /// Cron expression for the schedule
    #[arg(long = "scheduleexpr")]
    pub schedule_expr: Option<String>,

    /// Enable partitioner range repair
    #[arg(long = "partitionerrange")]
    pub partitioner_range: bool,

    /// Parallelism: Sequential, Parallel or DC-Aware
    #[arg(long)]
    pub parallelism: Option<String>,

    /// Enable stream optimisation (Cassandra 4.1 and above)
    #[arg(long = "optimisestreams")]
    pub optimise_streams: bool,

    /// Comma-separated list of datacenters, all when empty
    #[arg(long)]
    pub datacenters: Option<String>,

    /// Tag identifying the repair job
    #[arg(long = "tags")]
    pub tag: Option<String>,

    /// Delete the scheduled repairs with this tag instead of adding one
    #[arg(long)]
    pub delete: bool,

    /// Delete all scheduled repairs
    #[arg(long = "deleteall")]
    pub delete_all: bool,

    /// Run only Paxos repairs
    #[arg(long = "paxosonly")]
    pub paxos_only: bool,

    /// Skip Paxos repairs
    #[arg(long = "skippaxos")]
    pub skip_paxos: bool,

    /// Show the planned calls without applying them
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

impl ScheduledRepairArgs {
    pub fn to_request(&self) -> Result<ScheduledRepairRequest> {
        let request = ScheduledRepairRequest {
            keyspace: self.keyspace.clone(),
            tables: self.tables.clone(),
            excluded_tables: self.excluded_tables.clone(),
            nodes: self.nodes.clone(),
            datacenters: self.datacenters.clone(),
            segments_per_node: self.segments_per_node,
            job_threads: self.job_threads,
            schedule_expr: self.schedule_expr.clone(),
            parallelism: self.parallelism.clone(),
            tag: self.tag.clone(),
            segmented: self.segmented,
            incremental: self.incremental,
            primary_range: self.partitioner_range,
            optimise_streams: self.optimise_streams,
            skip_paxos: self.skip_paxos,
            paxos_only: self.paxos_only,
            delete_only: self.delete,
        };
        request.validate()?;
        Ok(request)
    }
}

#[derive(Args, Debug, Default)]
pub struct DashboardArgs {
    /// List all dashboards of the cluster
    #[arg(long)]
    pub list: bool,

    /// Directory to export dashboards to as JSON files
    #[arg(long = "exportpath", conflicts_with = "import_file")]
    pub export_path: Option<PathBuf>,

    /// JSON file to import a dashboard from
    #[arg(long = "importfile")]
    pub import_file: Option<PathBuf>,

    /// Name of the dashboard to export or import
    #[arg(long = "dashboardname")]
    pub dashboard_name: Option<String>,

    /// Delete the named dashboard
    #[arg(long = "deletedashboard")]
    pub delete_dashboard: Option<String>,

    /// 1-based position of the imported dashboard; zero or negative counts from the end
    #[arg(long, allow_negative_numbers = true)]
    pub position: Option<i64>,

    /// Replace an existing dashboard with the same name
    #[arg(long)]
    pub overwrite: bool,
}

fn validation(message: &str) -> Error {
    Error::StdError(StdError::ValidationError(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["axonops", "--org", "acme", "--cluster", "prod"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn tables_without_keyspace_rejected() {
        let cli = parse(&["scheduledrepair", "--tables", "t1"]);
        let Command::ScheduledRepair(args) = cli.command else {
            panic!("expected scheduledrepair");
        };
        assert!(args.to_request().is_err());
    }

    #[test]
    fn excluded_tables_without_keyspace_rejected() {
        let cli = parse(&["scheduledrepair", "--excludedtables", "t1"]);
        let Command::ScheduledRepair(args) = cli.command else {
            panic!("expected scheduledrepair");
        };
        assert!(args.to_request().is_err());
    }

    #[test]
    fn both_paxos_flags_rejected() {
        let cli = parse(&["scheduledrepair", "--paxosonly", "--skippaxos"]);
        let Command::ScheduledRepair(args) = cli.command else {
            panic!("expected scheduledrepair");
        };
        assert!(matches!(
            args.to_request(),
            Err(Error::StdError(StdError::ValidationError(_)))
        ));
    }

    #[test]
    fn delete_all_still_validates_other_flags() {
        for flags in [
            &["scheduledrepair", "--deleteall", "--paxosonly", "--skippaxos"][..],
            &["scheduledrepair", "--deleteall", "--tables", "t1"][..],
        ] {
            let Command::ScheduledRepair(args) = parse(flags).command else {
                panic!("expected scheduledrepair");
            };
            assert!(args.delete_all);
            assert!(matches!(
                args.to_request(),
                Err(Error::StdError(StdError::ValidationError(_)))
            ));
        }

        let Command::ScheduledRepair(args) = parse(&["scheduledrepair", "--deleteall"]).command else {
            panic!("expected scheduledrepair");
        };
        assert!(args.to_request().is_ok());
    }

    #[test]
    fn timeout_reaches_client_config() {
        let cli = parse(&["dashboard", "--list"]);
        assert_eq!(cli.client_config().unwrap().timeout, DEFAULT_TIMEOUT);

        let cli = parse(&["--timeout", "5", "dashboard", "--list"]);
        assert_eq!(cli.client_config().unwrap().timeout, Duration::from_secs(5));
    }

    #[test]
    fn repair_requires_exactly_one_state() {
        let both = RepairArgs {
            enabled: true,
            disabled: true,
            ..Default::default()
        };
        assert!(both.to_request().is_err());
        assert!(RepairArgs::default().to_request().is_err());

        let disabled = RepairArgs {
            disabled: true,
            excluded_tables: Some("ks.a,ks.b".to_string()),
            exclude_twcs_tables: Some("false".to_string()),
            ..Default::default()
        };
        let request = disabled.to_request().unwrap();
        assert_eq!(request.active, Some(false));
        assert_eq!(request.filter_twcs, Some(false));
        assert_eq!(request.excluded_tables, Some(vec!["ks.a".to_string(), "ks.b".to_string()]));
    }

    #[test]
    fn adaptive_repair_alias() {
        let cli = parse(&["adaptiverepair", "--enabled", "--gcgrace", "3600"]);
        let Command::Repair(args) = cli.command else {
            panic!("expected repair");
        };
        assert_eq!(args.gc_grace, Some(3600));
    }

    #[test]
    fn negative_position_parses() {
        let cli = parse(&["dashboard", "--importfile", "d.json", "--position", "-1"]);
        let Command::Dashboard(args) = cli.command else {
            panic!("expected dashboard");
        };
        assert_eq!(args.position, Some(-1));
    }

    #[test]
    fn export_and_import_conflict() {
        let argv = [
            "axonops",
            "--org",
            "a",
            "--cluster",
            "c",
            "dashboard",
            "--exportpath",
            ".",
            "--importfile",
            "x.json",
        ];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn credentials() {
        let cli = parse(&["--token", "t", "dashboard", "--list"]);
        assert_eq!(cli.client_config().unwrap().credential, Credential::ApiToken("t".to_string()));

        let cli = parse(&["--username", "u", "--password", "p", "dashboard", "--list"]);
        assert!(matches!(cli.client_config().unwrap().credential, Credential::Login { .. }));

        let cli = parse(&["--username", "u", "dashboard", "--list"]);
        assert!(cli.client_config().is_err());
    }

    #[test]
    fn org_and_cluster_are_mandatory() {
        let cli = Cli::try_parse_from(["axonops", "--org", "", "dashboard", "--list"]).unwrap();
        assert!(cli.cluster_ref().is_err());

        let cli = parse(&["--cluster-type", "dse", "dashboard", "--list"]);
        assert_eq!(cli.cluster_ref().unwrap().cluster_type, "dse");
    }
}
