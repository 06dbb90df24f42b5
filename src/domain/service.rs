//! Service identity, runtime state and the unit descriptor payload.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::config::ServiceConfig;

/// Search path handed to the agent process.
const SERVICE_PATH_ENV: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// All filesystem locations of one deployment, derived from the service name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
    /// Service name.
    pub name: String,
    /// Service root (`<install_base>/<name>`).
    pub root: PathBuf,
    /// Directory the agent writes its artifacts to.
    pub data_dir: PathBuf,
    /// Unit descriptor file.
    pub unit_path: PathBuf,
    /// Staged executable.
    pub executable: PathBuf,
    /// Staged reference copy of the agent source.
    pub reference: PathBuf,
    /// Log file the agent writes into its working directory.
    pub agent_log: PathBuf,
}

impl ServiceDescriptor {
    /// Derive every path from the service configuration.
    #[must_use]
    pub fn from_config(config: &ServiceConfig) -> Self {
        let root = config.install_base.join(&config.name);

        Self {
            name: config.name.clone(),
            data_dir: root.join(&config.data_dir_name),
            unit_path: config.unit_dir.join(format!("{}.service", config.name)),
            executable: root.join(config.executable_name()),
            reference: root.join(&config.reference_name),
            agent_log: root.join(&config.agent_log_name),
            root,
        }
    }

    /// Unit name as known to the service manager.
    #[must_use]
    pub fn unit_name(&self) -> String {
        format!("{}.service", self.name)
    }

    /// Directory holding the unit descriptor.
    #[must_use]
    pub fn unit_dir(&self) -> &Path {
        self.unit_path.parent().unwrap_or_else(|| Path::new("/"))
    }
}

/// Live status of the managed process, always queried, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuntimeState {
    /// The service manager does not know the unit.
    NotInstalled,
    /// Loaded but not running.
    Inactive,
    /// Running.
    Active,
    /// Last run ended in failure, possibly with a restart pending.
    Failed,
}

impl RuntimeState {
    /// Whether the process is running.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether a stop is needed to halt the process or a pending restart.
    #[must_use]
    pub const fn needs_stop(self) -> bool {
        matches!(self, Self::Active | Self::Failed)
    }
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotInstalled => "not-installed",
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Restart policy declared in the unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Fixed delay between restarts.
    pub delay_secs: u64,
    /// Rolling window for start-rate limiting.
    pub limit_interval_secs: u64,
    /// Maximum starts within the window.
    pub limit_burst: u32,
}

/// Declarative description handed to the service manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpec {
    pub description: String,
    pub user: String,
    pub working_directory: PathBuf,
    pub exec_start: PathBuf,
    pub restart: RestartPolicy,
    pub environment: Vec<(String, String)>,
    pub syslog_identifier: String,
    pub read_write_path: PathBuf,
}

impl UnitSpec {
    /// Build the fixed payload for a deployment.
    #[must_use]
    pub fn for_service(descriptor: &ServiceDescriptor, config: &ServiceConfig) -> Self {
        Self {
            description: config.description.clone(),
            user: config.user.clone(),
            working_directory: descriptor.root.clone(),
            exec_start: descriptor.executable.clone(),
            restart: RestartPolicy {
                delay_secs: config.restart_sec,
                limit_interval_secs: config.start_limit_interval_sec,
                limit_burst: config.start_limit_burst,
            },
            environment: vec![
                ("PYTHONUNBUFFERED".into(), "1".into()),
                ("PATH".into(), SERVICE_PATH_ENV.into()),
            ],
            syslog_identifier: descriptor.name.clone(),
            read_write_path: descriptor.root.clone(),
        }
    }

    /// Render the unit file content.
    #[must_use]
    pub fn render(&self) -> String {
        let mut content = String::with_capacity(1024);

        content.push_str("[Unit]\n");
        content.push_str(&format!("Description={}\n", self.description));
        content.push_str("Wants=network-online.target\n");
        content.push_str("After=network-online.target\n");
        content.push_str(&format!(
            "StartLimitIntervalSec={}\n",
            self.restart.limit_interval_secs
        ));
        content.push_str(&format!("StartLimitBurst={}\n", self.restart.limit_burst));
        content.push('\n');

        content.push_str("[Service]\n");
        content.push_str("Type=simple\n");
        content.push_str(&format!("User={}\n", self.user));
        content.push_str(&format!(
            "WorkingDirectory={}\n",
            self.working_directory.display()
        ));
        content.push_str(&format!("ExecStart={}\n", self.exec_start.display()));
        content.push_str("ExecReload=/bin/kill -HUP $MAINPID\n");
        content.push_str("Restart=always\n");
        content.push_str(&format!("RestartSec={}\n", self.restart.delay_secs));

        for (key, value) in &self.environment {
            content.push_str(&format!("Environment=\"{key}={value}\"\n"));
        }

        // The agent reads host metrics from all over the filesystem.
        content.push_str("NoNewPrivileges=false\n");
        content.push_str("ProtectSystem=false\n");
        content.push_str("ProtectHome=false\n");
        content.push_str("PrivateTmp=false\n");
        content.push_str(&format!(
            "ReadWritePaths={}\n",
            self.read_write_path.display()
        ));

        content.push_str("StandardOutput=journal\n");
        content.push_str("StandardError=journal\n");
        content.push_str(&format!("SyslogIdentifier={}\n", self.syslog_identifier));
        content.push('\n');

        content.push_str("[Install]\n");
        content.push_str("WantedBy=multi-user.target\n");

        content
    }
}
