// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Executor settings as read from a TOML file.
///
/// ```toml
/// [install]
/// dir = "/opt/device-client"
/// executable = "device-client"
/// staging_dir = "/opt/device-client/staging"
///
/// [service]
/// name = "device-client"
///
/// [health]
/// command = "device-client-cli"
/// settle_secs = 5
///
/// [poll]
/// start_attempts = 10
/// stop_attempts = 10
/// interval_ms = 1000
///
/// [report]
/// config_candidates = ["/etc/device-client/config.json"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSettings {
    #[serde(default)]
    pub install: InstallSection,

    #[serde(default)]
    pub service: ServiceSection,

    #[serde(default)]
    pub health: HealthSection,

    #[serde(default)]
    pub poll: PollSection,

    #[serde(default)]
    pub report: ReportSection,
}

/// `[install]` section: where the live executable and its siblings live.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallSection {
    #[serde(default = "default_install_dir")]
    pub dir: PathBuf,

    /// File name of the live executable inside `dir`.
    #[serde(default = "default_executable")]
    pub executable: String,

    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Defaults to `<dir>/backup`.
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,
}

fn default_install_dir() -> PathBuf {
    PathBuf::from("/opt/device-client")
}

fn default_executable() -> String {
    "device-client".to_string()
}

fn default_staging_dir() -> PathBuf {
    default_install_dir().join("staging")
}

impl Default for InstallSection {
    fn default() -> Self {
        Self {
            dir: default_install_dir(),
            executable: default_executable(),
            staging_dir: default_staging_dir(),
            backup_dir: None,
        }
    }
}

/// `[service]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSection {
    /// Unit name probed to decide between service and free-process mode.
    #[serde(default = "default_service_name")]
    pub name: String,
}

fn default_service_name() -> String {
    "device-client".to_string()
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: default_service_name(),
        }
    }
}

/// `[health]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthSection {
    #[serde(default = "default_health_command")]
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Delay between "running" and the health probe.
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,

    #[serde(default = "default_health_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_health_command() -> String {
    "device-client-cli".to_string()
}

fn default_settle_secs() -> u64 {
    5
}

fn default_health_timeout_secs() -> u64 {
    30
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            command: default_health_command(),
            args: Vec::new(),
            settle_secs: default_settle_secs(),
            timeout_secs: default_health_timeout_secs(),
        }
    }
}

/// `[poll]` section: bounds for the wait-until-running / wait-until-stopped loops.
#[derive(Debug, Clone, Deserialize)]
pub struct PollSection {
    #[serde(default = "default_attempts")]
    pub start_attempts: u32,

    #[serde(default = "default_attempts")]
    pub stop_attempts: u32,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_attempts() -> u32 {
    10
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            start_attempts: default_attempts(),
            stop_attempts: default_attempts(),
            interval_ms: default_interval_ms(),
        }
    }
}

/// `[report]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSection {
    /// Ordered list of device config locations; the first existing one wins.
    #[serde(default = "default_config_candidates")]
    pub config_candidates: Vec<PathBuf>,

    #[serde(default = "default_report_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_config_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from("/etc/device-client/config.json")];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("device-client").join("config.json"));
    }
    candidates.push(PathBuf::from("config.json"));
    candidates
}

fn default_report_timeout_secs() -> u64 {
    10
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            config_candidates: default_config_candidates(),
            timeout_secs: default_report_timeout_secs(),
        }
    }
}

/// Bounded polling policy: at most `attempts` checks, `interval` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }
}

/// Validated settings, resolved once per transaction and passed down.
#[derive(Debug, Clone)]
pub struct Settings {
    pub install_dir: PathBuf,
    pub executable: String,
    pub staging_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub service_name: String,
    pub health_command: String,
    pub health_args: Vec<String>,
    pub settle_delay: Duration,
    pub health_timeout: Duration,
    pub start_poll: PollPolicy,
    pub stop_poll: PollPolicy,
    pub config_candidates: Vec<PathBuf>,
    pub report_timeout: Duration,
}

impl Settings {
    pub(crate) fn new_unchecked(raw: RawSettings) -> Self {
        let interval = Duration::from_millis(raw.poll.interval_ms);
        let backup_dir = raw
            .install
            .backup_dir
            .unwrap_or_else(|| raw.install.dir.join("backup"));
        Self {
            install_dir: raw.install.dir,
            executable: raw.install.executable,
            staging_dir: raw.install.staging_dir,
            backup_dir,
            service_name: raw.service.name,
            health_command: raw.health.command,
            health_args: raw.health.args,
            settle_delay: Duration::from_secs(raw.health.settle_secs),
            health_timeout: Duration::from_secs(raw.health.timeout_secs),
            start_poll: PollPolicy::new(raw.poll.start_attempts, interval),
            stop_poll: PollPolicy::new(raw.poll.stop_attempts, interval),
            config_candidates: raw.report.config_candidates,
            report_timeout: Duration::from_secs(raw.report.timeout_secs),
        }
    }

    /// Full path of the live executable.
    pub fn live_executable(&self) -> PathBuf {
        self.install_dir.join(&self.executable)
    }
}
