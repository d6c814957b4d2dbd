use clap::Args;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{GlueError, Result};
use crate::http::TlsFiles;
use crate::puppetdb::query::DEFAULT_RESOURCE_TYPE;

/// Contents of the optional TOML file. Each table is layered under the
/// command-line/environment values of the matching binary.
#[derive(Deserialize, Default, Debug)]
#[serde(default)]
pub struct FileConfig {
    pub log_dir: Option<PathBuf>,
    pub puppetdb: PartialPuppetDbConfig,
    pub alertmanager: PartialAlertmanagerConfig,
}

impl FileConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let Some(path) = config_path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            warn!(path = ?path, "Config file not found, continuing with flags, environment and defaults.");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            GlueError::Configuration(format!("Failed to read config file at {path:?}: {e}"))
        })?;
        let config: FileConfig = toml::from_str(&contents).map_err(|e| {
            GlueError::Configuration(format!("Failed to parse TOML from config file at {path:?}: {e}"))
        })?;
        info!(path = ?path, "Loaded config file.");
        Ok(config)
    }
}

fn default_puppetdb_server() -> String {
    "puppetdb".to_string()
}

fn default_puppetdb_port() -> u16 {
    8081
}

fn default_ssl_dir() -> PathBuf {
    PathBuf::from("/etc/puppetlabs/puppet/ssl")
}

fn default_monitoring_fact() -> String {
    "monitoring_enabled".to_string()
}

fn default_alertmanager_port() -> u16 {
    9093
}

fn default_created_by() -> String {
    "patching".to_string()
}

fn default_silence_units() -> String {
    "minutes".to_string()
}

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// A zero timeout would fail every request before it is sent.
fn request_timeout(secs: Option<u64>) -> Result<Duration> {
    match secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS) {
        0 => Err(GlueError::Configuration(
            "request_timeout_secs must be at least 1".to_string(),
        )),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn local_certname() -> Result<String> {
    sysinfo::System::host_name().filter(|name| !name.is_empty()).ok_or_else(|| {
        GlueError::Configuration(
            "Could not determine the local host name; set a certname explicitly".to_string(),
        )
    })
}

// Partial config for layering: flags/environment first, then the file.
#[derive(Args, Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct PartialPuppetDbConfig {
    /// PuppetDB host; must match a name in its certificate
    #[arg(long, env = "PUPPETDB_SERVER")]
    pub server: Option<String>,
    #[arg(long, env = "PUPPETDB_PORT")]
    pub port: Option<u16>,
    /// Puppet SSL directory holding certs/ and private_keys/
    #[arg(long, env = "PUPPETDB_SSL_DIR")]
    pub ssl_dir: Option<PathBuf>,
    /// Certificate name to authenticate as (defaults to the local host name)
    #[arg(long, env = "PUPPETDB_CERTNAME")]
    pub certname: Option<String>,
    /// Fact that, when false, excludes a node from monitoring
    #[arg(long, env = "PUPPETDB_MONITORING_FACT")]
    pub monitoring_fact: Option<String>,
    #[arg(long, env = "PUPPETDB_RESOURCE_TYPE")]
    pub resource_type: Option<String>,
    /// Write the scrape config here instead of stdout
    #[arg(long, short, env = "PUPPETDB_SD_OUTPUT")]
    pub output: Option<PathBuf>,
    #[arg(long = "puppetdb-timeout-secs", env = "PUPPETDB_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct PuppetDbConfig {
    pub server: String,
    pub port: u16,
    pub ssl_dir: PathBuf,
    pub certname: String,
    pub monitoring_fact: String,
    pub resource_type: String,
    pub output: Option<PathBuf>,
    pub request_timeout: Duration,
}

impl PuppetDbConfig {
    pub fn resolve(overrides: PartialPuppetDbConfig, file: PartialPuppetDbConfig) -> Result<Self> {
        let certname = match overrides.certname.or(file.certname) {
            Some(name) => name,
            None => local_certname()?,
        };

        Ok(PuppetDbConfig {
            server: overrides.server.or(file.server).unwrap_or_else(default_puppetdb_server),
            port: overrides.port.or(file.port).unwrap_or_else(default_puppetdb_port),
            ssl_dir: overrides.ssl_dir.or(file.ssl_dir).unwrap_or_else(default_ssl_dir),
            certname,
            monitoring_fact: overrides
                .monitoring_fact
                .or(file.monitoring_fact)
                .unwrap_or_else(default_monitoring_fact),
            resource_type: overrides
                .resource_type
                .or(file.resource_type)
                .unwrap_or_else(|| DEFAULT_RESOURCE_TYPE.to_string()),
            output: overrides.output.or(file.output),
            request_timeout: request_timeout(
                overrides.request_timeout_secs.or(file.request_timeout_secs),
            )?,
        })
    }

    pub fn tls_files(&self) -> TlsFiles {
        TlsFiles::from_ssl_dir(&self.ssl_dir, &self.certname)
    }

    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.server, self.port)
    }
}

#[derive(Args, Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct PartialAlertmanagerConfig {
    /// Alertmanager host
    #[arg(long, env = "ALERTMANAGER_SERVER")]
    pub server: Option<String>,
    #[arg(long, env = "ALERTMANAGER_PORT")]
    pub port: Option<u16>,
    /// Marker stored in `createdBy`; removal only touches silences carrying it
    #[arg(long, env = "SILENCE_CREATED_BY")]
    pub created_by: Option<String>,
    #[arg(long = "silence-duration", env = "SILENCE_DURATION")]
    pub silence_duration: Option<i64>,
    /// minutes, hours, days or weeks
    #[arg(long = "silence-units", env = "SILENCE_UNITS")]
    pub silence_units: Option<String>,
    #[arg(long = "alertmanager-timeout-secs", env = "ALERTMANAGER_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AlertmanagerConfig {
    pub server: String,
    pub port: u16,
    pub created_by: String,
    pub silence_duration: Option<i64>,
    pub silence_units: String,
    pub request_timeout: Duration,
}

impl AlertmanagerConfig {
    pub fn resolve(
        overrides: PartialAlertmanagerConfig,
        file: PartialAlertmanagerConfig,
    ) -> Result<Self> {
        Ok(AlertmanagerConfig {
            server: overrides.server.or(file.server).ok_or_else(|| {
                GlueError::Configuration("ALERTMANAGER_SERVER is required".to_string())
            })?,
            port: overrides.port.or(file.port).unwrap_or_else(default_alertmanager_port),
            created_by: overrides.created_by.or(file.created_by).unwrap_or_else(default_created_by),
            silence_duration: overrides.silence_duration.or(file.silence_duration),
            silence_units: overrides
                .silence_units
                .or(file.silence_units)
                .unwrap_or_else(default_silence_units),
            request_timeout: request_timeout(
                overrides.request_timeout_secs.or(file.request_timeout_secs),
            )?,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.server, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_flags_override_file_and_defaults_fill_the_rest() {
        let file = PartialPuppetDbConfig {
            server: Some("pdb.from.file".to_string()),
            port: Some(8443),
            certname: Some("file-cert".to_string()),
            ..Default::default()
        };
        let flags = PartialPuppetDbConfig {
            server: Some("pdb.from.flag".to_string()),
            ..Default::default()
        };

        let config = PuppetDbConfig::resolve(flags, file).unwrap();
        assert_eq!(config.server, "pdb.from.flag");
        assert_eq!(config.port, 8443);
        assert_eq!(config.certname, "file-cert");
        assert_eq!(config.monitoring_fact, "monitoring_enabled");
        assert_eq!(config.resource_type, "Prometheus::Scrape_job");
        assert_eq!(config.ssl_dir, PathBuf::from("/etc/puppetlabs/puppet/ssl"));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.base_url(), "https://pdb.from.flag:8443");
        assert_eq!(
            config.tls_files().client_key,
            PathBuf::from("/etc/puppetlabs/puppet/ssl/private_keys/file-cert.pem")
        );
    }

    #[test]
    fn test_alertmanager_server_is_required() {
        let err = AlertmanagerConfig::resolve(Default::default(), Default::default()).unwrap_err();
        assert!(matches!(err, GlueError::Configuration(_)));
    }

    #[test]
    fn test_alertmanager_defaults() {
        let flags = PartialAlertmanagerConfig {
            server: Some("am01".to_string()),
            ..Default::default()
        };
        let config = AlertmanagerConfig::resolve(flags, Default::default()).unwrap();
        assert_eq!(config.base_url(), "http://am01:9093");
        assert_eq!(config.created_by, "patching");
        assert_eq!(config.silence_units, "minutes");
        assert_eq!(config.silence_duration, None);
    }

    #[test]
    fn test_load_file_with_both_tables() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
log_dir = "/var/log/patching"

[puppetdb]
server = "puppetdb.internal"
monitoring_fact = "prometheus_enabled"

[alertmanager]
server = "alertmanager.internal"
silence_duration = 2
silence_units = "hours"
"#
        )
        .unwrap();

        let config = FileConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/patching")));
        assert_eq!(config.puppetdb.server.as_deref(), Some("puppetdb.internal"));
        assert_eq!(config.puppetdb.monitoring_fact.as_deref(), Some("prometheus_enabled"));
        assert_eq!(config.alertmanager.silence_duration, Some(2));
        assert_eq!(config.alertmanager.silence_units.as_deref(), Some("hours"));
    }

    #[test]
    fn test_invalid_toml_is_a_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[puppetdb\nserver = ").unwrap();

        let err = FileConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, GlueError::Configuration(_)));
    }

    #[test]
    fn test_zero_request_timeout_is_rejected() {
        let flags = PartialPuppetDbConfig {
            certname: Some("prom01".to_string()),
            request_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            PuppetDbConfig::resolve(flags, Default::default()),
            Err(GlueError::Configuration(_))
        ));

        let file = PartialAlertmanagerConfig {
            server: Some("am01".to_string()),
            request_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            AlertmanagerConfig::resolve(Default::default(), file),
            Err(GlueError::Configuration(_))
        ));
    }

    #[derive(Parser, Debug)]
    struct SilenceFlags {
        #[command(flatten)]
        alertmanager: PartialAlertmanagerConfig,
    }

    #[test]
    fn test_env_file_values_reach_flags() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(
            &env_file,
            "ALERTMANAGER_SERVER=am.from.env.file\nSILENCE_CREATED_BY=maintenance\n",
        )
        .unwrap();

        dotenv::from_path(&env_file).unwrap();
        let flags = SilenceFlags::try_parse_from(["alert-silence"]).unwrap();
        let config = AlertmanagerConfig::resolve(flags.alertmanager, Default::default()).unwrap();

        assert_eq!(config.server, "am.from.env.file");
        assert_eq!(config.created_by, "maintenance");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = FileConfig::load(Some(Path::new("/nonexistent/patching.toml"))).unwrap();
        assert!(config.puppetdb.server.is_none());
        assert!(config.log_dir.is_none());
    }
}
