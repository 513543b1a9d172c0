//! Router configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// One configured routing channel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelConfig {
    /// Stable id used by commands and persistence
    pub id: String,
    /// Display label, also part of the advertised NDI name
    pub label: String,
    /// Display color
    pub color: String,
}

impl ChannelConfig {
    pub fn new(id: impl Into<String>, label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            color: color.into(),
        }
    }
}

/// Router configuration options
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Prefix of every advertised channel name
    pub name_prefix: String,

    /// NDI group the channels are advertised in
    pub group: String,

    /// Assignment snapshot file
    pub persistence_file: PathBuf,

    /// Channels to create at startup
    pub channels: Vec<ChannelConfig>,

    /// Source discovery poll interval
    pub discovery_interval: Duration,

    /// Receiver count poll interval
    pub receiver_poll_interval: Duration,

    /// Heartbeat interval
    pub heartbeat_interval: Duration,

    /// Delay before restoring saved assignments
    pub restore_delay: Duration,

    /// Native wait bound for receiver count queries
    pub receiver_wait: Duration,

    /// Event channel capacity
    pub event_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            name_prefix: "VMCR".to_string(),
            group: "vmcr".to_string(),
            persistence_file: PathBuf::from("./state.json"),
            channels: Vec::new(),
            discovery_interval: Duration::from_secs(5),
            receiver_poll_interval: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
            restore_delay: Duration::from_secs(2),
            receiver_wait: Duration::ZERO, // never stall the scheduler
            event_capacity: 256,
        }
    }
}

impl RouterConfig {
    /// Create a config with the given channels and defaults for the rest
    pub fn with_channels(channels: Vec<ChannelConfig>) -> Self {
        Self {
            channels,
            ..Default::default()
        }
    }

    /// Add a channel
    pub fn channel(mut self, channel: ChannelConfig) -> Self {
        self.channels.push(channel);
        self
    }

    /// Set the advertised name prefix
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Set the NDI group
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Set the persistence file
    pub fn persistence_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.persistence_file = path.into();
        self
    }

    /// Set the discovery poll interval
    pub fn discovery_interval(mut self, interval: Duration) -> Self {
        self.discovery_interval = interval;
        self
    }

    /// Set the receiver count poll interval
    pub fn receiver_poll_interval(mut self, interval: Duration) -> Self {
        self.receiver_poll_interval = interval;
        self
    }

    /// Set the heartbeat interval
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the restore grace delay
    pub fn restore_delay(mut self, delay: Duration) -> Self {
        self.restore_delay = delay;
        self
    }

    /// Set the receiver count wait bound
    pub fn receiver_wait(mut self, wait: Duration) -> Self {
        self.receiver_wait = wait;
        self
    }

    /// Advertised NDI name for a channel label
    pub fn ndi_name(&self, label: &str) -> String {
        format!("{} ({})", self.name_prefix, label)
    }

    /// Reject configurations the service cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.channels.is_empty() {
            return Err(Error::NoChannels);
        }

        // tokio::time::interval panics on a zero period.
        let intervals = [
            ("discovery_interval", self.discovery_interval),
            ("receiver_poll_interval", self.receiver_poll_interval),
            ("heartbeat_interval", self.heartbeat_interval),
        ];
        for (name, interval) in intervals {
            if interval.is_zero() {
                return Err(Error::ZeroInterval(name));
            }
        }

        Ok(())
    }

    /// Parse a TOML config
    ///
    /// ```toml
    /// [ndi]
    /// group = "vmcr"
    /// name_prefix = "VMCR"
    ///
    /// [persistence]
    /// file = "./state.json"
    ///
    /// [[channels]]
    /// id = "A"
    /// label = "Output A"
    /// color = "#2196F3"
    /// ```
    ///
    /// Missing sections take defaults. An optional `[timing]` table sets the
    /// intervals in milliseconds.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(content)?;
        let mut config = RouterConfig::default();

        if let Some(ndi) = file.ndi {
            if let Some(group) = ndi.group {
                config.group = group;
            }
            if let Some(prefix) = ndi.name_prefix {
                config.name_prefix = prefix;
            }
        }

        if let Some(file_path) = file.persistence.and_then(|p| p.file) {
            config.persistence_file = file_path;
        }

        if let Some(timing) = file.timing {
            let ms = Duration::from_millis;
            if let Some(v) = timing.discovery_interval_ms {
                config.discovery_interval = ms(v);
            }
            if let Some(v) = timing.receiver_poll_interval_ms {
                config.receiver_poll_interval = ms(v);
            }
            if let Some(v) = timing.heartbeat_interval_ms {
                config.heartbeat_interval = ms(v);
            }
            if let Some(v) = timing.restore_delay_ms {
                config.restore_delay = ms(v);
            }
            if let Some(v) = timing.receiver_wait_ms {
                config.receiver_wait = ms(v);
            }
        }

        config.channels = file.channels;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    ndi: Option<NdiSection>,
    persistence: Option<PersistenceSection>,
    timing: Option<TimingSection>,
    #[serde(default)]
    channels: Vec<ChannelConfig>,
}

#[derive(Debug, Deserialize)]
struct NdiSection {
    group: Option<String>,
    name_prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PersistenceSection {
    file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct TimingSection {
    discovery_interval_ms: Option<u64>,
    receiver_poll_interval_ms: Option<u64>,
    heartbeat_interval_ms: Option<u64>,
    restore_delay_ms: Option<u64>,
    receiver_wait_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RouterConfig::default();

        assert_eq!(config.name_prefix, "VMCR");
        assert_eq!(config.group, "vmcr");
        assert_eq!(config.persistence_file, PathBuf::from("./state.json"));
        assert_eq!(config.discovery_interval, Duration::from_secs(5));
        assert_eq!(config.receiver_poll_interval, Duration::from_secs(10));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.restore_delay, Duration::from_secs(2));
        assert!(config.channels.is_empty());
    }

    #[test]
    fn test_ndi_name() {
        let config = RouterConfig::default().name_prefix("STUDIO");

        assert_eq!(config.ndi_name("Output A"), "STUDIO (Output A)");
    }

    #[test]
    fn test_validate_requires_channels() {
        assert!(matches!(
            RouterConfig::default().validate(),
            Err(Error::NoChannels)
        ));

        let config = RouterConfig::default().channel(ChannelConfig::new("A", "Output A", "#2196F3"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let base = RouterConfig::default().channel(ChannelConfig::new("A", "Output A", "#2196F3"));

        assert!(matches!(
            base.clone().discovery_interval(Duration::ZERO).validate(),
            Err(Error::ZeroInterval("discovery_interval"))
        ));
        assert!(matches!(
            base.clone().receiver_poll_interval(Duration::ZERO).validate(),
            Err(Error::ZeroInterval("receiver_poll_interval"))
        ));
        assert!(matches!(
            base.clone().heartbeat_interval(Duration::ZERO).validate(),
            Err(Error::ZeroInterval("heartbeat_interval"))
        ));

        // Zero is fine where it is not a period
        assert!(base
            .restore_delay(Duration::ZERO)
            .receiver_wait(Duration::ZERO)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_from_toml_zero_interval() {
        let result = RouterConfig::from_toml_str(
            r##"
            [timing]
            discovery_interval_ms = 0

            [[channels]]
            id = "A"
            label = "Output A"
            color = "#2196F3"
            "##,
        );

        assert!(matches!(result, Err(Error::ZeroInterval("discovery_interval"))));
    }

    #[test]
    fn test_builder_chaining() {
        let config = RouterConfig::with_channels(vec![ChannelConfig::new("A", "Output A", "#2196F3")])
            .group("studio")
            .persistence_file("/var/lib/router/state.json")
            .discovery_interval(Duration::from_millis(500))
            .receiver_poll_interval(Duration::from_secs(1))
            .heartbeat_interval(Duration::from_secs(2))
            .restore_delay(Duration::from_millis(100))
            .receiver_wait(Duration::from_millis(50));

        assert_eq!(config.channels.len(), 1);
        assert_eq!(config.group, "studio");
        assert_eq!(config.persistence_file, PathBuf::from("/var/lib/router/state.json"));
        assert_eq!(config.discovery_interval, Duration::from_millis(500));
        assert_eq!(config.receiver_poll_interval, Duration::from_secs(1));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(2));
        assert_eq!(config.restore_delay, Duration::from_millis(100));
        assert_eq!(config.receiver_wait, Duration::from_millis(50));
    }

    #[test]
    fn test_from_toml() {
        let config = RouterConfig::from_toml_str(
            r##"
            [server]
            host = "0.0.0.0"
            port = 9400

            [ndi]
            group = "studio"
            name_prefix = "ROUTER"

            [persistence]
            file = "/tmp/router-state.json"

            [timing]
            discovery_interval_ms = 1000

            [[channels]]
            id = "A"
            label = "Output A"
            color = "#2196F3"

            [[channels]]
            id = "B"
            label = "Output B"
            color = "#FF9800"
            "##,
        )
        .unwrap();

        assert_eq!(config.group, "studio");
        assert_eq!(config.name_prefix, "ROUTER");
        assert_eq!(config.persistence_file, PathBuf::from("/tmp/router-state.json"));
        assert_eq!(config.discovery_interval, Duration::from_secs(1));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.channels[1], ChannelConfig::new("B", "Output B", "#FF9800"));
    }

    #[test]
    fn test_from_toml_defaults() {
        let config = RouterConfig::from_toml_str(
            r##"
            [[channels]]
            id = "A"
            label = "Output A"
            color = "#2196F3"
            "##,
        )
        .unwrap();

        assert_eq!(config.group, "vmcr");
        assert_eq!(config.name_prefix, "VMCR");
        assert_eq!(config.persistence_file, PathBuf::from("./state.json"));
    }

    #[test]
    fn test_from_toml_without_channels() {
        let result = RouterConfig::from_toml_str("[ndi]\ngroup = \"x\"\n");
        assert!(matches!(result, Err(Error::NoChannels)));
    }

    #[test]
    fn test_from_toml_invalid() {
        let result = RouterConfig::from_toml_str("[[channels]]\nid = 5\n");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = RouterConfig::load("/nonexistent/channels.toml");
        assert!(matches!(result, Err(Error::ConfigIo { .. })));
    }
}
