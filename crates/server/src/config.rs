// crates/server/src/config.rs
//! Process configuration: command-line flags with `HEADWAY_*` environment
//! fallbacks.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use headway_core::OvershootPolicy;

use crate::maintenance::MaintenanceSettings;

/// Default staleness window: one hour without an update.
pub const DEFAULT_STALE_AFTER_SECS: u64 = 3600;

#[derive(Debug, Clone, Parser)]
#[command(name = "headway", version, about = "Collects and displays progress of long-running tasks")]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "HEADWAY_BIND", default_value = "0.0.0.0:7777")]
    pub bind: SocketAddr,

    /// Directory holding one secret file per owner.
    #[arg(long, env = "HEADWAY_SECRETS_DIR", default_value = "secrets")]
    pub secrets_dir: PathBuf,

    /// Drop tasks that have not been updated for this many seconds.
    #[arg(
        long,
        env = "HEADWAY_STALE_AFTER_SECS",
        default_value_t = DEFAULT_STALE_AFTER_SECS
    )]
    pub stale_after_secs: u64,

    /// How often to look for stale tasks.
    #[arg(
        long,
        env = "HEADWAY_EVICT_EVERY_SECS",
        default_value_t = 3600,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub evict_every_secs: u64,

    /// How often to rebuild the sorted views served to readers.
    #[arg(
        long,
        env = "HEADWAY_REFRESH_EVERY_MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub refresh_every_ms: u64,

    /// What to do when `current` exceeds `total`: clamp, reject or allow.
    #[arg(long, env = "HEADWAY_OVERSHOOT", default_value_t = OvershootPolicy::Clamp)]
    pub overshoot: OvershootPolicy,

    /// Forward "message" updates to this URL instead of only logging them.
    #[arg(long, env = "HEADWAY_NOTIFY_WEBHOOK")]
    pub notify_webhook: Option<String>,
}

impl Config {
    pub fn maintenance(&self) -> MaintenanceSettings {
        MaintenanceSettings {
            stale_after: Duration::from_secs(self.stale_after_secs),
            evict_every: Duration::from_secs(self.evict_every_secs),
            refresh_every: Duration::from_millis(self.refresh_every_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["headway"]).unwrap();
        assert_eq!(config.bind, "0.0.0.0:7777".parse().unwrap());
        assert_eq!(config.secrets_dir, PathBuf::from("secrets"));
        assert_eq!(config.overshoot, OvershootPolicy::Clamp);
        assert!(config.notify_webhook.is_none());

        let settings = config.maintenance();
        assert_eq!(settings, MaintenanceSettings::default());
        assert_eq!(settings.stale_after, Duration::from_secs(3600));
        assert_eq!(settings.evict_every, Duration::from_secs(3600));
        assert_eq!(settings.refresh_every, Duration::from_secs(1));
    }

    #[test]
    fn test_overrides() {
        let config = Config::try_parse_from([
            "headway",
            "--bind",
            "127.0.0.1:9000",
            "--stale-after-secs",
            "86400",
            "--refresh-every-ms",
            "250",
            "--overshoot",
            "reject",
            "--notify-webhook",
            "http://hooks.local/x",
        ])
        .unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.overshoot, OvershootPolicy::Reject);
        assert_eq!(config.maintenance().stale_after, Duration::from_secs(86400));
        assert_eq!(config.maintenance().refresh_every, Duration::from_millis(250));
        assert_eq!(config.notify_webhook.as_deref(), Some("http://hooks.local/x"));
    }

    #[test]
    fn test_rejects_zero_periods_and_bad_policy() {
        assert!(Config::try_parse_from(["headway", "--refresh-every-ms", "0"]).is_err());
        assert!(Config::try_parse_from(["headway", "--evict-every-secs", "0"]).is_err());
        assert!(Config::try_parse_from(["headway", "--overshoot", "maybe"]).is_err());
    }
}
