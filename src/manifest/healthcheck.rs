// ABOUTME: Container health check declared on a manifest service.
// ABOUTME: Test command plus humantime-encoded interval, timeout, and start period.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::CommandSpec;

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthcheckSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<CommandSpec>,

    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub interval: Option<Duration>,

    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,

    #[serde(
        default,
        alias = "start_period",
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_period: Option<Duration>,

    #[serde(default)]
    pub disable: bool,
}

impl HealthcheckSpec {
    pub fn interval_or_default(&self) -> Duration {
        self.interval.unwrap_or(Duration::from_secs(30))
    }

    pub fn timeout_or_default(&self) -> Duration {
        self.timeout.unwrap_or(Duration::from_secs(30))
    }

    pub fn retries_or_default(&self) -> u32 {
        self.retries.unwrap_or(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compose_style_healthcheck() {
        let yaml = r#"
test: ["CMD", "curl", "-f", "http://localhost/health"]
interval: 10s
timeout: 2s
retries: 5
start_period: 1m
"#;
        let hc: HealthcheckSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(hc.interval, Some(Duration::from_secs(10)));
        assert_eq!(hc.timeout, Some(Duration::from_secs(2)));
        assert_eq!(hc.retries, Some(5));
        assert_eq!(hc.start_period, Some(Duration::from_secs(60)));
        assert!(matches!(hc.test, Some(CommandSpec::Exec(ref args)) if args.len() == 4));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let hc = HealthcheckSpec::default();
        assert_eq!(hc.interval_or_default(), Duration::from_secs(30));
        assert_eq!(hc.retries_or_default(), 3);
    }
}
