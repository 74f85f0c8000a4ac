//! Playback modes and observation stream URLs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::StreamError;
use crate::models::TimePeriod;
use crate::rest::{ApiConfig, ResourceType};

/// Whether a stream follows live data or replays a time range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    #[default]
    #[serde(alias = "real_time")]
    Realtime,
    Archive,
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackMode::Realtime => write!(f, "realtime"),
            PlaybackMode::Archive => write!(f, "archive"),
        }
    }
}

impl FromStr for PlaybackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "realtime" | "real_time" | "live" => Ok(PlaybackMode::Realtime),
            "archive" => Ok(PlaybackMode::Archive),
            other => Err(format!("unknown playback mode '{}'", other)),
        }
    }
}

/// Playback settings of one streamable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Playback {
    pub mode: PlaybackMode,
    /// Replay window; archive mode falls back to the resource's valid time
    pub period: Option<TimePeriod>,
}

impl Playback {
    pub fn realtime() -> Self {
        Self::default()
    }

    pub fn archive(period: Option<TimePeriod>) -> Self {
        Self {
            mode: PlaybackMode::Archive,
            period,
        }
    }
}

/// Build the observation stream URL of a resource
///
/// `<ws|wss>://host:port/<api-root>/<collection>/<id>/observations?f=application%2Fjson`,
/// with `&resultTime=start/end` appended in archive mode.
pub fn observation_stream_url(
    api: &ApiConfig,
    res_type: ResourceType,
    res_id: &str,
    playback: &Playback,
    fallback_period: Option<TimePeriod>,
) -> Result<String, StreamError> {
    let mut url = format!(
        "{}://{}:{}/{}/{}/{}/{}?f={}",
        api.protocol.ws_scheme(),
        api.host(),
        api.port,
        api.api_root.trim_matches('/'),
        res_type.path_segment(),
        res_id,
        ResourceType::Observation.path_segment(),
        urlencoding::encode("application/json"),
    );

    if playback.mode == PlaybackMode::Archive {
        let period = playback
            .period
            .or(fallback_period)
            .ok_or(StreamError::PlaybackPeriodUnset)?;
        url.push_str("&resultTime=");
        url.push_str(&period.to_string());
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::Protocol;

    fn config(protocol: Protocol) -> ApiConfig {
        ApiConfig {
            protocol,
            address: "localhost".to_string(),
            port: 8585,
            ..Default::default()
        }
    }

    #[test]
    fn test_realtime_url() {
        let url = observation_stream_url(
            &config(Protocol::Http),
            ResourceType::Datastream,
            "ds123",
            &Playback::realtime(),
            None,
        )
        .unwrap();
        assert_eq!(
            url,
            "ws://localhost:8585/sensorhub/api/datastreams/ds123/observations?f=application%2Fjson"
        );
    }

    #[test]
    fn test_ipv6_address_is_bracketed() {
        let api = ApiConfig {
            address: "::1".to_string(),
            ..config(Protocol::Http)
        };
        let url = observation_stream_url(&api, ResourceType::Datastream, "ds1", &Playback::realtime(), None).unwrap();
        assert!(url.starts_with("ws://[::1]:8585/sensorhub/api/datastreams/ds1/observations"));
    }

    #[test]
    fn test_secure_system_url() {
        let url = observation_stream_url(
            &config(Protocol::Https),
            ResourceType::System,
            "sys1",
            &Playback::realtime(),
            None,
        )
        .unwrap();
        assert!(url.starts_with("wss://localhost:8585/sensorhub/api/systems/sys1/observations"));
    }

    #[test]
    fn test_archive_url_appends_period() {
        let period = TimePeriod::parse("2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z").unwrap();
        let url = observation_stream_url(
            &config(Protocol::Http),
            ResourceType::Datastream,
            "ds1",
            &Playback::archive(Some(period)),
            None,
        )
        .unwrap();
        assert!(url.ends_with("&resultTime=2024-01-01T00:00:00Z/2024-01-02T00:00:00Z"));
    }

    #[test]
    fn test_archive_falls_back_to_valid_time() {
        let valid = TimePeriod::parse("2024-03-01T00:00:00Z", "now").unwrap();
        let url = observation_stream_url(
            &config(Protocol::Http),
            ResourceType::Datastream,
            "ds1",
            &Playback::archive(None),
            Some(valid),
        )
        .unwrap();
        assert!(url.ends_with("&resultTime=2024-03-01T00:00:00Z/now"));

        let err = observation_stream_url(
            &config(Protocol::Http),
            ResourceType::Datastream,
            "ds1",
            &Playback::archive(None),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, StreamError::PlaybackPeriodUnset));
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("Archive".parse::<PlaybackMode>().unwrap(), PlaybackMode::Archive);
        assert_eq!("realtime".parse::<PlaybackMode>().unwrap(), PlaybackMode::Realtime);
        assert!("rewind".parse::<PlaybackMode>().is_err());
    }
}
