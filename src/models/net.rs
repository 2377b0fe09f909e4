use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Wired,
    Wireless,
}

impl LinkType {
    /// `wlan0`, `wlp3s0`, `wwan0` are wireless; everything else is treated as wired.
    pub fn from_iface(name: &str) -> Self {
        if name.starts_with('w') { LinkType::Wireless } else { LinkType::Wired }
    }
}

/// One bandwidth measurement on the default outbound interface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandwidthSample {
    pub name:            String,
    #[serde(rename = "type")]
    pub link_type:       LinkType,
    pub speed_up_mbps:   f64,
    pub speed_down_mbps: f64,
    /// Driver-advertised link speed in Mbps (0 when unknown).
    pub bandwidth:       f64,
    pub last_benchmark:  DateTime<Utc>,
}

impl BandwidthSample {
    /// A probe that moved no data in either direction is a failure, not a result.
    pub fn is_measurement(&self) -> bool {
        self.speed_down_mbps > 0.0 && self.speed_up_mbps > 0.0
    }
}

/// `bytes * 8 / (secs * 1e6)`; zero elapsed time yields zero rather than infinity.
pub fn mbps(bytes: u64, secs: f64) -> f64 {
    if secs <= 0.0 { return 0.0; }
    (bytes as f64 * 8.0) / (secs * 1_000_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_type_follows_interface_naming() {
        assert_eq!(LinkType::from_iface("wlan0"), LinkType::Wireless);
        assert_eq!(LinkType::from_iface("wlp2s0"), LinkType::Wireless);
        assert_eq!(LinkType::from_iface("eth0"), LinkType::Wired);
        assert_eq!(LinkType::from_iface("enp3s0"), LinkType::Wired);
    }

    #[test]
    fn mbps_handles_zero_duration() {
        assert_eq!(mbps(1_000_000, 0.0), 0.0);
        assert_eq!(mbps(1_250_000, 1.0), 10.0);
    }

    #[test]
    fn sample_json_shape() {
        let s = BandwidthSample {
            name:            "eth0".into(),
            link_type:       LinkType::Wired,
            speed_up_mbps:   12.5,
            speed_down_mbps: 80.0,
            bandwidth:       1000.0,
            last_benchmark:  DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["type"], "wired");
        assert_eq!(v["speedUpMbps"], 12.5);
        assert_eq!(v["speedDownMbps"], 80.0);
        assert_eq!(v["bandwidth"], 1000.0);
        assert_eq!(v["lastBenchmark"], "1970-01-01T00:00:00Z");
        assert!(s.is_measurement());
    }
}
