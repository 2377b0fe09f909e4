use crate::error::TelemetryError;
use crate::host::HostView;

const RTF_UP: u32 = 0x0001;

/// Interface carrying the default route, from `/proc/net/route`.
pub fn default_interface(host: &dyn HostView) -> Result<String, TelemetryError> {
    let text = host.read_to_string("/proc/net/route")?;
    parse_default_route(&text).ok_or(TelemetryError::NoDefaultRoute)
}

/// First up route with destination 0.0.0.0 and mask 0.0.0.0.
///
/// ```text
/// Iface  Destination  Gateway   Flags  RefCnt  Use  Metric  Mask      MTU  Window  IRTT
/// eth0   00000000     0102A8C0  0003   0       0    100     00000000  0    0       0
/// ```
pub fn parse_default_route(text: &str) -> Option<String> {
    text.lines()
        .skip(1)
        .filter_map(|line| {
            let f: Vec<&str> = line.split_whitespace().collect();
            if f.len() < 8 { return None; }
            let flags = u32::from_str_radix(f[3], 16).unwrap_or(0);
            let default = f[1] == "00000000" && f[7] == "00000000";
            (default && flags & RTF_UP != 0).then(|| f[0].to_string())
        })
        .next()
}

/// Driver-advertised link speed in Mbps; `-1`, missing, or garbage reads as 0.
pub fn link_speed_mbps(host: &dyn HostView, iface: &str) -> f64 {
    host.read_to_string(&format!("/sys/class/net/{}/speed", iface))
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| *v > 0.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::Fixture;

    const ROUTES: &str = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
docker0\t000011AC\t00000000\t0001\t0\t0\t0\t0000FFFF\t0\t0\t0
wlp2s0\t00000000\t0101A8C0\t0003\t0\t0\t600\t00000000\t0\t0\t0
eth0\t00000000\t0102A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0
";

    #[test]
    fn picks_first_default_route() {
        assert_eq!(parse_default_route(ROUTES).as_deref(), Some("wlp2s0"));
    }

    #[test]
    fn ignores_down_and_non_default_routes() {
        let text = "Iface\tDestination\tGateway\tFlags\tRefCnt\tUse\tMetric\tMask\n\
                    eth0\t00000000\t0102A8C0\t0002\t0\t0\t100\t00000000\n\
                    eth1\t0002A8C0\t00000000\t0001\t0\t0\t0\t00FFFFFF\n";
        assert_eq!(parse_default_route(text), None);
    }

    #[test]
    fn missing_route_table_is_no_route() {
        let fx = Fixture::new();
        assert!(default_interface(&fx).is_err());
        fx.write("/proc/net/route", "Iface\tDestination\n");
        assert!(matches!(default_interface(&fx), Err(TelemetryError::NoDefaultRoute)));
    }

    #[test]
    fn link_speed_defaults_to_zero() {
        let fx = Fixture::new();
        fx.write("/sys/class/net/eth0/speed", "1000\n");
        fx.write("/sys/class/net/wlan0/speed", "-1\n");
        assert_eq!(link_speed_mbps(&fx, "eth0"), 1000.0);
        assert_eq!(link_speed_mbps(&fx, "wlan0"), 0.0);
        assert_eq!(link_speed_mbps(&fx, "eth9"), 0.0);
    }
}
