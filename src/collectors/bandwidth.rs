use crate::collectors::route;
use crate::error::TelemetryError;
use crate::host::HostView;
use crate::models::net::{mbps, BandwidthSample, LinkType};
use chrono::Utc;
use reqwest::blocking::Client;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Something that can measure achievable throughput right now.
pub trait BandwidthProbe: Send + Sync {
    fn run(&self) -> Result<BandwidthSample, TelemetryError>;
}

/// Endpoints and limits for the HTTP transfer probe.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub download_url:     String,
    pub upload_url:       String,
    pub upload_bytes:     u64,
    pub download_timeout: Duration,
    pub upload_timeout:   Duration,
}

/// Measures throughput with a real download and upload against a public test server.
pub struct HttpProbe {
    host:     Arc<dyn HostView>,
    settings: ProbeSettings,
}

impl HttpProbe {
    pub fn new(host: Arc<dyn HostView>, settings: ProbeSettings) -> Self {
        Self { host, settings }
    }

    fn download(&self) -> Result<f64, TelemetryError> {
        let client = Client::builder()
            .timeout(self.settings.download_timeout)
            .build()?;

        let start = Instant::now();
        let mut resp = client.get(&self.settings.download_url).send()?.error_for_status()?;
        let written = io::copy(&mut resp, &mut io::sink())
            .map_err(|e| TelemetryError::Transport(format!("download body: {}", e)))?;
        let secs = start.elapsed().as_secs_f64();

        tracing::debug!("downloaded {} bytes in {:.2}s", written, secs);
        Ok(mbps(written, secs))
    }

    fn upload(&self) -> Result<f64, TelemetryError> {
        let client = Client::builder()
            .timeout(self.settings.upload_timeout)
            .build()?;
        let body = vec![0u8; self.settings.upload_bytes as usize];

        // the payload is on the wire once the reply arrives, whatever its status
        let start = Instant::now();
        let resp = client.put(&self.settings.upload_url).body(body).send()?;
        let secs = start.elapsed().as_secs_f64();
        if !resp.status().is_success() {
            tracing::debug!("upload endpoint answered {}", resp.status());
        }

        tracing::debug!("uploaded {} bytes in {:.2}s", self.settings.upload_bytes, secs);
        Ok(mbps(self.settings.upload_bytes, secs))
    }
}

impl BandwidthProbe for HttpProbe {
    fn run(&self) -> Result<BandwidthSample, TelemetryError> {
        let iface = route::default_interface(self.host.as_ref())?;
        tracing::info!("running bandwidth probe on {}", iface);

        let speed_down_mbps = self.download()?;
        let speed_up_mbps   = self.upload()?;

        Ok(BandwidthSample {
            link_type:      LinkType::from_iface(&iface),
            bandwidth:      route::link_speed_mbps(self.host.as_ref(), &iface),
            name:           iface,
            speed_up_mbps,
            speed_down_mbps,
            last_benchmark: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::Fixture;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;

    const ETH0_ROUTE: &str = "Iface\tDestination\tGateway\tFlags\tRefCnt\tUse\tMetric\tMask\n\
                              eth0\t00000000\t0102A8C0\t0003\t0\t0\t100\t00000000\n";

    fn settings(base: &str) -> ProbeSettings {
        ProbeSettings {
            download_url:     format!("{}/100MB.zip", base),
            upload_url:       format!("{}/upload.php", base),
            upload_bytes:     64 * 1024,
            download_timeout: Duration::from_secs(5),
            upload_timeout:   Duration::from_secs(5),
        }
    }

    fn eth0_host() -> Arc<Fixture> {
        let fx = Arc::new(Fixture::new());
        fx.write("/proc/net/route", ETH0_ROUTE);
        fx.write("/sys/class/net/eth0/speed", "1000\n");
        fx
    }

    /// Answer GET with `get_status` and a zero body of `body_len` bytes, and
    /// PUT with `put_status` after draining the upload.
    fn serve(get_status: &'static str, put_status: &'static str, body_len: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for stream in listener.incoming().take(2) {
                let mut stream = stream.unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());

                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    if line.trim().is_empty() { break; }
                    if let Some((k, v)) = line.split_once(':') {
                        if k.eq_ignore_ascii_case("content-length") {
                            content_length = v.trim().parse().unwrap();
                        }
                    }
                }
                let mut upload = vec![0u8; content_length];
                reader.read_exact(&mut upload).unwrap();

                let (status, body) = if request_line.starts_with("GET") {
                    (get_status, vec![0u8; body_len])
                } else {
                    (put_status, Vec::new())
                };
                let head = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status, body.len()
                );
                stream.write_all(head.as_bytes()).unwrap();
                stream.write_all(&body).unwrap();
            }
        });
        format!("http://{}", addr)
    }

    #[test]
    fn measures_both_legs_and_link_speed() {
        let base = serve("200 OK", "200 OK", 2 * 1024 * 1024);
        let probe = HttpProbe::new(eth0_host(), settings(&base));

        let sample = probe.run().unwrap();
        assert_eq!(sample.name, "eth0");
        assert_eq!(sample.link_type, LinkType::Wired);
        assert_eq!(sample.bandwidth, 1000.0);
        assert!(sample.speed_down_mbps > 0.0);
        assert!(sample.speed_up_mbps > 0.0);
        assert!(sample.is_measurement());
    }

    #[test]
    fn download_error_status_is_transport_error() {
        let base = serve("404 Not Found", "200 OK", 16);
        let probe = HttpProbe::new(eth0_host(), settings(&base));
        assert!(matches!(probe.run(), Err(TelemetryError::Transport(_))));
    }

    #[test]
    fn upload_status_does_not_void_the_measurement() {
        let base = serve("200 OK", "405 Method Not Allowed", 1024 * 1024);
        let probe = HttpProbe::new(eth0_host(), settings(&base));

        let sample = probe.run().unwrap();
        assert!(sample.speed_up_mbps > 0.0);
    }

    #[test]
    fn no_default_route_is_an_error() {
        let fx = Arc::new(Fixture::new());
        fx.write("/proc/net/route", "Iface\tDestination\tGateway\tFlags\tRefCnt\tUse\tMetric\tMask\n");
        let probe = HttpProbe::new(fx, settings("http://127.0.0.1:9"));
        assert!(matches!(probe.run(), Err(TelemetryError::NoDefaultRoute)));
    }

    #[test]
    fn unreachable_endpoint_is_transport_error() {
        let probe = HttpProbe::new(eth0_host(), settings("http://127.0.0.1:9"));
        assert!(matches!(probe.run(), Err(TelemetryError::Transport(_))));
    }
}
