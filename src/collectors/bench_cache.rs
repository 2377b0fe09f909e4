use crate::collectors::bandwidth::BandwidthProbe;
use crate::error::TelemetryError;
use crate::models::net::BandwidthSample;
use chrono::Utc;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// How long a good sample is served before the probe runs again.
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(4 * 60 * 60);
/// Minimum gap between probe attempts after a failure.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Default)]
struct CacheState {
    sample:      Option<BandwidthSample>,
    captured_at: Option<Instant>,
    failed_at:   Option<Instant>,
}

/// Serializes and throttles the bandwidth probe.
///
/// One lock covers both the freshness check and the probe itself, so
/// concurrent callers on a cold cache queue behind a single probe run instead
/// of each starting their own transfer.
pub struct BenchmarkCache {
    probe:       Box<dyn BandwidthProbe>,
    validity:    Duration,
    retry_after: Duration,
    state:       Mutex<CacheState>,
}

impl BenchmarkCache {
    pub fn new(probe: Box<dyn BandwidthProbe>, validity: Duration, retry_after: Duration) -> Self {
        Self { probe, validity, retry_after, state: Mutex::new(CacheState::default()) }
    }

    /// The current sample: cached if fresh, otherwise measured now.
    ///
    /// Empty when no probe has ever succeeded. A failed probe leaves the last
    /// good sample (and its timestamp) in place and returns it.
    pub fn get(&self) -> Vec<BandwidthSample> {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let (Some(sample), Some(at)) = (&st.sample, st.captured_at) {
            if at.elapsed() < self.validity {
                return vec![sample.clone()];
            }
        }
        if let Some(failed) = st.failed_at {
            if failed.elapsed() < self.retry_after {
                tracing::debug!("bandwidth probe failed recently, serving last known sample");
                return st.sample.iter().cloned().collect();
            }
        }

        match self.measure() {
            Ok(sample) => {
                tracing::info!(
                    "bandwidth probe on {}: down {:.1} Mbps, up {:.1} Mbps",
                    sample.name, sample.speed_down_mbps, sample.speed_up_mbps
                );
                st.sample      = Some(sample.clone());
                st.captured_at = Some(Instant::now());
                st.failed_at   = None;
                vec![sample]
            }
            Err(e) => {
                tracing::warn!("bandwidth probe failed: {}", e);
                st.failed_at = Some(Instant::now());
                st.sample.iter().cloned().collect()
            }
        }
    }

    /// Last good sample without ever triggering a probe.
    #[cfg(test)]
    pub fn peek(&self) -> Option<BandwidthSample> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).sample.clone()
    }

    fn measure(&self) -> Result<BandwidthSample, TelemetryError> {
        let mut sample = self.probe.run()?;
        if !sample.is_measurement() {
            return Err(TelemetryError::EmptyMeasurement);
        }
        sample.last_benchmark = Utc::now();
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::net::LinkType;
    use chrono::DateTime;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    fn sample(down: f64, up: f64) -> BandwidthSample {
        BandwidthSample {
            name:            "eth0".into(),
            link_type:       LinkType::Wired,
            speed_up_mbps:   up,
            speed_down_mbps: down,
            bandwidth:       1000.0,
            last_benchmark:  DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
        }
    }

    /// Returns scripted results in order, then repeats the last one.
    struct Scripted {
        calls:   Arc<AtomicUsize>,
        results: Mutex<VecDeque<Result<BandwidthSample, ()>>>,
        delay:   Duration,
    }

    impl Scripted {
        fn new(results: Vec<Result<BandwidthSample, ()>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let probe = Scripted {
                calls:   calls.clone(),
                results: Mutex::new(results.into()),
                delay:   Duration::ZERO,
            };
            (probe, calls)
        }
    }

    impl BandwidthProbe for Scripted {
        fn run(&self) -> Result<BandwidthSample, TelemetryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            let mut q = self.results.lock().unwrap();
            let next = if q.len() > 1 { q.pop_front().unwrap() } else { q.front().cloned().unwrap() };
            next.map_err(|_| TelemetryError::Transport("scripted failure".into()))
        }
    }

    #[test]
    fn fresh_sample_is_served_without_reprobing() {
        let (probe, calls) = Scripted::new(vec![Ok(sample(90.0, 20.0))]);
        let cache = BenchmarkCache::new(Box::new(probe), DEFAULT_VALIDITY, DEFAULT_RETRY_AFTER);

        let first = cache.get();
        let second = cache.get();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
        assert_eq!(second[0].last_benchmark, cache.peek().unwrap().last_benchmark);
        assert_ne!(second[0].last_benchmark, sample(0.0, 0.0).last_benchmark);
    }

    #[test]
    fn expired_sample_triggers_new_probe() {
        let (probe, calls) = Scripted::new(vec![Ok(sample(90.0, 20.0)), Ok(sample(50.0, 10.0))]);
        let cache = BenchmarkCache::new(Box::new(probe), Duration::ZERO, Duration::ZERO);

        assert_eq!(cache.get()[0].speed_down_mbps, 90.0);
        assert_eq!(cache.get()[0].speed_down_mbps, 50.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_cold_callers_share_one_probe() {
        let (mut probe, calls) = Scripted::new(vec![Ok(sample(90.0, 20.0))]);
        probe.delay = Duration::from_millis(100);
        let cache = BenchmarkCache::new(Box::new(probe), DEFAULT_VALIDITY, DEFAULT_RETRY_AFTER);
        let barrier = Barrier::new(2);

        let (a, b) = std::thread::scope(|s| {
            let ha = s.spawn(|| { barrier.wait(); cache.get() });
            let hb = s.spawn(|| { barrier.wait(); cache.get() });
            (ha.join().unwrap(), hb.join().unwrap())
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn failed_probe_keeps_last_good_sample_and_timestamp() {
        let (probe, calls) = Scripted::new(vec![Ok(sample(90.0, 20.0)), Err(())]);
        let cache = BenchmarkCache::new(Box::new(probe), Duration::ZERO, Duration::ZERO);

        let good = cache.get();
        let after_failure = cache.get();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(good, after_failure);
        assert_eq!(cache.peek().map(|s| s.last_benchmark), Some(good[0].last_benchmark));
    }

    #[test]
    fn failure_with_empty_cache_returns_nothing() {
        let (probe, _) = Scripted::new(vec![Err(())]);
        let cache = BenchmarkCache::new(Box::new(probe), DEFAULT_VALIDITY, Duration::ZERO);
        assert!(cache.get().is_empty());
        assert!(cache.peek().is_none());
    }

    #[test]
    fn zero_throughput_is_not_cached() {
        let (probe, calls) = Scripted::new(vec![Ok(sample(0.0, 0.0)), Ok(sample(80.0, 15.0))]);
        let cache = BenchmarkCache::new(Box::new(probe), DEFAULT_VALIDITY, Duration::ZERO);

        assert!(cache.get().is_empty());
        assert_eq!(cache.get()[0].speed_down_mbps, 80.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    /// Panics on the first call, succeeds afterwards.
    struct PanicsOnce {
        calls: AtomicUsize,
    }

    impl BandwidthProbe for PanicsOnce {
        fn run(&self) -> Result<BandwidthSample, TelemetryError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("transfer thread blew up");
            }
            Ok(sample(70.0, 12.0))
        }
    }

    #[test]
    fn panic_mid_measurement_does_not_wedge_the_cache() {
        let probe = PanicsOnce { calls: AtomicUsize::new(0) };
        let cache = BenchmarkCache::new(Box::new(probe), DEFAULT_VALIDITY, DEFAULT_RETRY_AFTER);

        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cache.get()));
        assert!(first.is_err());
        assert!(cache.state.is_poisoned());

        let after = cache.get();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].speed_down_mbps, 70.0);
        assert_eq!(cache.peek().map(|s| s.speed_up_mbps), Some(12.0));
    }

    #[test]
    fn recent_failure_throttles_retries() {
        let (probe, calls) = Scripted::new(vec![Err(())]);
        let cache = BenchmarkCache::new(Box::new(probe), DEFAULT_VALIDITY, Duration::from_secs(3600));

        assert!(cache.get().is_empty());
        assert!(cache.get().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
