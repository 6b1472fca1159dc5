//! Weighbridge scale monitor.
//!
//! Reads a byte stream from a serial scale, feeds it through the
//! engine's [`FrameParser`], and keeps the latest stable weight
//! available to the UI. Hosts without a physical scale can run the
//! mock, a one-second random walk.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use baler_engine::{FrameParser, ScaleStatus};
use rand::Rng;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{Mutex, Notify};
use tokio::time::{interval, Duration};
use tracing::{debug, error};

/// Latest weight and connection state of the scale, shared with the
/// reader task.
#[derive(Clone, Default)]
pub struct ScaleMonitor {
    inner: Arc<Shared>,
}

struct Shared {
    weight: Mutex<f64>,
    status: Mutex<ScaleStatus>,
    /// Bumped on every connect and disconnect. A reader task only runs
    /// and publishes while its generation is current, so a torn-down
    /// task cannot overwrite state owned by its successor.
    generation: AtomicU64,
    shutdown: Notify,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            weight: Mutex::new(0.0),
            status: Mutex::new(ScaleStatus::Disconnected),
            generation: AtomicU64::new(0),
            shutdown: Notify::new(),
        }
    }
}

impl ScaleMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest stable weight in kilograms, zero while disconnected.
    pub async fn weight(&self) -> f64 {
        *self.inner.weight.lock().await
    }

    pub async fn status(&self) -> ScaleStatus {
        *self.inner.status.lock().await
    }

    /// Attach a serial byte stream and start reading weights from it.
    /// Any previous reader is torn down first.
    pub async fn connect<R>(&self, stream: R)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        self.disconnect().await;
        self.inner.set_status(ScaleStatus::Connecting).await;
        let my_gen = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let shared = self.inner.clone();
        tokio::spawn(async move {
            if shared.current(my_gen) {
                shared.set_status(ScaleStatus::Connected).await;
                debug!("scale connected");
            }
            shared.read_loop(stream, my_gen).await;
        });
    }

    /// Run the mock scale: a random walk of up to one kilogram per
    /// second, rounded to two decimals.
    pub async fn connect_mock(&self) {
        self.disconnect().await;
        self.inner.set_status(ScaleStatus::Mock).await;
        let my_gen = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let shared = self.inner.clone();
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(1));
            // The immediate first tick; steps land a second apart.
            ticker.tick().await;
            while shared.current(my_gen) {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !shared.current(my_gen) {
                            break;
                        }
                        let delta = {
                            let mut rng = rand::thread_rng();
                            rng.gen::<f64>() * 2.0 - 1.0
                        };
                        let mut weight = shared.weight.lock().await;
                        *weight = ((*weight + delta) * 100.0).round() / 100.0;
                    }
                    _ = shared.shutdown.notified() => {}
                }
            }
        });
    }

    /// Stop any reader and reset the published weight to zero.
    pub async fn disconnect(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.shutdown.notify_waiters();
        self.inner.set_status(ScaleStatus::Disconnected).await;
        *self.inner.weight.lock().await = 0.0;
        debug!("scale disconnected");
    }
}

impl Shared {
    fn current(&self, my_gen: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == my_gen
    }

    async fn set_status(&self, status: ScaleStatus) {
        *self.status.lock().await = status;
    }

    async fn read_loop<R>(&self, mut stream: R, my_gen: u64)
    where
        R: AsyncRead + Unpin,
    {
        let mut parser = FrameParser::new();
        let mut buf = vec![0u8; 1024];
        while self.current(my_gen) {
            tokio::select! {
                read = stream.read(&mut buf) => match read {
                    // Stream ended; leave the last weight showing.
                    Ok(0) => break,
                    Ok(n) => {
                        let reading = parser.push(&buf[..n]).pop();
                        if !self.current(my_gen) {
                            break;
                        }
                        if let Some(reading) = reading {
                            *self.weight.lock().await = reading;
                        }
                    }
                    Err(err) => {
                        error!(error = %err, "scale read failed");
                        if self.current(my_gen) {
                            self.set_status(ScaleStatus::Error).await;
                        }
                        break;
                    }
                },
                _ = self.shutdown.notified() => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn weights_flow_from_stream_to_monitor() {
        let (mut tx, rx) = tokio::io::duplex(256);
        let monitor = ScaleMonitor::new();
        monitor.connect(rx).await;

        tx.write_all(b"ST,GS,+  12.50kg\r\n").await.unwrap();
        wait_for_weight(&monitor, 12.5).await;
        assert_eq!(monitor.status().await, ScaleStatus::Connected);

        tx.write_all(b"ST,GS,+  13.75kg\r\n").await.unwrap();
        wait_for_weight(&monitor, 13.75).await;
    }

    #[tokio::test]
    async fn split_frames_reassemble_across_reads() {
        let (mut tx, rx) = tokio::io::duplex(256);
        let monitor = ScaleMonitor::new();
        monitor.connect(rx).await;

        tx.write_all(b"ST,GS,+  9.2").await.unwrap();
        tokio::task::yield_now().await;
        assert_eq!(monitor.weight().await, 0.0);

        tx.write_all(b"5kg\r\n").await.unwrap();
        wait_for_weight(&monitor, 9.25).await;
    }

    #[tokio::test]
    async fn disconnect_resets_weight_and_status() {
        let (mut tx, rx) = tokio::io::duplex(256);
        let monitor = ScaleMonitor::new();
        monitor.connect(rx).await;

        tx.write_all(b"ST,GS,+  5.00kg\n").await.unwrap();
        wait_for_weight(&monitor, 5.0).await;

        monitor.disconnect().await;
        assert_eq!(monitor.status().await, ScaleStatus::Disconnected);
        assert_eq!(monitor.weight().await, 0.0);

        // Late bytes from the torn-down stream change nothing.
        let _ = tx.write_all(b"ST,GS,+  7.00kg\n").await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(monitor.weight().await, 0.0);
    }

    #[tokio::test]
    async fn reconnect_replaces_the_previous_stream() {
        let (mut old_tx, old_rx) = tokio::io::duplex(256);
        let (mut new_tx, new_rx) = tokio::io::duplex(256);
        let monitor = ScaleMonitor::new();

        monitor.connect(old_rx).await;
        old_tx.write_all(b"ST,GS,+  3.00kg\n").await.unwrap();
        wait_for_weight(&monitor, 3.0).await;

        monitor.connect(new_rx).await;
        new_tx.write_all(b"ST,GS,+  8.00kg\n").await.unwrap();
        wait_for_weight(&monitor, 8.0).await;

        // The replaced stream no longer publishes.
        let _ = old_tx.write_all(b"ST,GS,+  4.00kg\n").await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(monitor.weight().await, 8.0);
    }

    #[tokio::test]
    async fn mock_scale_reports_mock_status() {
        let monitor = ScaleMonitor::new();
        monitor.connect_mock().await;
        assert_eq!(monitor.status().await, ScaleStatus::Mock);

        monitor.disconnect().await;
        assert_eq!(monitor.status().await, ScaleStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn mock_scale_walks_in_bounded_steps() {
        let monitor = ScaleMonitor::new();
        monitor.connect_mock().await;

        let mut previous = monitor.weight().await;
        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(1)).await;
            tokio::task::yield_now().await;
            let current = monitor.weight().await;
            assert!((current - previous).abs() <= 1.0 + 1e-9);
            // Two-decimal rounding holds at every step.
            assert!((current * 100.0 - (current * 100.0).round()).abs() < 1e-6);
            previous = current;
        }

        monitor.disconnect().await;
    }

    async fn wait_for_weight(monitor: &ScaleMonitor, expected: f64) {
        for _ in 0..200 {
            if (monitor.weight().await - expected).abs() < 1e-9 {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!(
            "weight never reached {expected}, last seen {}",
            monitor.weight().await
        );
    }
}
