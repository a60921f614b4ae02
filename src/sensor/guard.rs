//! Timeout and retry wrappers for sensor sources.
//!
//! Reads are idempotent, so they may be retried. The timeout wrapper moves the
//! wrapped source onto a worker thread and waits on a channel with a deadline.

use crate::sensor::types::{Channel, SensorError, SensorSource};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Retries failed reads up to a fixed budget.
pub struct RetryingSource<S> {
    inner: S,
    retries: u32,
}

impl<S: SensorSource> RetryingSource<S> {
    pub fn new(inner: S, retries: u32) -> Self {
        Self { inner, retries }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: SensorSource> SensorSource for RetryingSource<S> {
    fn read_voltage(&mut self, channel: Channel) -> Result<f64, SensorError> {
        let mut attempt = 0;
        loop {
            match self.inner.read_voltage(channel) {
                Ok(voltage) => return Ok(voltage),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(%channel, attempt, error = %e, "retrying sensor read");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

type Request = (u64, Channel);
type Reply = (u64, Result<f64, SensorError>);

/// Bounds every read by a timeout.
///
/// A read that times out keeps running on the worker; its late reply is
/// discarded by sequence number.
pub struct TimedSource {
    requests: Option<Sender<Request>>,
    replies: Receiver<Reply>,
    timeout: Duration,
    next_seq: u64,
    worker: Option<JoinHandle<()>>,
}

impl TimedSource {
    /// Move `source` onto a worker thread.
    pub fn spawn<S>(mut source: S, timeout: Duration) -> Self
    where
        S: SensorSource + Send + 'static,
    {
        let (request_tx, request_rx) = bounded::<Request>(1);
        let (reply_tx, reply_rx) = bounded::<Reply>(16);

        let worker = thread::spawn(move || {
            while let Ok((seq, channel)) = request_rx.recv() {
                let result = source.read_voltage(channel);
                if reply_tx.send((seq, result)).is_err() {
                    break;
                }
            }
        });

        Self {
            requests: Some(request_tx),
            replies: reply_rx,
            timeout,
            next_seq: 0,
            worker: Some(worker),
        }
    }
}

impl SensorSource for TimedSource {
    fn read_voltage(&mut self, channel: Channel) -> Result<f64, SensorError> {
        let seq = self.next_seq;
        self.next_seq += 1;

        let deadline = Instant::now() + self.timeout;
        let timed_out = SensorError::Timeout {
            channel,
            after: self.timeout,
        };

        let requests = self
            .requests
            .as_ref()
            .ok_or_else(|| SensorError::io(channel, "sensor worker stopped"))?;

        // The worker may still be busy with a read that already timed out.
        requests
            .send_timeout((seq, channel), self.timeout)
            .map_err(|_| timed_out.clone())?;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.replies.recv_timeout(remaining) {
                Ok((reply_seq, result)) if reply_seq == seq => return result,
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => return Err(timed_out),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SensorError::io(channel, "sensor worker stopped"))
                }
            }
        }
    }
}

impl Drop for TimedSource {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.requests.take();
        if let Some(handle) = self.worker.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakySource {
        failures_left: u32,
        calls: u32,
    }

    impl SensorSource for FlakySource {
        fn read_voltage(&mut self, channel: Channel) -> Result<f64, SensorError> {
            self.calls += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(SensorError::io(channel, "transient"));
            }
            Ok(0.5)
        }
    }

    struct SlowSource {
        delay: Duration,
    }

    impl SensorSource for SlowSource {
        fn read_voltage(&mut self, _channel: Channel) -> Result<f64, SensorError> {
            thread::sleep(self.delay);
            Ok(1.0)
        }
    }

    #[test]
    fn test_retry_within_budget() {
        let mut source = RetryingSource::new(
            FlakySource {
                failures_left: 2,
                calls: 0,
            },
            2,
        );
        assert_eq!(source.read_voltage(Channel::Ecg).unwrap(), 0.5);
        assert_eq!(source.into_inner().calls, 3);
    }

    #[test]
    fn test_retry_budget_exhausted() {
        let mut source = RetryingSource::new(
            FlakySource {
                failures_left: 5,
                calls: 0,
            },
            1,
        );
        assert!(source.read_voltage(Channel::Ecg).is_err());
        assert_eq!(source.into_inner().calls, 2);
    }

    #[test]
    fn test_timed_source_passes_fast_reads() {
        let mut source = TimedSource::spawn(
            SlowSource {
                delay: Duration::from_millis(0),
            },
            Duration::from_secs(2),
        );
        assert_eq!(source.read_voltage(Channel::Gsr).unwrap(), 1.0);
        assert_eq!(source.read_voltage(Channel::Ecg).unwrap(), 1.0);
    }

    #[test]
    fn test_timed_source_times_out() {
        let mut source = TimedSource::spawn(
            SlowSource {
                delay: Duration::from_millis(300),
            },
            Duration::from_millis(20),
        );
        let err = source.read_voltage(Channel::Temperature).unwrap_err();
        assert!(matches!(
            err,
            SensorError::Timeout {
                channel: Channel::Temperature,
                ..
            }
        ));
    }
}
