//! The watch loops: one session runs from open to termination on a single
//! control thread, interleaving event consumption, mask filtering,
//! aggregation, stop polling, and dispatch.

use std::io;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;
use serde_json::Value;

use crate::backlog;
use crate::buffer::AggregationBuffer;
use crate::config::{DirWatchConfig, LineWatchConfig};
use crate::dispatch::{batch_payload, DispatchSink, StopSignal};
use crate::error::TriggerError;
use crate::tail::{LineTail, TailStart};
use crate::watcher::DirWatcher;

/// How long an idle directory session waits for an event before checking
/// the stop signal again.
const IDLE_POLL: Duration = Duration::from_millis(200);

/// Counts observed events between stop-signal checks. The comparison is
/// strictly greater-than: a rate of 2 consults the signal on every third
/// observation.
struct StopPoller {
    observed: usize,
    rate: usize,
}

impl StopPoller {
    fn new(rate: usize) -> Self {
        Self { observed: 0, rate }
    }

    /// Returns true when the stop signal should be consulted now.
    fn observe(&mut self) -> bool {
        self.observed += 1;
        if self.observed > self.rate {
            self.observed = 0;
            true
        } else {
            false
        }
    }
}

fn dispatch(
    sink: &mut dyn DispatchSink,
    job: &str,
    data_key: &str,
    items: Vec<String>,
) -> Result<(), TriggerError> {
    tracing::debug!(count = items.len(), job, "dispatching batch");
    let payload: Value = batch_payload(data_key, &items);
    sink.run_job(job, &payload)
}

/// Watch a directory for file changes and dispatch aggregated batches.
///
/// Runs until the stop signal is observed or a fatal error occurs. Once the
/// stop predicate is observed true, no further dispatch happens and the
/// watch registration is released before this returns.
pub fn run_dir_session(
    config: &DirWatchConfig,
    sink: &mut dyn DispatchSink,
    stop: &dyn StopSignal,
) -> Result<(), TriggerError> {
    config.validate()?;

    let span = tracing::info_span!("watch_dir", path = %config.path.display(), job = %config.job);
    let _guard = span.enter();

    let mask = config.mask();
    if mask.is_empty() {
        tracing::warn!("all event categories are disabled; no event will ever match");
    }

    let mut buffer = AggregationBuffer::new(config.aggregate, config.dedupe);

    // Seed the buffer with pre-existing files before live watching starts.
    // Seeded entries are ordinary entries: if they alone reach the
    // threshold, the batch goes out before the first live event.
    if config.use_existing {
        for path in backlog::existing_files(&config.path, config.recursive)? {
            buffer.push(path);
        }
        tracing::info!(seeded = buffer.len(), "loaded existing files into buffer");
        if buffer.ready() {
            dispatch(sink, &config.job, &config.data_key, buffer.take_all())?;
        }
    }

    let watcher = DirWatcher::open(&config.path, config.recursive)?;
    tracing::info!("watching for file changes");

    let throttle = config.throttle();
    let mut poller = StopPoller::new(config.stop_polling_rate);

    loop {
        match watcher.recv_timeout(IDLE_POLL) {
            Ok(change) => {
                if mask.accepts(&change) {
                    buffer.push(change.path.to_string_lossy().into_owned());
                }

                if poller.observe() && stop.is_stopped() {
                    break;
                }

                if buffer.ready() {
                    dispatch(sink, &config.job, &config.data_key, buffer.take_all())?;
                }

                if let Some(pause) = throttle {
                    thread::sleep(pause);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if stop.is_stopped() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(TriggerError::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "watch event channel closed",
                )));
            }
        }
    }

    tracing::info!("stop signal observed, ending watch session");
    watcher.close();
    Ok(())
}

/// Watch a file for appended lines and dispatch aggregated batches.
///
/// Each dispatch takes exactly the first `aggregate` buffered lines; a
/// burst of 2×aggregate lines yields two sequential dispatches, never one
/// oversized batch.
pub fn run_line_session(
    config: &LineWatchConfig,
    sink: &mut dyn DispatchSink,
    stop: &dyn StopSignal,
) -> Result<(), TriggerError> {
    config.validate()?;

    let span = tracing::info_span!("watch_lines", path = %config.path.display(), job = %config.job);
    let _guard = span.enter();

    let mut buffer = AggregationBuffer::new(config.aggregate, false);

    // Pre-fill from the lines already in the file. With flush_existing the
    // whole backlog goes out as one immediate batch, bypassing the
    // aggregation threshold; the live tail resumes directly after the last
    // consumed line either way.
    let mut start = TailStart::End;
    if config.use_existing {
        let existing = backlog::existing_lines(&config.path)?;
        start = TailStart::Offset(existing.offset);
        tracing::info!(lines = existing.lines.len(), "loaded existing lines");

        if config.flush_existing {
            if !existing.lines.is_empty() {
                dispatch(sink, &config.job, &config.data_key, existing.lines)?;
            }
        } else {
            for line in existing.lines {
                buffer.push(line);
            }
            while buffer.ready() {
                dispatch(sink, &config.job, &config.data_key, buffer.take_batch())?;
            }
        }
    }

    let mut tail = LineTail::open(&config.path, start)?;
    tracing::info!("watching for new lines");

    let poll = config.poll_interval();
    let mut poller = StopPoller::new(config.stop_polling_rate);

    loop {
        match tail.try_next()? {
            Some(line) => {
                buffer.push(line);

                if poller.observe() && stop.is_stopped() {
                    break;
                }

                while buffer.ready() {
                    dispatch(sink, &config.job, &config.data_key, buffer.take_batch())?;
                }
            }
            None => {
                if stop.is_stopped() {
                    break;
                }
                thread::sleep(poll);
            }
        }
    }

    tracing::info!("stop signal observed, ending watch session");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poller_checks_every_rate_plus_one_observations() {
        let mut poller = StopPoller::new(2);

        let checks: Vec<bool> = (0..9).map(|_| poller.observe()).collect();
        assert_eq!(
            checks,
            vec![false, false, true, false, false, true, false, false, true]
        );
    }

    #[test]
    fn test_poller_rate_one() {
        let mut poller = StopPoller::new(1);

        assert!(!poller.observe());
        assert!(poller.observe());
        assert!(!poller.observe());
        assert!(poller.observe());
    }
}
