use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use serde_json::{json, Value};

use crate::error::TriggerError;

/// Downstream trigger for a named job.
///
/// Implementations must be fire-and-continue: the call hands the batch off
/// and returns without waiting for the job to finish, so the watch loop can
/// observe the next event immediately. A returned error is fatal to the
/// session; a lost trigger cannot be redelivered without risking duplicate
/// side effects downstream.
pub trait DispatchSink {
    fn run_job(&mut self, job: &str, payload: &Value) -> Result<(), TriggerError>;
}

/// External stop predicate polled by the watch loop.
pub trait StopSignal {
    fn is_stopped(&self) -> bool;
}

impl StopSignal for Arc<AtomicBool> {
    fn is_stopped(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

/// Build the dispatch payload: the ordered batch under the configured key.
pub fn batch_payload(data_key: &str, items: &[String]) -> Value {
    json!({ data_key: items })
}

/// Stop signal flipped by Ctrl-C.
pub struct CtrlcSignal {
    stopped: Arc<AtomicBool>,
}

impl CtrlcSignal {
    pub fn install() -> Result<Self, ctrlc::Error> {
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = stopped.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })?;
        Ok(Self { stopped })
    }
}

impl StopSignal for CtrlcSignal {
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Prints one JSON object per dispatch, for piping into other tools.
pub struct StdoutSink;

impl DispatchSink for StdoutSink {
    fn run_job(&mut self, job: &str, payload: &Value) -> Result<(), TriggerError> {
        println!("{}", json!({ "job": job, "data": payload }));
        Ok(())
    }
}

/// Spawns a command per dispatch without waiting on it. The job name is
/// appended as the last argument and the payload JSON is written to the
/// child's stdin. Finished children are reaped on later dispatches.
pub struct CommandSink {
    program: String,
    args: Vec<String>,
    children: Vec<Child>,
}

impl CommandSink {
    pub fn new(command: &str) -> Result<Self, TriggerError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| TriggerError::config("exec command is empty"))?;
        Ok(Self {
            program,
            args: parts.collect(),
            children: Vec::new(),
        })
    }

    fn reap(&mut self) {
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() {
                    tracing::warn!("dispatched command exited with {}", status);
                }
                false
            }
            Ok(None) => true,
            Err(err) => {
                tracing::warn!("failed to poll dispatched command: {}", err);
                false
            }
        });
    }
}

impl DispatchSink for CommandSink {
    fn run_job(&mut self, job: &str, payload: &Value) -> Result<(), TriggerError> {
        self.reap();

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(job)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|err| {
                TriggerError::dispatch(job, format!("failed to spawn '{}': {}", self.program, err))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(payload.to_string().as_bytes())
                .and_then(|_| stdin.write_all(b"\n"))
                .map_err(|err| {
                    TriggerError::dispatch(job, format!("failed to write payload: {}", err))
                })?;
        }

        self.children.push(child);
        Ok(())
    }
}

impl Drop for CommandSink {
    fn drop(&mut self) {
        self.reap();
    }
}
