pub mod backlog;
pub mod buffer;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod fsops;
pub mod session;
pub mod tail;
pub mod watcher;

pub use buffer::AggregationBuffer;
pub use config::{DirWatchConfig, FileConfig, LineWatchConfig};
pub use dispatch::{batch_payload, CommandSink, CtrlcSignal, DispatchSink, StdoutSink, StopSignal};
pub use error::{FsOpError, TriggerError};
pub use events::{ChangeKind, EventMask, FsChange};
pub use session::{run_dir_session, run_line_session};
pub use tail::{LineTail, TailStart};
pub use watcher::DirWatcher;
