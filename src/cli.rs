use std::path::PathBuf;
use clap::{Args, Parser, Subcommand};

use crate::config::{DirWatchConfig, LineWatchConfig};

#[derive(Parser)]
#[command(name = "flowtrigger")]
#[command(version)]
#[command(about = "Filesystem trigger engine: watch directories and files, aggregate changes, dispatch batched payloads to downstream jobs")]
#[command(long_about = "flowtrigger watches a directory tree for file changes or a text file for appended lines, aggregates them into batches, and triggers a named downstream job with each batch. It also ships the single-pass path helpers a trigger pipeline needs: mkdir, copy, move, chmod, chown and glob.")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Watch a directory and trigger a job per aggregated batch of file changes
    WatchDir(WatchDirArgs),
    /// Watch a file for appended lines and trigger a job per aggregated batch
    WatchLines(WatchLinesArgs),
    /// Run the watch session described by a TOML config file
    Run(RunArgs),
    /// Create directories if they do not exist yet
    Mkdir {
        #[arg(value_name = "PATH", required = true, help = "Absolute directory paths to create")]
        paths: Vec<PathBuf>,
    },
    /// Copy files or directory trees; the last path is the destination
    Copy {
        #[arg(value_name = "PATH", num_args = 2.., help = "One or more sources followed by the destination")]
        paths: Vec<PathBuf>,
    },
    /// Move files or directory trees; the last path is the destination
    Move {
        #[arg(value_name = "PATH", num_args = 2.., help = "One or more sources followed by the destination")]
        paths: Vec<PathBuf>,
    },
    /// Set POSIX permissions on files and directories
    Chmod {
        #[arg(value_name = "MODE", help = "Octal permission string, e.g. 755")]
        mode: String,
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
        /// Do not descend into directories
        #[arg(long)]
        no_recursive: bool,
        /// Only change directories, leave files alone
        #[arg(long)]
        only_dirs: bool,
    },
    /// Set the ownership of files and directories
    Chown {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
        /// New owner, as a user name or numeric uid
        #[arg(short, long)]
        user: Option<String>,
        /// New group, as a group name or numeric gid
        #[arg(short, long)]
        group: Option<String>,
        /// Do not descend into directories
        #[arg(long)]
        no_recursive: bool,
        /// Only change directories, leave files alone
        #[arg(long)]
        only_dirs: bool,
    },
    /// List files matching a glob pattern under the given paths
    Glob {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
        /// Glob style pattern to match
        #[arg(short, long, default_value = "*")]
        pattern: String,
        /// Apply the pattern at every depth
        #[arg(short, long)]
        recursive: bool,
        /// Print bare file names instead of full paths
        #[arg(long)]
        names_only: bool,
    },
}

#[derive(Args)]
pub struct WatchDirArgs {
    /// Directory to watch for changes (must be absolute)
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Name of the downstream job to trigger
    #[arg(short, long)]
    pub job: String,

    /// Do not watch subdirectories
    #[arg(long)]
    pub no_recursive: bool,

    /// Listen for file creation events
    #[arg(long)]
    pub on_create: bool,

    /// Do not listen for file closing events
    #[arg(long)]
    pub no_close: bool,

    /// Listen for file deletion events
    #[arg(long)]
    pub on_delete: bool,

    /// Listen for file move events
    #[arg(long)]
    pub on_move: bool,

    /// Number of events aggregated before the job is triggered
    #[arg(long, default_value = "1", value_name = "N")]
    pub aggregate: usize,

    /// Drop paths already waiting in the buffer
    #[arg(long)]
    pub dedupe: bool,

    /// Seed the buffer with the files already under the path
    #[arg(long)]
    pub use_existing: bool,

    /// Key under which the file list is stored in the payload
    #[arg(long, default_value = "files", value_name = "KEY")]
    pub data_key: String,

    /// Sleep this many milliseconds after each delivered event
    #[arg(long, value_name = "MS")]
    pub throttle_ms: Option<u64>,

    /// Number of observed events between stop-signal checks
    #[arg(long, default_value = "2", value_name = "N")]
    pub stop_polling_rate: usize,

    /// Command to run per dispatch instead of printing JSON
    #[arg(long, value_name = "CMD")]
    pub exec: Option<String>,
}

impl WatchDirArgs {
    pub fn to_config(&self) -> DirWatchConfig {
        let mut config = DirWatchConfig::new(self.path.clone(), self.job.clone());
        config.recursive = !self.no_recursive;
        config.on_create = self.on_create;
        config.on_close = !self.no_close;
        config.on_delete = self.on_delete;
        config.on_move = self.on_move;
        config.aggregate = self.aggregate;
        config.dedupe = self.dedupe;
        config.use_existing = self.use_existing;
        config.data_key = self.data_key.clone();
        config.throttle_ms = self.throttle_ms;
        config.stop_polling_rate = self.stop_polling_rate;
        config
    }
}

#[derive(Args)]
pub struct WatchLinesArgs {
    /// File to watch for new lines (must be absolute)
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Name of the downstream job to trigger
    #[arg(short, long)]
    pub job: String,

    /// Number of lines aggregated before the job is triggered
    #[arg(long, default_value = "1", value_name = "N")]
    pub aggregate: usize,

    /// Start from the lines already in the file
    #[arg(long)]
    pub use_existing: bool,

    /// With --use-existing, buffer pre-existing lines instead of flushing
    /// them as one immediate batch
    #[arg(long)]
    pub no_flush_existing: bool,

    /// Key under which the line list is stored in the payload
    #[arg(long, default_value = "lines", value_name = "KEY")]
    pub data_key: String,

    /// Sleep this many milliseconds between unsuccessful read attempts
    #[arg(long, default_value = "500", value_name = "MS")]
    pub poll_ms: u64,

    /// Number of observed lines between stop-signal checks
    #[arg(long, default_value = "2", value_name = "N")]
    pub stop_polling_rate: usize,

    /// Command to run per dispatch instead of printing JSON
    #[arg(long, value_name = "CMD")]
    pub exec: Option<String>,
}

impl WatchLinesArgs {
    pub fn to_config(&self) -> LineWatchConfig {
        let mut config = LineWatchConfig::new(self.path.clone(), self.job.clone());
        config.aggregate = self.aggregate;
        config.use_existing = self.use_existing;
        config.flush_existing = !self.no_flush_existing;
        config.data_key = self.data_key.clone();
        config.poll_ms = self.poll_ms;
        config.stop_polling_rate = self.stop_polling_rate;
        config
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// TOML config file holding a [watch_dir] or [watch_lines] section
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Command to run per dispatch instead of printing JSON
    #[arg(long, value_name = "CMD")]
    pub exec: Option<String>,
}

impl Cli {
    pub fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_dir_defaults() {
        let cli = Cli::try_parse_from(["flowtrigger", "watch-dir", "/data/in", "--job", "ingest"])
            .expect("parse failed");

        let Command::WatchDir(args) = cli.command else {
            panic!("expected watch-dir command");
        };
        let config = args.to_config();

        assert!(config.recursive);
        assert!(config.on_close);
        assert!(!config.on_create);
        assert_eq!(config.aggregate, 1);
        assert_eq!(config.data_key, "files");
        assert!(args.exec.is_none());
    }

    #[test]
    fn test_watch_lines_flags() {
        let cli = Cli::try_parse_from([
            "flowtrigger",
            "watch-lines",
            "/var/log/app.log",
            "--job",
            "ingest",
            "--aggregate",
            "5",
            "--use-existing",
            "--no-flush-existing",
        ])
        .expect("parse failed");

        let Command::WatchLines(args) = cli.command else {
            panic!("expected watch-lines command");
        };
        let config = args.to_config();

        assert_eq!(config.aggregate, 5);
        assert!(config.use_existing);
        assert!(!config.flush_existing);
        assert_eq!(config.poll_ms, 500);
    }

    #[test]
    fn test_copy_requires_two_paths() {
        let result = Cli::try_parse_from(["flowtrigger", "copy", "/only/one"]);
        assert!(result.is_err());
    }
}
