use clap::Parser;
use anyhow::{Context, Result};

use flowtrigger::{
    cli::{Cli, Command},
    config::{DirWatchConfig, FileConfig, LineWatchConfig},
    dispatch::{CommandSink, CtrlcSignal, DispatchSink, StdoutSink},
    fsops,
    session::{run_dir_session, run_line_session},
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.setup_logging();

    match cli.command {
        Command::WatchDir(args) => {
            let mut config = args.to_config();
            config.apply_env();
            watch_dir(&config, args.exec.as_deref())?;
        }
        Command::WatchLines(args) => {
            let mut config = args.to_config();
            config.apply_env();
            watch_lines(&config, args.exec.as_deref())?;
        }
        Command::Run(args) => {
            let file = FileConfig::load(&args.config)
                .with_context(|| format!("failed to load {}", args.config.display()))?;
            match (file.watch_dir, file.watch_lines) {
                (Some(_), Some(_)) => {
                    anyhow::bail!("config file must hold exactly one watch section")
                }
                (Some(mut config), None) => {
                    config.apply_env();
                    watch_dir(&config, args.exec.as_deref())?;
                }
                (None, Some(mut config)) => {
                    config.apply_env();
                    watch_lines(&config, args.exec.as_deref())?;
                }
                (None, None) => {
                    anyhow::bail!("config file holds no [watch_dir] or [watch_lines] section")
                }
            }
        }
        Command::Mkdir { paths } => fsops::make_dirs(&paths)?,
        Command::Copy { mut paths } => {
            let destination = paths
                .pop()
                .context("copy needs at least one source and a destination")?;
            fsops::copy(&paths, &destination)?;
        }
        Command::Move { mut paths } => {
            let destination = paths
                .pop()
                .context("move needs at least one source and a destination")?;
            fsops::move_paths(&paths, &destination)?;
        }
        Command::Chmod {
            mode,
            paths,
            no_recursive,
            only_dirs,
        } => fsops::chmod(&paths, &mode, !no_recursive, only_dirs)?,
        Command::Chown {
            paths,
            user,
            group,
            no_recursive,
            only_dirs,
        } => fsops::chown(
            &paths,
            user.as_deref(),
            group.as_deref(),
            !no_recursive,
            only_dirs,
        )?,
        Command::Glob {
            paths,
            pattern,
            recursive,
            names_only,
        } => {
            for file in fsops::glob_files(&paths, &pattern, recursive, names_only)? {
                println!("{file}");
            }
        }
    }

    Ok(())
}

fn make_sink(exec: Option<&str>) -> Result<Box<dyn DispatchSink>> {
    Ok(match exec {
        Some(command) => Box::new(CommandSink::new(command)?),
        None => Box::new(StdoutSink),
    })
}

fn watch_dir(config: &DirWatchConfig, exec: Option<&str>) -> Result<()> {
    let mut sink = make_sink(exec)?;
    let stop = CtrlcSignal::install().context("failed to install Ctrl-C handler")?;

    tracing::info!("starting directory watch on {}", config.path.display());
    run_dir_session(config, sink.as_mut(), &stop)?;
    Ok(())
}

fn watch_lines(config: &LineWatchConfig, exec: Option<&str>) -> Result<()> {
    let mut sink = make_sink(exec)?;
    let stop = CtrlcSignal::install().context("failed to install Ctrl-C handler")?;

    tracing::info!("starting line watch on {}", config.path.display());
    run_line_session(config, sink.as_mut(), &stop)?;
    Ok(())
}
