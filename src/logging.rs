#![forbid(unsafe_code)]

//! File-backed tracing. The terminal belongs to the UI, so nothing is
//! written to stdout or stderr once a session starts.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::{self, LogConfig};
use crate::error::TodogenError;

/// Keeps the background writer alive; drop it last to flush pending lines.
#[derive(Debug)]
pub struct LogGuard {
    _worker: WorkerGuard,
    pub path: PathBuf,
}

/// `RUST_LOG` wins, then the CLI override, then `log.level` from config.
#[must_use]
pub fn resolve_filter(env: Option<&str>, cli_level: Option<&str>, cfg_level: &str) -> EnvFilter {
    env.and_then(|s| EnvFilter::try_new(s).ok())
        .or_else(|| cli_level.and_then(|s| EnvFilter::try_new(s).ok()))
        .or_else(|| EnvFilter::try_new(cfg_level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

pub fn init(cfg: &LogConfig, cli_level: Option<&str>) -> anyhow::Result<LogGuard> {
    let path = config::expand_path(&cfg.file)?;
    let (dir, file_name) = split_log_path(&path)?;
    std::fs::create_dir_all(&dir).map_err(|source| TodogenError::IoPath {
        path: dir.clone(),
        source,
    })?;

    let appender = tracing_appender::rolling::never(&dir, file_name);
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let env = std::env::var("RUST_LOG").ok();
    let filter = resolve_filter(env.as_deref(), cli_level, &cfg.level);

    let init_result = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .try_init();
    if let Err(err) = init_result {
        tracing::debug!(error = %err, "tracing subscriber already set, continuing");
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), log = %path.display(), "todogen starting");
    Ok(LogGuard {
        _worker: worker,
        path,
    })
}

fn split_log_path(path: &Path) -> Result<(PathBuf, String), TodogenError> {
    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .ok_or_else(|| TodogenError::Config(format!("log.file '{}' has no file name", path.display())))?;
    let dir = path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    Ok((dir, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_precedence() {
        assert_eq!(
            resolve_filter(Some("debug"), Some("warn"), "info").to_string(),
            "debug"
        );
        assert_eq!(
            resolve_filter(None, Some("warn"), "info").to_string(),
            "warn"
        );
        assert_eq!(resolve_filter(None, None, "error").to_string(), "error");
        assert_eq!(
            resolve_filter(Some("[[bad"), None, "trace").to_string(),
            "trace"
        );
    }

    #[test]
    fn splits_log_path() {
        let (dir, name) = split_log_path(Path::new("/tmp/todogen/todogen.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/todogen"));
        assert_eq!(name, "todogen.log");
        assert!(split_log_path(Path::new("/")).is_err());
    }

    #[test]
    fn init_creates_log_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("nested").join("todogen.log");
        let cfg = LogConfig {
            file: file.to_string_lossy().to_string(),
            level: "debug".to_owned(),
        };
        let guard = init(&cfg, None).unwrap();
        assert_eq!(guard.path, file);
        assert!(file.parent().unwrap().is_dir());
    }
}
