use std::{
    fs, io,
    net::SocketAddr,
    panic,
    path::{Path, PathBuf},
    thread,
    time::{Duration, SystemTime},
};
use tokio::net::TcpListener;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Where and how long a service keeps its rolling log files.
#[derive(Clone, Debug)]
pub struct LogConfig {
    pub service_name: String,
    pub log_dir: PathBuf,
    pub retention_days: u64,
    pub cleanup_interval_minutes: u64,
}

impl LogConfig {
    pub fn new(service_name: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            service_name: service_name.into(),
            log_dir: log_dir.into(),
            retention_days: 14,
            cleanup_interval_minutes: 360,
        }
    }

    fn log_root(&self) -> PathBuf {
        self.log_dir.join(&self.service_name)
    }
}

/// Keeps the non-blocking file writer alive; drop it last so buffered lines flush.
pub struct TracingGuards {
    _file_guard: Option<WorkerGuard>,
}

impl TracingGuards {
    pub fn has_file_output(&self) -> bool {
        self._file_guard.is_some()
    }
}

pub fn init_tracing(config: &LogConfig) -> TracingGuards {
    // RUST_LOG still narrows or widens the filter; everything else is fixed.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_root = config.log_root();
    let stdout_layer = fmt::layer().with_writer(io::stdout);
    let mut file_guard: Option<WorkerGuard> = None;
    let mut file_layer = None;

    if fs::create_dir_all(&log_root).is_ok() {
        let file_name = format!("{}.log", config.service_name);
        let appender = panic::catch_unwind(|| {
            tracing_appender::rolling::daily(&log_root, file_name.as_str())
        })
        .ok();

        if let Some(appender) = appender {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            file_layer = Some(fmt::layer().with_ansi(false).with_writer(writer));
            file_guard = Some(guard);
        }
    }

    if let Some(layer) = file_layer {
        let subscriber = Registry::default()
            .with(filter)
            .with(stdout_layer)
            .with(layer);
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = Registry::default().with(filter).with(stdout_layer);
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    if file_guard.is_some() {
        spawn_log_cleanup(
            log_root,
            config.retention_days,
            config.cleanup_interval_minutes,
        );
    }

    TracingGuards {
        _file_guard: file_guard,
    }
}

fn spawn_log_cleanup(log_root: PathBuf, retention_days: u64, cleanup_interval_minutes: u64) {
    if retention_days == 0 || cleanup_interval_minutes == 0 {
        return;
    }

    let retention = Duration::from_secs(retention_days * 24 * 60 * 60);
    let interval = Duration::from_secs(cleanup_interval_minutes * 60);

    thread::spawn(move || loop {
        if let Some(cutoff) = SystemTime::now().checked_sub(retention) {
            cleanup_old_logs(&log_root, cutoff);
        }
        thread::sleep(interval);
    });
}

fn cleanup_old_logs(root: &Path, cutoff: SystemTime) -> usize {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            removed += cleanup_old_logs(&path, cutoff);
            continue;
        }
        let modified = match fs::metadata(&path).and_then(|metadata| metadata.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };
        if modified < cutoff && fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    removed
}

/// Binds on all interfaces.
pub async fn bind_listener(port: u16) -> io::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr).await
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "sigterm handler unavailable");
                ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }

    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(test_name: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "understanding_common_{test_name}_{}_{nonce}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn log_root_nests_service_name() {
        let config = LogConfig::new("collector", "/tmp/logs");
        assert_eq!(config.log_root(), PathBuf::from("/tmp/logs/collector"));
        assert_eq!(config.retention_days, 14);
    }

    #[test]
    fn cleanup_removes_only_files_older_than_cutoff() {
        let root = temp_dir("cleanup");
        let nested = root.join("nested");
        fs::create_dir_all(&nested).expect("create nested dir");
        fs::write(root.join("a.log"), "a").expect("write a");
        fs::write(nested.join("b.log"), "b").expect("write b");

        let past = SystemTime::now() - Duration::from_secs(3600);
        assert_eq!(cleanup_old_logs(&root, past), 0);
        assert!(root.join("a.log").exists());

        let future = SystemTime::now() + Duration::from_secs(3600);
        assert_eq!(cleanup_old_logs(&root, future), 2);
        assert!(!nested.join("b.log").exists());

        let _ = fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn binds_ephemeral_port() {
        let listener = bind_listener(0).await.expect("bind");
        assert_ne!(listener.local_addr().expect("local addr").port(), 0);
    }
}
