use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

/* ============================
   Limpieza de intermedios
   ============================ */

#[derive(Debug, Default)]
struct CleanupStats {
    removed: AtomicU64,
    failed: AtomicU64,
    retries: AtomicU64,
}

/// Contadores de la cola de limpieza en un instante dado.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupSnapshot {
    pub removed: u64,
    pub failed: u64,
    pub retries: u64,
}

/// Cola de borrado en segundo plano. `enqueue` nunca bloquea al loop del
/// worker; los errores se reintentan con backoff y quedan contados.
pub struct CleanupQueue {
    tx: mpsc::UnboundedSender<Vec<PathBuf>>,
    stats: Arc<CleanupStats>,
    handle: JoinHandle<()>,
}

impl CleanupQueue {
    pub fn spawn(attempts: u32, backoff: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(CleanupStats::default());
        let handle = tokio::spawn(drain(rx, stats.clone(), attempts.max(1), backoff));
        Self { tx, stats, handle }
    }

    pub fn enqueue(&self, paths: Vec<PathBuf>) {
        if paths.is_empty() {
            return;
        }
        if let Err(e) = self.tx.send(paths) {
            warn!("cola de limpieza cerrada, se descartan {} archivos", e.0.len());
        }
    }

    pub fn stats(&self) -> CleanupSnapshot {
        CleanupSnapshot {
            removed: self.stats.removed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            retries: self.stats.retries.load(Ordering::Relaxed),
        }
    }

    /// Cierra la cola y espera a que se procese todo lo pendiente.
    pub async fn shutdown(self) -> CleanupSnapshot {
        let CleanupQueue { tx, stats, handle } = self;
        drop(tx);
        if let Err(e) = handle.await {
            warn!("la tarea de limpieza terminó mal: {}", e);
        }
        CleanupSnapshot {
            removed: stats.removed.load(Ordering::Relaxed),
            failed: stats.failed.load(Ordering::Relaxed),
            retries: stats.retries.load(Ordering::Relaxed),
        }
    }
}

async fn drain(
    mut rx: mpsc::UnboundedReceiver<Vec<PathBuf>>,
    stats: Arc<CleanupStats>,
    attempts: u32,
    backoff: Duration,
) {
    while let Some(batch) = rx.recv().await {
        for path in batch {
            remove_with_retry(&path, attempts, backoff, &stats).await;
        }
    }
}

async fn remove_with_retry(path: &Path, attempts: u32, backoff: Duration, stats: &CleanupStats) {
    for attempt in 1..=attempts {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!("borrado {}", path.display());
                stats.removed.fetch_add(1, Ordering::Relaxed);
                return;
            }
            // otro worker (o un intento anterior) ya lo borró
            Err(e) if e.kind() == ErrorKind::NotFound => {
                stats.removed.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Err(e) => {
                warn!(
                    "no se pudo borrar {} (intento {}/{}): {}",
                    path.display(),
                    attempt,
                    attempts,
                    e
                );
                if attempt < attempts {
                    stats.retries.fetch_add(1, Ordering::Relaxed);
                    sleep(backoff * attempt).await;
                }
            }
        }
    }

    stats.failed.fetch_add(1, Ordering::Relaxed);
}
