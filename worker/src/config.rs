use anyhow::{Context, Result};
use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_MASTER_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_APP: &str = "wordcount";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_MAX_TRANSPORT_FAILURES: u32 = 10;
pub const DEFAULT_CLEANUP_ATTEMPTS: u32 = 3;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub master_base_url: String,
    pub app: String,
    /// Directorio donde viven los intermedios y las salidas
    pub work_dir: PathBuf,
    pub poll_interval: Duration,
    /// Fallos de transporte seguidos antes de rendirse
    pub max_transport_failures: u32,
    pub cleanup_attempts: u32,
    pub cleanup_backoff: Duration,
    pub request_timeout: Duration,
    /// Reintentos del reporte de fin ante fallos de transporte
    pub report_retries: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            master_base_url: DEFAULT_MASTER_BASE_URL.to_string(),
            app: DEFAULT_APP.to_string(),
            work_dir: PathBuf::from("."),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_transport_failures: DEFAULT_MAX_TRANSPORT_FAILURES,
            cleanup_attempts: DEFAULT_CLEANUP_ATTEMPTS,
            cleanup_backoff: Duration::from_millis(100),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            report_retries: 3,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            master_base_url: lookup("MASTER_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.master_base_url),
            app: lookup("MR_APP").unwrap_or(defaults.app),
            work_dir: lookup("MR_WORK_DIR").map(PathBuf::from).unwrap_or(defaults.work_dir),
            poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "MR_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?),
            max_transport_failures: parse_or(
                &lookup,
                "MR_MAX_TRANSPORT_FAILURES",
                DEFAULT_MAX_TRANSPORT_FAILURES,
            )?
            .max(1),
            cleanup_attempts: parse_or(&lookup, "MR_CLEANUP_ATTEMPTS", DEFAULT_CLEANUP_ATTEMPTS)?.max(1),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "MR_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            ..defaults
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("valor inválido para {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn valores_por_defecto() {
        let cfg = WorkerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(cfg.master_base_url, "http://localhost:8080");
        assert_eq!(cfg.app, "wordcount");
        assert_eq!(cfg.work_dir, PathBuf::from("."));
        assert_eq!(cfg.poll_interval, Duration::from_millis(500));
        assert_eq!(cfg.max_transport_failures, 10);
        assert_eq!(cfg.cleanup_attempts, 3);
    }

    #[test]
    fn respeta_variables() {
        let cfg = WorkerConfig::from_lookup(lookup_from(&[
            ("MASTER_BASE_URL", "http://master:8080/"),
            ("MR_APP", "indexer"),
            ("MR_WORK_DIR", "/data/mr"),
            ("MR_POLL_INTERVAL_MS", "50"),
            ("MR_MAX_TRANSPORT_FAILURES", "0"),
        ]))
        .unwrap();

        assert_eq!(cfg.master_base_url, "http://master:8080");
        assert_eq!(cfg.app, "indexer");
        assert_eq!(cfg.work_dir, PathBuf::from("/data/mr"));
        assert_eq!(cfg.poll_interval, Duration::from_millis(50));
        // al menos un intento
        assert_eq!(cfg.max_transport_failures, 1);
    }

    #[test]
    fn rechaza_numeros_invalidos() {
        assert!(WorkerConfig::from_lookup(lookup_from(&[("MR_POLL_INTERVAL_MS", "rápido")])).is_err());
    }
}
