use anyhow::{bail, Context, Result};
use glob::glob;
use std::{env, time::Duration};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_N_REDUCE: u32 = 10;
pub const DEFAULT_LEASE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REAPER_INTERVAL_MS: u64 = 500;
pub const DEFAULT_DONE_GRACE_SECS: u64 = 3;

#[derive(Debug, Clone)]
pub struct MasterConfig {
    pub listen_addr: String,
    pub n_reduce: u32,
    pub lease_timeout: Duration,
    pub reaper_interval: Duration,
    /// Tiempo que el master sigue respondiendo JOB_DONE antes de apagarse
    pub done_grace: Duration,
}

impl MasterConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let n_reduce = parse_or(&lookup, "MR_N_REDUCE", DEFAULT_N_REDUCE)?;
        if n_reduce == 0 {
            bail!("MR_N_REDUCE debe ser mayor que 0");
        }

        Ok(Self {
            listen_addr: lookup("MR_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            n_reduce,
            lease_timeout: Duration::from_secs(parse_or(
                &lookup,
                "MR_LEASE_TIMEOUT_SECS",
                DEFAULT_LEASE_TIMEOUT_SECS,
            )?),
            reaper_interval: Duration::from_millis(parse_or(
                &lookup,
                "MR_REAPER_INTERVAL_MS",
                DEFAULT_REAPER_INTERVAL_MS,
            )?),
            done_grace: Duration::from_secs(parse_or(&lookup, "MR_DONE_GRACE_SECS", DEFAULT_DONE_GRACE_SECS)?),
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

/// Expande los argumentos de entrada. Cada uno puede ser una ruta o un patrón
/// glob; el orden de los argumentos define los ids de las tareas map.
pub fn expand_inputs(args: &[String]) -> Result<Vec<String>> {
    let mut inputs = Vec::new();

    for pattern in args {
        let mut matched = 0;
        for entry in glob(pattern).with_context(|| format!("patrón inválido: {}", pattern))? {
            let path = entry?;
            if path.is_file() {
                inputs.push(path.to_string_lossy().to_string());
                matched += 1;
            }
        }
        if matched == 0 {
            bail!("ningún archivo coincide con {}", pattern);
        }
    }

    Ok(inputs)
}
