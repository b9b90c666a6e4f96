use anyhow::{bail, Context, Result};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub ledger_url: String,
    pub data_path: String,
    pub bind_addr: String,
    pub confirm_timeout_secs: u64,
    pub confirm_poll_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let ledger_url = get("LEDGER_URL")?;
        let data_path =
            std::env::var("DATA_PATH").unwrap_or_else(|_| "data/datasets.json".to_string());
        let bind_addr =
            std::env::var("GATEWAY_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:4000".to_string());
        let confirm_timeout_secs = parse_or("LEDGER_CONFIRM_TIMEOUT_SECS", 30)?;
        let confirm_poll_ms = parse_or("LEDGER_CONFIRM_POLL_MS", 500)?;

        // Tiny sanity checks (fail fast, fail loud)
        if !ledger_url.starts_with("http://") && !ledger_url.starts_with("https://") {
            bail!("LEDGER_URL must start with http:// or https://");
        }
        if confirm_timeout_secs == 0 {
            bail!("LEDGER_CONFIRM_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            ledger_url,
            data_path,
            bind_addr,
            confirm_timeout_secs,
            confirm_poll_ms,
        })
    }
}

fn get(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Missing required env var: {key}"))
}

fn parse_or(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(v) => v
            .parse::<u64>()
            .with_context(|| format!("{key} must be an integer, got {v:?}")),
        Err(_) => Ok(default),
    }
}
