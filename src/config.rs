use std::env;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::tron::ExecutionParams;

/// Bridge configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// TRON full-node base URL, without trailing slash
    pub tron_base_endpoint: String,
    /// Hex private key of the bridge signer
    pub private_key: String,
    /// TronGrid API key, sent as `TRON-PRO-API-KEY`
    pub tron_pro_api_key: Option<String>,
    pub execution: ExecutionParams,
    /// Name given to deployed contracts
    pub contract_name: String,
    /// Foundry artifact supplying the deploy ABI
    pub artifact_path: Option<PathBuf>,
    pub bind_addr: IpAddr,
    pub port: u16,
    pub upstream_timeout: Duration,
    pub chain_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    /// Call dotenvy::dotenv() before calling this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let tron_base_endpoint = derive_base_endpoint(
            var("TRON_BASE_ENDPOINT").or_else(|| var("TRON_NODE_BASE")),
            var("TRON_RPC_URL"),
        )?;

        let private_key = var("TRON_PRIVATE_KEY")
            .or_else(|| var("PRIVATE_KEY"))
            .ok_or_else(|| anyhow!("TRON_PRIVATE_KEY (or PRIVATE_KEY) must be set"))?;

        let user_fee_percentage: u8 = parse_or(var("USER_FEE_PERCENTAGE"), 100, "USER_FEE_PERCENTAGE")?;
        if user_fee_percentage > 100 {
            return Err(anyhow!(
                "USER_FEE_PERCENTAGE must be between 0 and 100, got {}",
                user_fee_percentage
            ));
        }
        let execution = ExecutionParams {
            fee_limit_sun: parse_or(var("FEE_LIMIT_SUN"), 150_000_000, "FEE_LIMIT_SUN")?,
            origin_energy_limit: parse_or(
                var("ORIGIN_ENERGY_LIMIT"),
                10_000_000,
                "ORIGIN_ENERGY_LIMIT",
            )?,
            user_fee_percentage,
        };

        let artifact_path = var("FOUNDRY_ARTIFACT_PATH").map(PathBuf::from);
        let contract_name = var("CONTRACT_NAME")
            .or_else(|| {
                artifact_path
                    .as_ref()
                    .and_then(|p| p.file_stem())
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "Contract".to_string());

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| "127.0.0.1".to_string())
            .parse()
            .context("BIND_ADDR must be a valid IP address")?;

        Ok(Config {
            tron_base_endpoint,
            private_key,
            tron_pro_api_key: var("TRON_PRO_API_KEY"),
            execution,
            contract_name,
            artifact_path,
            bind_addr,
            port: parse_or(var("PORT"), 8545, "PORT")?,
            upstream_timeout: Duration::from_millis(parse_or(
                var("UPSTREAM_TIMEOUT_MS"),
                20_000,
                "UPSTREAM_TIMEOUT_MS",
            )?),
            chain_timeout: Duration::from_millis(parse_or(
                var("CHAIN_TIMEOUT_MS"),
                20_000,
                "CHAIN_TIMEOUT_MS",
            )?),
        })
    }

    /// TRON's Ethereum-compatible JSON-RPC endpoint, used for forwarded methods.
    pub fn upstream_url(&self) -> String {
        format!("{}/jsonrpc", self.tron_base_endpoint)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("tron_base_endpoint", &self.tron_base_endpoint)
            .field("private_key", &"<redacted>")
            .field(
                "tron_pro_api_key",
                &self.tron_pro_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("execution", &self.execution)
            .field("contract_name", &self.contract_name)
            .field("artifact_path", &self.artifact_path)
            .field("bind_addr", &self.bind_addr)
            .field("port", &self.port)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("chain_timeout", &self.chain_timeout)
            .finish()
    }
}

/// Base endpoint from an explicit base URL, or from `TRON_RPC_URL` with a
/// trailing `/jsonrpc`, `/wallet` or `/walletsolidity` removed.
fn derive_base_endpoint(base: Option<String>, rpc_url: Option<String>) -> Result<String> {
    let base = match (base, rpc_url) {
        (Some(base), _) => base,
        (None, Some(rpc)) => strip_api_suffix(&rpc),
        (None, None) => String::new(),
    };
    let base = base.trim_end_matches('/').to_string();

    if !base.starts_with("http") {
        return Err(anyhow!(
            "Missing or invalid TRON base endpoint {:?}; set TRON_BASE_ENDPOINT, e.g. https://nile.trongrid.io",
            base
        ));
    }
    Ok(base)
}

fn strip_api_suffix(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let lower = trimmed.to_ascii_lowercase();
    for suffix in ["/jsonrpc", "/walletsolidity", "/wallet"] {
        if lower.ends_with(suffix) {
            return trimmed[..trimmed.len() - suffix.len()].to_string();
        }
    }
    trimmed.to_string()
}

fn parse_or<T>(value: Option<String>, default: T, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v
            .parse()
            .with_context(|| format!("{} must be a valid number, got {:?}", name, v)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("TRON_BASE_ENDPOINT", "https://nile.trongrid.io/"),
            ("TRON_PRIVATE_KEY", KEY),
        ])
        .unwrap();

        assert_eq!(config.tron_base_endpoint, "https://nile.trongrid.io");
        assert_eq!(config.upstream_url(), "https://nile.trongrid.io/jsonrpc");
        assert_eq!(config.execution, ExecutionParams::default());
        assert_eq!(config.port, 8545);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1");
        assert_eq!(config.contract_name, "Contract");
        assert_eq!(config.upstream_timeout, Duration::from_secs(20));
        assert!(config.tron_pro_api_key.is_none());
    }

    #[test]
    fn test_endpoint_derived_from_rpc_url() {
        for (rpc, expected) in [
            ("https://api.trongrid.io/jsonrpc", "https://api.trongrid.io"),
            ("https://api.trongrid.io/wallet/", "https://api.trongrid.io"),
            ("https://host:8090/walletsolidity", "https://host:8090"),
            ("https://host/JSONRPC", "https://host"),
        ] {
            let config = load(&[("TRON_RPC_URL", rpc), ("PRIVATE_KEY", KEY)]).unwrap();
            assert_eq!(config.tron_base_endpoint, expected, "{}", rpc);
        }
    }

    #[test]
    fn test_explicit_base_wins_over_rpc_url() {
        let config = load(&[
            ("TRON_NODE_BASE", "http://localhost:9090"),
            ("TRON_RPC_URL", "https://api.trongrid.io/jsonrpc"),
            ("PRIVATE_KEY", KEY),
        ])
        .unwrap();
        assert_eq!(config.tron_base_endpoint, "http://localhost:9090");
    }

    #[test]
    fn test_missing_or_invalid_values() {
        assert!(load(&[("TRON_PRIVATE_KEY", KEY)]).is_err());
        assert!(load(&[("TRON_BASE_ENDPOINT", "nile.trongrid.io"), ("TRON_PRIVATE_KEY", KEY)]).is_err());
        assert!(load(&[("TRON_BASE_ENDPOINT", "https://nile.trongrid.io")]).is_err());
        assert!(load(&[
            ("TRON_BASE_ENDPOINT", "https://nile.trongrid.io"),
            ("TRON_PRIVATE_KEY", KEY),
            ("FEE_LIMIT_SUN", "lots"),
        ])
        .is_err());
        assert!(load(&[
            ("TRON_BASE_ENDPOINT", "https://nile.trongrid.io"),
            ("TRON_PRIVATE_KEY", KEY),
            ("USER_FEE_PERCENTAGE", "150"),
        ])
        .is_err());
    }

    #[test]
    fn test_contract_name_from_artifact_stem() {
        let config = load(&[
            ("TRON_BASE_ENDPOINT", "https://nile.trongrid.io"),
            ("TRON_PRIVATE_KEY", KEY),
            ("FOUNDRY_ARTIFACT_PATH", "out/Token.sol/Token.json"),
            ("TRON_PRO_API_KEY", "secret"),
        ])
        .unwrap();
        assert_eq!(config.contract_name, "Token");
        assert_eq!(config.tron_pro_api_key.as_deref(), Some("secret"));

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains(KEY));
        assert!(!rendered.contains("secret"));
    }
}
