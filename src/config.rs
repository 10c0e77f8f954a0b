use anyhow::{anyhow, Context, Result};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://0kadddxyh3.execute-api.us-east-1.amazonaws.com";
const DEFAULT_GRAPHQL_PATH: &str = "/graphql";
const DEFAULT_TOKEN_TTL_MINUTES: u64 = 50;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    GraphQl,
    Rest,
}

impl FromStr for Transport {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "graphql" | "gql" => Ok(Transport::GraphQl),
            "rest" => Ok(Transport::Rest),
            _ => Err(anyhow!("transport must be 'graphql' or 'rest', got '{}'", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: String,
    pub transport: Transport,
    pub graphql_path: String,
    pub token_ttl: Duration,
}

impl CatalogConfig {
    pub fn new(base_url: impl Into<String>, transport: Transport) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            transport,
            graphql_path: DEFAULT_GRAPHQL_PATH.to_string(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_MINUTES * 60),
        }
    }

    pub fn graphql_url(&self) -> String {
        format!("{}{}", self.base_url, self.graphql_path)
    }

    pub fn token_url(&self) -> String {
        format!("{}/auth/token", self.base_url)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let base_url = env_or("CATALOG_BASE_URL", DEFAULT_BASE_URL);
        let transport: Transport = env_or("CATALOG_TRANSPORT", "graphql")
            .parse()
            .context("Invalid CATALOG_TRANSPORT")?;

        let mut catalog = CatalogConfig::new(base_url, transport);

        let graphql_path = env_or("CATALOG_GRAPHQL_PATH", DEFAULT_GRAPHQL_PATH);
        catalog.graphql_path = if graphql_path.starts_with('/') {
            graphql_path
        } else {
            format!("/{}", graphql_path)
        };

        let ttl_minutes: u64 = env_or("TOKEN_TTL_MINUTES", &DEFAULT_TOKEN_TTL_MINUTES.to_string())
            .parse()
            .context("TOKEN_TTL_MINUTES must be a whole number of minutes")?;
        if ttl_minutes == 0 {
            anyhow::bail!("TOKEN_TTL_MINUTES must be greater than zero");
        }
        catalog.token_ttl = Duration::from_secs(ttl_minutes * 60);

        let bind_addr = env_or("BIND_ADDR", DEFAULT_BIND_ADDR)
            .parse()
            .context("Invalid BIND_ADDR")?;

        Ok(Self { catalog, bind_addr })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transport_names() {
        assert_eq!("GraphQL".parse::<Transport>().unwrap(), Transport::GraphQl);
        assert_eq!(" rest ".parse::<Transport>().unwrap(), Transport::Rest);
        assert!("soap".parse::<Transport>().is_err());
    }

    #[test]
    fn catalog_urls_strip_trailing_slash() {
        let cfg = CatalogConfig::new("http://localhost:8080/", Transport::GraphQl);
        assert_eq!(cfg.graphql_url(), "http://localhost:8080/graphql");
        assert_eq!(cfg.token_url(), "http://localhost:8080/auth/token");
        assert_eq!(cfg.token_ttl, Duration::from_secs(50 * 60));
    }
}
