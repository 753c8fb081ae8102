use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "changeme", "secret"];

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// JSON array of `{name, measurement_unit}` loaded into the catalog at startup.
    pub ingredients_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("PANTRY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() {
            bail!("PANTRY_JWT_SECRET must be set");
        }
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("PANTRY_JWT_SECRET is still a placeholder value");
        }

        let db_path = var("PANTRY_DB_PATH").unwrap_or_else(|| "pantry.db".into());
        let host = var("PANTRY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = var("PANTRY_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("PANTRY_PORT must be a port number")?;
        let ingredients_path = var("PANTRY_INGREDIENTS_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            db_path: PathBuf::from(db_path),
            host,
            port,
            jwt_secret,
            ingredients_path,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = load(&[("PANTRY_JWT_SECRET", "s3cr3t-value")]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("pantry.db"));
        assert_eq!(config.port, 3000);
        assert!(config.ingredients_path.is_none());
        assert_eq!(config.addr().unwrap().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn missing_or_placeholder_secret_is_rejected() {
        assert!(load(&[]).is_err());
        assert!(load(&[("PANTRY_JWT_SECRET", "  ")]).is_err());
        assert!(load(&[("PANTRY_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn overrides_are_read() {
        let config = load(&[
            ("PANTRY_JWT_SECRET", "s3cr3t-value"),
            ("PANTRY_HOST", "127.0.0.1"),
            ("PANTRY_PORT", "9090"),
            ("PANTRY_INGREDIENTS_PATH", "data/ingredients.json"),
        ])
        .unwrap();
        assert_eq!(config.addr().unwrap().to_string(), "127.0.0.1:9090");
        assert_eq!(
            config.ingredients_path,
            Some(PathBuf::from("data/ingredients.json"))
        );
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(load(&[("PANTRY_JWT_SECRET", "s3cr3t-value"), ("PANTRY_PORT", "http")]).is_err());
    }
}
