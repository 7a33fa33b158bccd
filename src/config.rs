use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
};

/// Optional JSON file holding a [`ServerConfig`]; environment variables win.
pub const CONFIG_ENV: &str = "REPLAY_CONFIG";

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Root of the session store; handed to the store at construction.
    pub cache_dir: PathBuf,
    pub allowed_origins: Vec<String>,
    pub first_season: i32,
    pub latest_season: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            cache_dir: PathBuf::from("cache"),
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
            first_season: 2018,
            latest_season: 2025,
        }
    }
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("invalid config JSON in {}", path.display()))
    }

    /// Build a config from defaults, an optional file named by `REPLAY_CONFIG`
    /// and variable overrides, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(addr) = lookup("BIND_ADDR") {
            cfg.bind_addr = addr
                .parse()
                .with_context(|| format!("BIND_ADDR is not a socket address: {}", addr))?;
        }
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .parse()
                .with_context(|| format!("PORT is not a port number: {}", port))?;
            cfg.bind_addr.set_port(port);
        }
        if let Some(dir) = lookup("CACHE_DIR") {
            cfg.cache_dir = PathBuf::from(dir);
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            cfg.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(year) = lookup("LATEST_SEASON") {
            cfg.latest_season = year
                .parse()
                .with_context(|| format!("LATEST_SEASON is not a year: {}", year))?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.first_season > self.latest_season {
            bail!(
                "first season {} is after latest season {}",
                self.first_season,
                self.latest_season
            );
        }
        Ok(())
    }

    /// Every season with replay data, oldest first.
    pub fn seasons(&self) -> Vec<i32> {
        (self.first_season..=self.latest_season).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.bind_addr.port(), 8000);
        assert_eq!(cfg.seasons().first(), Some(&2018));
        assert_eq!(cfg.seasons().last(), Some(&2025));
    }

    #[test]
    fn test_env_overrides() {
        let cfg = ServerConfig::from_lookup(lookup(&[
            ("PORT", "9001"),
            ("CACHE_DIR", "/var/cache/replay"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("LATEST_SEASON", "2026"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9001);
        assert_eq!(cfg.cache_dir, PathBuf::from("/var/cache/replay"));
        assert_eq!(cfg.allowed_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(cfg.seasons().len(), 9);
    }

    #[test]
    fn test_invalid_values() {
        assert!(ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("LATEST_SEASON", "2010")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("BIND_ADDR", "nowhere")])).is_err());
    }

    #[test]
    fn test_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.json");
        fs::write(&path, r#"{"bind_addr": "127.0.0.1:7000", "latest_season": 2024}"#).unwrap();

        let cfg = ServerConfig::from_lookup(lookup(&[
            (CONFIG_ENV, path.to_str().unwrap()),
            ("PORT", "7100"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:7100".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.latest_season, 2024);
        assert_eq!(cfg.first_season, 2018);

        fs::write(&path, "{").unwrap();
        assert!(ServerConfig::from_lookup(lookup(&[(CONFIG_ENV, path.to_str().unwrap())])).is_err());
    }
}
