use std::path::{Path, PathBuf};

use serde::Deserialize;

use world::WorldConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetSection {
    pub http_addr: String,
    pub cors_origin: String,
}

impl Default for NetSection {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            cors_origin: "*".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldSection {
    pub tick_rate: u32,
    pub zone_id: String,
    pub map_file: String,
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            tick_rate: 10,
            zone_id: "starter-zone".to_string(),
            map_file: "data/maps/starter-zone.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me".to_string(),
            token_ttl_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbSection {
    pub path: String,
}

impl Default for DbSection {
    fn default() -> Self {
        Self {
            path: "data/zone.db".to_string(),
        }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub net: NetSection,
    pub world: WorldSection,
    pub auth: AuthSection,
    pub db: DbSection,
}

impl ServerConfig {
    /// Load configuration from an optional TOML file path. A missing file
    /// falls back to defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = match config_path {
            Some(path) if Path::new(path).exists() => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            _ => Self::default(),
        };
        if config.world.tick_rate == 0 {
            return Err("world.tick_rate must be greater than zero".into());
        }
        Ok(config)
    }

    pub fn to_world_config(&self) -> WorldConfig {
        WorldConfig {
            zone_id: self.world.zone_id.clone(),
            tick_rate: self.world.tick_rate,
            map_file: if self.world.map_file.is_empty() {
                None
            } else {
                Some(PathBuf::from(&self.world.map_file))
            },
        }
    }
}

/// Parse CLI arguments and load config. Supports: --config <path>
pub fn parse_cli_args() -> ServerConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if let Some(val) = args.get(i + 1) {
                    config_path = Some(val.as_str());
                    i += 2;
                } else {
                    eprintln!("--config requires a path argument");
                    std::process::exit(1);
                }
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
    }

    match ServerConfig::load(config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load config: {}", err);
            std::process::exit(1);
        }
    }
}
