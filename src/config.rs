//! Configuration management for DevChain

use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub chain: ChainConfig,
}

#[derive(Debug, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Seal a block immediately after every executed transaction.
    #[serde(default = "default_auto_mine")]
    pub auto_mine: bool,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            port: default_rpc_port(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            auto_mine: default_auto_mine(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            chain: ChainConfig::default(),
        }
    }
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    let config_str = fs::read_to_string("config.toml").unwrap_or_default();
    let config: Config = if config_str.is_empty() {
        // Sane defaults when config.toml is absent
        Config::default()
    } else {
        toml::from_str(&config_str)?
    };

    if config.rpc.port == 0 {
        return Err("rpc.port must be non-zero in config.toml".into());
    }
    if config.chain.chain_id == 0 {
        return Err("chain.chain_id must be non-zero in config.toml".into());
    }

    Ok(config)
}

fn default_rpc_port() -> u16 {
    8011
}

fn default_chain_id() -> u64 {
    260
}

fn default_auto_mine() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.rpc.port, 8011);
        assert_eq!(config.chain.chain_id, 260);
        assert!(config.chain.auto_mine);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[chain]\nauto_mine = false\n").unwrap();
        assert!(!config.chain.auto_mine);
        assert_eq!(config.rpc.port, 8011);
    }
}
