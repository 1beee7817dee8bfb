use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use arsim_types::{Address, Winston};

use crate::error::{ServerError, ServerResult};

pub const DEFAULT_PORT: u16 = 1984;
pub const DEFAULT_LIVE_RELOAD_PORT: u16 = 1985;
pub const DEFAULT_NETWORK: &str = "https://arweave.net";
pub const DEFAULT_DATA_DIR: &str = ".arsim";

/// Dev server settings, read from an optional `.json` or `.toml` file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ServeConfig {
    pub port: u16,
    pub live_reload_port: u16,
    /// Upstream node that unmatched requests are proxied to.
    pub network: String,
    pub data_dir: PathBuf,
    pub wallets: WalletsConfig,
    pub arql: ArqlConfig,
    /// Reserved for asset minification, which is not performed.
    pub package: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            live_reload_port: DEFAULT_LIVE_RELOAD_PORT,
            network: DEFAULT_NETWORK.into(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            wallets: WalletsConfig::default(),
            arql: ArqlConfig::default(),
            package: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WalletsConfig {
    /// Seed balances, in Winston.
    pub balances: BTreeMap<Address, Winston>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ArqlConfig {
    /// Also query the upstream network and merge its ids into local results.
    pub merge_external: bool,
}

impl ServeConfig {
    /// Load a config file. The format follows the extension; anything other
    /// than `.toml` is read as JSON.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("config file not readable: {}: {e}", path.display()))
        })?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let parsed = if is_toml {
            Self::from_toml(&text)
        } else {
            Self::from_json(&text)
        };
        parsed.map_err(|e| match e {
            ServerError::Config(msg) => ServerError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn from_json(text: &str) -> ServerResult<Self> {
        serde_json::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// The configured data directory, anchored at `cwd` when relative.
    pub fn data_dir_in(&self, cwd: &Path) -> PathBuf {
        if self.data_dir.is_absolute() {
            self.data_dir.clone()
        } else {
            cwd.join(&self.data_dir)
        }
    }

    pub fn seed_balances(&self) -> impl Iterator<Item = (Address, Winston)> + '_ {
        self.wallets
            .balances
            .iter()
            .map(|(address, balance)| (address.clone(), balance.clone()))
    }
}
