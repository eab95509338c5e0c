//! Obscura Configuration
//!
//! Shared configuration crate for the Obscura wallet tooling.
//!
//! Handles loading configuration from:
//! 1. OBSCURA_CONFIG env var (explicit path)
//! 2. ./config.toml (current directory)
//! 3. ~/.obscura/config.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use std::{env, fs};

/// Global config instance for convenience access
pub static GLOBAL_CONFIG: OnceLock<ObscuraConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".obscura";
const KEY_FILE_NAME: &str = "spending.key";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:5050/rpc";
const DEFAULT_CONTRACT: &str = "0x0";
const DEFAULT_CHUNK_SIZE: u64 = 10;
const DEFAULT_TREE_DEPTH: usize = 28;
const MAX_TREE_DEPTH: usize = 32;
const DEFAULT_PROVER_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_PROVER_TIMEOUT_SECS: u64 = 300;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObscuraConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub prover: ProverConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

/// Ledger RPC and pool contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Pool contract address, hex felt
    #[serde(default = "default_contract")]
    pub contract_address: String,
    /// First block to scan for events
    #[serde(default)]
    pub from_block: Option<u64>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            contract_address: DEFAULT_CONTRACT.into(),
            from_block: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.into()
}
fn default_contract() -> String {
    DEFAULT_CONTRACT.into()
}
fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

/// Commitment tree shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "default_tree_depth")]
    pub depth: usize,
    #[serde(default)]
    pub input_padding: InputPaddingToml,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_TREE_DEPTH,
            input_padding: InputPaddingToml::default(),
        }
    }
}

fn default_tree_depth() -> usize {
    DEFAULT_TREE_DEPTH
}

/// Input padding policy for TOML config
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum InputPaddingToml {
    #[default]
    MinimumTwo,
    CircuitArity,
}

impl InputPaddingToml {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputPaddingToml::MinimumTwo => "minimum-two",
            InputPaddingToml::CircuitArity => "circuit-arity",
        }
    }
}

impl std::str::FromStr for InputPaddingToml {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "minimum-two" => Ok(InputPaddingToml::MinimumTwo),
            "circuit-arity" => Ok(InputPaddingToml::CircuitArity),
            other => bail!("unknown input padding '{}'", other),
        }
    }
}

/// Prover mode for TOML config
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProverModeToml {
    #[default]
    Mock,
    Http,
}

/// External prover service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProverConfig {
    #[serde(default)]
    pub mode: ProverModeToml,
    #[serde(default = "default_prover_url")]
    pub url: String,
    #[serde(default = "default_prover_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            mode: ProverModeToml::Mock,
            url: DEFAULT_PROVER_URL.into(),
            timeout_secs: DEFAULT_PROVER_TIMEOUT_SECS,
        }
    }
}

impl ProverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_prover_url() -> String {
    DEFAULT_PROVER_URL.into()
}
fn default_prover_timeout() -> u64 {
    DEFAULT_PROVER_TIMEOUT_SECS
}

/// Local wallet files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Spending key file; defaults to ~/.obscura/spending.key
    #[serde(default)]
    pub key_path: Option<String>,
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from env var if present
fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

/// Set Option<String> from env var if present
fn env_option_string(key: &str, field: &mut Option<String>) {
    if let Ok(v) = env::var(key) {
        *field = Some(v);
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

/// Set Option<T> from env var if present and parseable
fn env_parse_option<T: std::str::FromStr>(key: &str, field: &mut Option<T>) {
    if let Ok(v) = env::var(key) {
        match v.parse() {
            Ok(parsed) => *field = Some(parsed),
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl ObscuraConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::read(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check OBSCURA_CONFIG env var
        if let Ok(path) = env::var("OBSCURA_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            log::warn!("OBSCURA_CONFIG points at missing file: {}", path.display());
        }

        // 2. Check ./config.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.obscura/config.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Ledger
        env_string("OBSCURA_RPC_URL", &mut self.ledger.rpc_url);
        env_string("OBSCURA_CONTRACT", &mut self.ledger.contract_address);
        env_parse("OBSCURA_CHUNK_SIZE", &mut self.ledger.chunk_size);
        env_parse_option("OBSCURA_FROM_BLOCK", &mut self.ledger.from_block);

        // Tree
        env_parse("OBSCURA_TREE_DEPTH", &mut self.tree.depth);
        env_parse("OBSCURA_INPUT_PADDING", &mut self.tree.input_padding);

        // Prover
        if let Ok(url) = env::var("OBSCURA_PROVER_URL") {
            self.prover.url = url;
            self.prover.mode = ProverModeToml::Http;
        }
        env_parse("OBSCURA_PROVER_TIMEOUT_SECS", &mut self.prover.timeout_secs);

        // Wallet
        env_option_string("OBSCURA_KEY_PATH", &mut self.wallet.key_path);
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<()> {
        if self.tree.depth == 0 || self.tree.depth > MAX_TREE_DEPTH {
            bail!(
                "tree.depth must be between 1 and {}, got {}",
                MAX_TREE_DEPTH,
                self.tree.depth
            );
        }
        if self.ledger.chunk_size == 0 {
            bail!("ledger.chunk_size must be at least 1");
        }
        if self.prover.timeout_secs == 0 {
            bail!("prover.timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Spending key file: configured path, else ~/.obscura/spending.key
    pub fn key_path(&self) -> Option<PathBuf> {
        match self.wallet.key_path.as_deref() {
            Some(path) => match path.strip_prefix("~/") {
                Some(rest) => dirs::home_dir().map(|h| h.join(rest)),
                None => Some(PathBuf::from(path)),
            },
            None => dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(KEY_FILE_NAME)),
        }
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.ledger.from_block = Some(0);
        sample.wallet.key_path = Some(format!("~/{CONFIG_DIR_NAME}/{KEY_FILE_NAME}"));
        toml::to_string_pretty(&sample).unwrap_or_default()
    }

    /// Get the global config instance, initializing it if necessary.
    ///
    /// Falls back to defaults if loading fails.
    pub fn global() -> &'static ObscuraConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            })
        })
    }

    /// Try to get the global config instance.
    ///
    /// Returns `None` if config hasn't been initialized yet.
    pub fn try_global() -> Option<&'static ObscuraConfig> {
        GLOBAL_CONFIG.get()
    }

    /// Initialize the global config with a specific instance.
    ///
    /// Returns `Err(config)` if already initialized.
    pub fn set_global(config: ObscuraConfig) -> Result<(), ObscuraConfig> {
        GLOBAL_CONFIG.set(config)
    }
}

/// Shorthand for `ObscuraConfig::global()`.
#[inline]
pub fn global_config() -> &'static ObscuraConfig {
    ObscuraConfig::global()
}

// ============================================================================
// Tests
// ============================================================================
