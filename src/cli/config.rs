use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::autosave::scheduler::DEFAULT_SAVE_DELAY;
use crate::binding::registry::DEFAULT_BINDING_PREFIX;
use crate::session::editor::SessionConfig;
use crate::store::adapter::PERSISTENCE_ADDRESS;

pub const DEFAULT_CONFIG_FILE: &str = "form-designer.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-designer",
    version,
    about = "Form designer documents and spreadsheet-style bindings"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: form-designer.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Append sync events as JSON lines to this file
    #[arg(long, global = true)]
    pub trace: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the starter design to a document file
    Init {
        /// Document file to create
        #[arg(short, long)]
        output: String,

        /// Grid column count
        #[arg(long, default_value_t = 2)]
        columns: u32,
    },

    /// Print settings, fields, bindings and flow placement of a document
    Inspect {
        /// Design document (JSON)
        #[arg(long)]
        doc: String,
    },

    /// Upgrade a document to the current schema version
    Migrate {
        /// Design document (JSON)
        #[arg(long)]
        doc: String,

        /// Output file (default: rewrite in place)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Persist a document into a file-backed store
    Save {
        /// Design document (JSON)
        #[arg(long)]
        doc: String,

        /// Store file (JSON object of address -> value)
        #[arg(long)]
        store: String,
    },

    /// Read the persisted document back out of a store
    Load {
        /// Store file (JSON object of address -> value)
        #[arg(long)]
        store: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show the store value behind every bound field of a document
    Values {
        /// Design document (JSON)
        #[arg(long)]
        doc: String,

        /// Store file (JSON object of address -> value)
        #[arg(long)]
        store: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `form-designer.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub autosave: AutoSaveSection,
    #[serde(default)]
    pub persistence: PersistenceSection,
    #[serde(default)]
    pub binding: BindingSection,
    #[serde(default)]
    pub trace: TraceSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoSaveSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for AutoSaveSection {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: default_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceSection {
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for PersistenceSection {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingSection {
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for BindingSection {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TraceSection {
    pub path: Option<String>,
}

// Serde default helpers
fn default_true() -> bool { true }
fn default_delay_ms() -> u64 { DEFAULT_SAVE_DELAY.as_millis() as u64 }
fn default_address() -> String { PERSISTENCE_ADDRESS.to_string() }
fn default_prefix() -> String { DEFAULT_BINDING_PREFIX.to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = config_path, error = %e, "ignoring malformed config");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// Build the session settings. `trace_override` (from the CLI) wins over
/// the config file.
pub fn build_session_config(config: &AppConfig, trace_override: Option<&str>) -> SessionConfig {
    SessionConfig {
        autosave_enabled: config.autosave.enabled,
        autosave_delay: Duration::from_millis(config.autosave.delay_ms),
        persistence_address: config.persistence.address.clone(),
        binding_prefix: config.binding.prefix.clone(),
        trace_path: trace_override
            .map(str::to_string)
            .or_else(|| config.trace.path.clone()),
    }
}
