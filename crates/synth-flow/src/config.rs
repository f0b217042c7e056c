//! Config and design loading for the CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use orchestrator::{Design, OrchestratorConfig};
use tracing::info;

/// Default config file, picked up from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "synth-flow.toml";

/// Where the design for a run comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignSource {
    /// A JSON-serialized design
    File(PathBuf),
    /// A deterministic generated design
    Synthetic { cells: u32, nets: u32 },
}

/// Load config from `path`, or `synth-flow.toml` if it exists, or defaults.
///
/// Environment overrides apply in every case.
pub fn load_config(path: Option<&Path>) -> Result<OrchestratorConfig> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            fallback.exists().then_some(fallback)
        }
    };

    match path {
        Some(path) => {
            let config = OrchestratorConfig::load(&path)?;
            info!(path = %path.display(), "Loaded config");
            Ok(config)
        }
        None => Ok(OrchestratorConfig::from_env()?),
    }
}

pub fn load_design(source: &DesignSource) -> Result<Design> {
    match source {
        DesignSource::File(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read design {}", path.display()))?;
            let design: Design = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse design {}", path.display()))?;
            info!(
                design = %design.name,
                cells = design.cells.len(),
                nets = design.nets.len(),
                "Loaded design"
            );
            Ok(design)
        }
        DesignSource::Synthetic { cells, nets } => {
            Ok(Design::synthetic("synthetic", *cells, *nets))
        }
    }
}
