use std::path::Path;

use anyhow::{Context, Result};
use peakscan_core::consts::DEFAULT_DECIMATION;
use peakscan_core::frame::BufferGeometry;
use peakscan_core::params::Parameters;
use serde::{Deserialize, Serialize};

/// Everything `peakscan run` needs to replay a dump: how buffers are laid
/// out, how often to analyse, and the detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Analyse every Nth selected buffer.
    pub decimation: u32,
    pub geometry: BufferGeometry,
    pub parameters: Parameters,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            decimation: DEFAULT_DECIMATION,
            geometry: BufferGeometry {
                bit_depth: 12,
                samples_per_line: 1024,
                lines_per_frame: 512,
                frames_per_buffer: 1,
                buffers_per_volume: 1,
            },
            parameters: Parameters::default(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).context("Invalid run config")
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
