// Centralized configuration for evaluation parameters

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ====================
// Parallel Evaluation
// ====================
/// Default number of evaluation workers. Results are invariant to this
/// choice within floating-point reduction tolerance.
pub const DEFAULT_WORKERS: usize = 1;

/// Smallest term count worth splitting across more than one worker.
pub const MIN_TERMS_PER_WORKER: usize = 16;

// ====================
// Demo Scenario
// ====================
/// Default timestep (ps) used by the demo binary's test integrator.
pub const DEFAULT_DT_PS: f64 = 0.002;

/// Runtime configuration, loadable from a TOML file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of parallel workers for term evaluation.
    #[serde(default = "default_workers")]
    pub num_workers: usize,
    /// Timestep in picoseconds (demo binary only; integration itself is
    /// supplied by the surrounding engine).
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Step count for the demo binary.
    #[serde(default = "default_steps")]
    pub steps: usize,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_dt() -> f64 {
    DEFAULT_DT_PS
}

fn default_steps() -> usize {
    1000
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_workers: default_workers(),
            dt: default_dt(),
            steps: default_steps(),
        }
    }
}

impl SimConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        toml::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = SimConfig::load_toml("definitely_not_here.toml").unwrap();
        assert_eq!(cfg.num_workers, DEFAULT_WORKERS);
    }

    #[test]
    fn partial_toml_uses_defaults_for_rest() {
        let cfg: SimConfig = toml::from_str("num_workers = 4").unwrap();
        assert_eq!(cfg.num_workers, 4);
        assert_eq!(cfg.dt, DEFAULT_DT_PS);
    }
}
