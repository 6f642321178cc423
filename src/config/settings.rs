//! Search settings files.
//!
//! A settings file names a solver configuration and, optionally, the
//! heuristic and stopping strategy used to rank successors:
//!
//! ```json
//! {
//!     "name": "ranked",
//!     "max_steps": 20,
//!     "step_size": 500,
//!     "seed": 1234,
//!     "no_repeats": true,
//!     "solver": {"max_depth": 8, "starting_depth": 2},
//!     "heuristic": {"edit_distance": {"symbol_mismatch_cost": 1.0, "p": 2.0}},
//!     "stopping_strategy": {"basic": {"initial_fill": 3, "lambda": 1.0, "alpha": 0.5}}
//! }
//! ```

use crate::inference::{KernelSettings, KnowledgeKernel};
use crate::search::{
    EditDistanceHeuristic, Heuristic, IterativeDeepeningSolver, IteratorManager,
    DEFAULT_MAX_DEPTH, DEFAULT_STARTING_DEPTH,
};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read search settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid search settings file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("seed must be a number or \"time\", got \"{0}\"")]
    Seed(String),
    #[error("step_size and max_steps must be positive")]
    ZeroSteps,
    #[error("solver needs 1 <= starting_depth < max_depth, got {starting_depth} and {max_depth}")]
    Depths {
        max_depth: usize,
        starting_depth: usize,
    },
    #[error("edit distance needs positive symbol_mismatch_cost and p")]
    Heuristic,
    #[error("invalid stopping strategy: {0}")]
    StoppingStrategy(&'static str),
    #[error("a stopping strategy needs a heuristic")]
    StrategyWithoutHeuristic,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SeedSetting {
    Value(u64),
    Keyword(String),
}

impl Default for SeedSetting {
    fn default() -> Self {
        SeedSetting::Keyword("time".to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SolverSettings {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_starting_depth")]
    pub starting_depth: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            starting_depth: DEFAULT_STARTING_DEPTH,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicSettings {
    EditDistance { symbol_mismatch_cost: f32, p: f32 },
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoppingSettings {
    Fixed {
        n: usize,
    },
    Basic {
        #[serde(default = "default_initial_fill")]
        initial_fill: usize,
        lambda: f32,
        alpha: f32,
    },
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_desc")]
    pub desc: String,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_step_size")]
    pub step_size: usize,
    #[serde(default)]
    pub seed: SeedSetting,
    #[serde(default)]
    pub randomised: bool,
    #[serde(default)]
    pub no_repeats: bool,
    #[serde(default)]
    pub solver: Option<SolverSettings>,
    #[serde(default)]
    pub heuristic: Option<HeuristicSettings>,
    #[serde(default)]
    pub stopping_strategy: Option<StoppingSettings>,
}

fn default_name() -> String {
    "Unnamed Search Settings".to_string()
}

fn default_desc() -> String {
    "No description.".to_string()
}

fn default_max_steps() -> usize {
    10
}

fn default_step_size() -> usize {
    100
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_starting_depth() -> usize {
    DEFAULT_STARTING_DEPTH
}

fn default_initial_fill() -> usize {
    3
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            desc: default_desc(),
            max_steps: default_max_steps(),
            step_size: default_step_size(),
            seed: SeedSetting::default(),
            randomised: false,
            no_repeats: false,
            solver: None,
            heuristic: None,
            stopping_strategy: None,
        }
    }
}

impl SearchSettings {
    /// Parse and validate a settings document.
    pub fn from_json_str(text: &str) -> Result<Self, SettingsError> {
        let settings: SearchSettings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json_str(&text)?;
        tracing::info!(
            path = %path.as_ref().display(),
            name = %settings.name,
            "search settings loaded"
        );
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if let SeedSetting::Keyword(word) = &self.seed {
            if word != "time" {
                return Err(SettingsError::Seed(word.clone()));
            }
        }
        if self.max_steps == 0 || self.step_size == 0 {
            return Err(SettingsError::ZeroSteps);
        }
        if let Some(solver) = &self.solver {
            if solver.starting_depth < 1 || solver.max_depth <= solver.starting_depth {
                return Err(SettingsError::Depths {
                    max_depth: solver.max_depth,
                    starting_depth: solver.starting_depth,
                });
            }
        }
        if let Some(HeuristicSettings::EditDistance { symbol_mismatch_cost, p }) = &self.heuristic {
            if !(*symbol_mismatch_cost > 0.0 && *p > 0.0) {
                return Err(SettingsError::Heuristic);
            }
        }
        match &self.stopping_strategy {
            None => {}
            Some(_) if self.heuristic.is_none() => {
                return Err(SettingsError::StrategyWithoutHeuristic)
            }
            Some(StoppingSettings::Fixed { n }) => {
                if *n == 0 {
                    return Err(SettingsError::StoppingStrategy("fixed size must be positive"));
                }
            }
            Some(StoppingSettings::Basic {
                initial_fill,
                lambda,
                alpha,
            }) => {
                if *initial_fill <= 1 {
                    return Err(SettingsError::StoppingStrategy("initial_fill must exceed one"));
                }
                if !(*lambda > 0.0) {
                    return Err(SettingsError::StoppingStrategy("lambda must be positive"));
                }
                if !(*alpha > 0.0 && *alpha < 1.0) {
                    return Err(SettingsError::StoppingStrategy("alpha must lie in (0, 1)"));
                }
            }
        }
        Ok(())
    }

    /// The configured seed, or one taken from the clock for `"time"`.
    pub fn resolved_seed(&self) -> u64 {
        match self.seed {
            SeedSetting::Value(seed) => seed,
            SeedSetting::Keyword(_) => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_nanos() as u64),
        }
    }

    pub fn kernel_settings(&self) -> KernelSettings {
        KernelSettings {
            randomised: self.randomised,
            no_repeats: self.no_repeats,
            seed: self.resolved_seed(),
        }
    }

    pub fn create_heuristic(&self) -> Option<Rc<dyn Heuristic>> {
        self.heuristic.as_ref().map(|h| match *h {
            HeuristicSettings::EditDistance {
                symbol_mismatch_cost,
                p,
            } => Rc::new(EditDistanceHeuristic::new(symbol_mismatch_cost, p)) as Rc<dyn Heuristic>,
        })
    }

    pub fn create_iter_manager(&self, kernel: Rc<KnowledgeKernel>) -> IteratorManager {
        let mut mgr = IteratorManager::new(kernel);
        mgr.set_heuristic(self.create_heuristic());
        match self.stopping_strategy {
            None => {}
            Some(StoppingSettings::Fixed { n }) => mgr.set_fixed_stopping_strategy(n),
            Some(StoppingSettings::Basic {
                initial_fill,
                lambda,
                alpha,
            }) => mgr.set_basic_stopping_strategy(initial_fill, lambda, alpha),
        }
        mgr
    }

    /// A solver for `kernel`, using default depths when no solver section
    /// was given.  Settings must have passed [`SearchSettings::validate`].
    pub fn create_solver(&self, kernel: Rc<KnowledgeKernel>) -> IterativeDeepeningSolver {
        let solver = self.solver.clone().unwrap_or_default();
        IterativeDeepeningSolver::new(
            self.create_iter_manager(kernel),
            solver.max_depth,
            solver.starting_depth,
        )
    }
}
