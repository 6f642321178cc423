//! Run configuration: search settings files and search counters.

mod settings;
mod stats;

pub use settings::{
    HeuristicSettings, SearchSettings, SeedSetting, SettingsError, SolverSettings,
    StoppingSettings,
};
pub use stats::{Counter, Statistics};
