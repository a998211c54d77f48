#![forbid(unsafe_code)]

pub mod capture;
pub mod cli;
pub mod config;
pub mod doctor;
pub mod error;
pub mod hooks;
pub mod ledger;
pub mod manager;
pub mod params;
pub mod process;
pub mod recorder;
pub mod scenario;
pub mod session;
pub mod util;

pub use cli::run_from_env;
pub use config::CaptureConfig;
pub use error::{CaptureError, Result};
pub use hooks::{ScenarioHooks, run_scenario};
pub use manager::{CaptureLifecycleManager, Teardown};
pub use params::Parameters;
pub use process::{StopOutcome, stop_gracefully};
pub use scenario::{Scenario, ScenarioOutcome};
