pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{toml_config::FileConfig, Settings};
pub use crate::core::{
    batch::{run_batch, BatchMode},
    guard::{catch, catch_panic, spawn_guarded},
    server::{LineHandler, Server},
    supervisor::{RestartPolicy, SupervisionEnd, Supervisor},
};
pub use domain::model::{BatchReport, Fault, Outcome, Payload};
pub use utils::error::{RecoverError, Result};
