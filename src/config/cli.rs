use crate::config::Settings;
use crate::config::toml_config::FileConfig;
use crate::core::batch::BatchMode;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "recover-patterns")]
#[command(about = "Panic containment, supervision and recovery patterns")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Accept TCP connections; a panicking handler only loses its own connection
    Serve(ServeArgs),
    /// Run an action that is relaunched every time it panics
    Supervise(SuperviseArgs),
    /// Leave a nested call chain with a value
    Unwind(UnwindArgs),
    /// Run a batch of fallible steps with a single error capture
    Batch(BatchArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.listen)
    #[arg(long)]
    pub listen: Option<String>,
}

#[derive(Debug, Clone, clap::Args)]
pub struct SuperviseArgs {
    #[arg(long, default_value = "worker")]
    pub label: String,

    /// Panic this many times, then finish. Omit to panic forever
    #[arg(long)]
    pub fail_times: Option<u64>,

    /// Give up after this many relaunches (overrides supervisor.max_restarts)
    #[arg(long)]
    pub max_restarts: Option<u64>,

    /// Delay before each relaunch (overrides supervisor.backoff_ms)
    #[arg(long)]
    pub backoff_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PayloadKind {
    Int,
    Text,
}

#[derive(Debug, Clone, clap::Args)]
pub struct UnwindArgs {
    /// Type of the value raised at the bottom of the call chain
    #[arg(long, value_enum, default_value_t = PayloadKind::Int)]
    pub payload: PayloadKind,

    #[arg(long, default_value_t = 123, allow_negative_numbers = true)]
    pub value: i64,

    /// Depth the value is raised at (1 to 3)
    #[arg(long, default_value_t = 3)]
    pub depth: usize,

    /// Drop a mismatched payload and print the default instead of failing
    #[arg(long)]
    pub lenient: bool,
}

#[derive(Debug, Clone, clap::Args)]
pub struct BatchArgs {
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true, default_values_t = [1_i64, 2, 3, 53])]
    pub inputs: Vec<i64>,

    #[arg(long, value_enum, default_value_t = BatchMode::Checked)]
    pub mode: BatchMode,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl CliConfig {
    /// 合併設定檔與命令列參數，命令列優先
    pub fn settings(&self) -> Result<Settings> {
        let file = match &self.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };

        let mut settings = Settings::from(file);
        if self.json_logs {
            settings.log_json = true;
        }

        match &self.command {
            Command::Serve(args) => {
                if let Some(listen) = &args.listen {
                    settings.listen = listen.clone();
                }
            }
            Command::Supervise(args) => {
                validation::validate_non_empty_string("label", &args.label)?;
                if args.max_restarts.is_some() {
                    settings.max_restarts = args.max_restarts;
                }
                if let Some(backoff_ms) = args.backoff_ms {
                    settings.backoff_ms = backoff_ms;
                }
            }
            Command::Unwind(_) | Command::Batch(_) => {}
        }

        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConfigProvider;

    #[test]
    fn test_batch_defaults() {
        let cli = CliConfig::parse_from(["recover-patterns", "batch"]);
        match cli.command {
            Command::Batch(args) => {
                assert_eq!(args.inputs, vec![1, 2, 3, 53]);
                assert_eq!(args.mode, BatchMode::Checked);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_batch_mode_and_inputs() {
        let cli = CliConfig::parse_from([
            "recover-patterns",
            "batch",
            "--mode",
            "lenient",
            "--inputs",
            "4,5,-6",
        ]);
        match cli.command {
            Command::Batch(args) => {
                assert_eq!(args.inputs, vec![4, 5, -6]);
                assert_eq!(args.mode, BatchMode::Lenient);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_overrides_defaults() {
        let cli = CliConfig::parse_from([
            "recover-patterns",
            "supervise",
            "--max-restarts",
            "4",
            "--backoff-ms",
            "20",
        ]);
        let settings = cli.settings().unwrap();
        assert_eq!(settings.max_restarts(), Some(4));
        assert_eq!(settings.backoff_ms(), 20);
    }

    #[test]
    fn test_invalid_listen_rejected() {
        let cli = CliConfig::parse_from(["recover-patterns", "serve", "--listen", "nowhere"]);
        assert!(cli.settings().is_err());
    }

    #[test]
    fn test_unwind_defaults() {
        let cli = CliConfig::parse_from(["recover-patterns", "--json-logs", "unwind"]);
        assert!(cli.json_logs);
        match cli.command {
            Command::Unwind(args) => {
                assert_eq!(args.payload, PayloadKind::Int);
                assert_eq!(args.value, 123);
                assert_eq!(args.depth, 3);
                assert!(!args.lenient);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
