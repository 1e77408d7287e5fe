#![forbid(unsafe_code)]

use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory as _, Parser, Subcommand};

use crate::ai::{GeminiClient, TaskGenerator};
use crate::config;
use crate::error::TodogenError;
use crate::logging;
use crate::tui;

#[derive(Debug, Parser)]
#[command(
    name = "todogen",
    version,
    about = "Turn a goal into an actionable to-do list with AI"
)]
pub struct Cli {
    /// Log filter for this run (overrides log.level, not RUST_LOG)
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Config(ConfigArgs),
    Completion(CompletionArgs),
    Version,
}

#[derive(Debug, Parser)]
pub struct CompletionArgs {
    pub shell: clap_complete::Shell,
}

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCmd,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    List,
    Set(ConfigSetArgs),
    Get(ConfigGetArgs),
}

#[derive(Debug, Parser)]
pub struct ConfigSetArgs {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Parser)]
pub struct ConfigGetArgs {
    pub key: String,
}

pub async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.cmd {
        None => cmd_default(cli.log_level.as_deref()).await,
        Some(Commands::Completion(args)) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "todogen", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Config(args)) => match args.cmd {
            ConfigCmd::List => {
                print!("{}", config::list_resolved_toml()?);
                Ok(ExitCode::SUCCESS)
            }
            ConfigCmd::Set(set) => {
                config::set_value_string(&set.key, &set.value)?;
                println!("Set {} = {}", set.key, set.value);
                Ok(ExitCode::SUCCESS)
            }
            ConfigCmd::Get(get) => match config::get_value_string(&get.key)? {
                Some(v) => {
                    println!("{v}");
                    Ok(ExitCode::SUCCESS)
                }
                None => anyhow::bail!(
                    "configuration key '{}' not found - use 'todogen config list' to see available keys",
                    get.key
                ),
            },
        },
        Some(Commands::Version) => Ok(cmd_version()),
    }
}

async fn load_cfg() -> anyhow::Result<config::Config> {
    let cfg = tokio::task::spawn_blocking(|| -> anyhow::Result<config::Config> {
        let (cfg, _paths) = config::load()?;
        Ok(cfg)
    })
    .await??;
    Ok(cfg)
}

async fn cmd_default(log_level: Option<&str>) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;

    // Checked before the terminal is touched so the message stays readable.
    let api_key = cfg.resolve_api_key()?;
    if !tui::is_tty() {
        return Err(TodogenError::NotATerminal.into());
    }

    let _log = logging::init(&cfg.log, log_level)?;

    let client = GeminiClient::from_config(&cfg.ai, api_key)?;
    tracing::info!(model = client.model(), "starting interactive session");
    let generator: Arc<dyn TaskGenerator> = Arc::new(client);

    tui::app::run(cfg, generator).await?;
    tracing::info!("session ended");
    Ok(ExitCode::SUCCESS)
}

fn cmd_version() -> ExitCode {
    println!("todogen version {}", env!("CARGO_PKG_VERSION"));
    if let Some(commit) = option_env!("TODOGEN_GIT_COMMIT") {
        println!("  commit: {commit}");
    }
    println!("  rust: {}", rustc_version_runtime::version());
    println!(
        "  os/arch: {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_starts_a_session() {
        let cli = Cli::try_parse_from(["todogen"]).unwrap();
        assert!(cli.cmd.is_none());
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn log_level_is_global() {
        let cli = Cli::try_parse_from(["todogen", "config", "list", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(
            cli.cmd,
            Some(Commands::Config(ConfigArgs { cmd: ConfigCmd::List }))
        ));
    }

    #[test]
    fn parses_config_set() {
        let cli = Cli::try_parse_from(["todogen", "config", "set", "ai.model", "gemini-2.5-pro"])
            .unwrap();
        let Some(Commands::Config(ConfigArgs {
            cmd: ConfigCmd::Set(set),
        })) = cli.cmd
        else {
            panic!("expected config set");
        };
        assert_eq!(set.key, "ai.model");
        assert_eq!(set.value, "gemini-2.5-pro");
    }

    #[test]
    fn rejects_unknown_shell() {
        assert!(Cli::try_parse_from(["todogen", "completion", "cmd.exe"]).is_err());
    }
}
