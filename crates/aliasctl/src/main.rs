// # aliasctl - alias directory front end
//
// Thin command-line layer over `aliasdns-core`. It is responsible for:
// 1. Parsing arguments and loading the JSON configuration
// 2. Initializing logging and the runtime
// 3. Registering record stores and creating the engine
// 4. Running one operation and printing its notices
//
// All alias logic lives in `aliasdns-core`; nothing here decodes or edits
// the TXT record.
//
// ## Configuration
//
// - `--config` / `ALIASDNS_CONFIG`: path to the JSON configuration
// - `ALIASDNS_API_TOKEN`: API token, overrides the file
// - `--log-level` / `ALIASDNS_LOG_LEVEL`: trace, debug, info, warn, error
// - `ALIASDNS_MODE=dry-run`: read the record but only log writes
//
// ## Example
//
// ```bash
// export ALIASDNS_CONFIG=/etc/aliasdns/config.json
// export ALIASDNS_API_TOKEN=your_token
//
// aliasctl list
// aliasctl add sales "Sales Team"
// aliasctl add-batch news=0 billing=sales@corp.example
// aliasctl delete 3 --expect billing
// ```
//
// Notices go to stdout, logs to stderr.

use aliasdns_core::{
    AliasConfig, AliasDraft, AliasEngine, Directory, EndpointCatalog, EndpointId, EntryRef, Error,
    Notice, StoreRegistry,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Environment variable carrying the API token
const TOKEN_ENV: &str = "ALIASDNS_API_TOKEN";

/// Exit codes for different termination scenarios
///
/// - 0: Operation completed
/// - 1: Configuration or startup error
/// - 2: Runtime error (the operation failed)
#[derive(Debug, Clone, Copy)]
enum AliasctlExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<AliasctlExitCode> for ExitCode {
    fn from(code: AliasctlExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// `aliasctl` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "aliasctl",
    about = "Manage email-forwarding aliases stored in a DNS TXT record",
    version
)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, env = "ALIASDNS_CONFIG", value_name = "path")]
    config: PathBuf,

    /// Log verbosity (trace, debug, info, warn, error).
    #[arg(long, env = "ALIASDNS_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Print the configured endpoints.
    Endpoints,

    #[command(flatten)]
    Remote(RemoteCommand),
}

/// Commands that read or write the TXT record
#[derive(Debug, Clone, Subcommand)]
enum RemoteCommand {
    /// Print the aliases currently stored, with their positions.
    List,

    /// Add one alias.
    Add {
        /// Local part of the alias.
        alias: String,
        /// Endpoint position, email, nickname or legacy name.
        endpoint: String,
    },

    /// Add several aliases with a single write.
    AddBatch {
        /// Pairs written as `alias=endpoint`.
        #[arg(required = true, value_parser = parse_pair, value_name = "alias=endpoint")]
        pairs: Vec<(String, String)>,
    },

    /// Replace the alias at a position.
    Edit {
        /// Position as printed by `list`.
        index: usize,
        /// New local part.
        alias: String,
        /// New endpoint.
        endpoint: String,
        /// Refuse unless this alias is still at the position.
        #[arg(long, value_name = "alias")]
        expect: Option<String>,
    },

    /// Remove the alias at a position.
    Delete {
        /// Position as printed by `list`.
        index: usize,
        /// Refuse unless this alias is still at the position.
        #[arg(long, value_name = "alias")]
        expect: Option<String>,
    },

    /// Import aliases from an HTML export.
    Import {
        /// Path to the export document.
        path: PathBuf,
    },
}

fn parse_pair(raw: &str) -> std::result::Result<(String, String), String> {
    let (alias, endpoint) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected alias=endpoint, got '{raw}'"))?;
    if alias.is_empty() || endpoint.is_empty() {
        return Err(format!("expected alias=endpoint, got '{raw}'"));
    }
    Ok((alias.to_string(), endpoint.to_string()))
}

fn parse_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Load the configuration file and apply environment overrides
fn load_config(cli: &Cli) -> Result<AliasConfig> {
    let mut config = AliasConfig::load(&cli.config)
        .with_context(|| format!("Cannot load configuration {}", cli.config.display()))?;

    if let Ok(token) = env::var(TOKEN_ENV)
        && !token.is_empty()
    {
        debug!("Using API token from {}", TOKEN_ENV);
        config.store.set_api_token(token);
    }

    config.validate()?;
    Ok(config)
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                AliasctlExitCode::ConfigError.into()
            } else {
                AliasctlExitCode::Success.into()
            };
        }
    };

    let Some(log_level) = parse_level(&cli.log_level) else {
        eprintln!(
            "Configuration error: log level '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            cli.log_level
        );
        return AliasctlExitCode::ConfigError.into();
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return AliasctlExitCode::ConfigError.into();
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return AliasctlExitCode::ConfigError.into();
        }
    };

    info!(
        "Managing {} with {} endpoint(s)",
        config.record_name(),
        config.endpoints.len()
    );

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return AliasctlExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(run(config, cli.command));

    match result {
        Ok(()) => AliasctlExitCode::Success.into(),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            match e.downcast_ref::<Error>() {
                Some(Error::Config(_)) => AliasctlExitCode::ConfigError.into(),
                _ => AliasctlExitCode::RuntimeError.into(),
            }
        }
    }
}

/// Create the engine, run one command and flush its notices
async fn run(config: AliasConfig, command: Command) -> Result<()> {
    let command = match command {
        Command::Endpoints => {
            print_endpoints(&config.catalog());
            return Ok(());
        }
        Command::Remote(command) => command,
    };

    let registry = StoreRegistry::new();

    #[cfg(feature = "cloudflare")]
    {
        debug!("Registering Cloudflare store");
        aliasdns_store_cloudflare::register(&registry);
    }

    let store = registry.create_store(&config).await?;
    info!("Connected to {} store", store.store_name());

    let (engine, notices) = AliasEngine::new(store, &config)?;
    let printer = tokio::spawn(print_notices(notices));

    let result = execute(&engine, &config, command).await;

    // Closes the notice channel so the printer drains and exits
    drop(engine);
    printer.await?;

    result
}

async fn execute(
    engine: &AliasEngine,
    config: &AliasConfig,
    command: RemoteCommand,
) -> Result<()> {
    match command {
        RemoteCommand::List => {
            let directory = engine.list_aliases().await?;
            print_directory(&directory, &config.domain);
        }
        RemoteCommand::Add { alias, endpoint } => {
            let endpoint = resolve_endpoint(engine.catalog(), &endpoint)?;
            engine.add_alias(AliasDraft::new(alias, endpoint)).await?;
        }
        RemoteCommand::AddBatch { pairs } => {
            let drafts = pairs
                .into_iter()
                .map(|(alias, endpoint)| {
                    resolve_endpoint(engine.catalog(), &endpoint)
                        .map(|endpoint| AliasDraft::new(alias, endpoint))
                })
                .collect::<Result<Vec<_>>>()?;
            engine.add_aliases(drafts).await?;
        }
        RemoteCommand::Edit {
            index,
            alias,
            endpoint,
            expect,
        } => {
            let endpoint = resolve_endpoint(engine.catalog(), &endpoint)?;
            engine
                .edit_alias(entry_ref(index, expect), AliasDraft::new(alias, endpoint))
                .await?;
        }
        RemoteCommand::Delete { index, expect } => {
            engine.delete_alias(entry_ref(index, expect)).await?;
        }
        RemoteCommand::Import { path } => {
            let outcome = engine.import_file(&path).await?;
            info!(
                "Imported {} alias(es) from {}, {} already present",
                outcome.added.len(),
                path.display(),
                outcome.skipped.len()
            );
        }
    }
    Ok(())
}

fn entry_ref(index: usize, expect: Option<String>) -> EntryRef {
    match expect {
        Some(alias) => EntryRef::at(index).expecting(alias),
        None => EntryRef::at(index),
    }
}

fn resolve_endpoint(catalog: &EndpointCatalog, reference: &str) -> Result<EndpointId> {
    catalog.lookup(reference).ok_or_else(|| {
        Error::unknown_endpoint(format!(
            "'{}' matches no endpoint (see `aliasctl endpoints`)",
            reference
        ))
        .into()
    })
}

fn print_directory(directory: &Directory, domain: &str) {
    for (index, entry) in directory.entries().iter().enumerate() {
        let nickname = directory
            .endpoint_of(entry)
            .map(|endpoint| endpoint.nickname.as_str())
            .unwrap_or("unknown endpoint");
        println!(
            "{:>3}  {}@{} -> {} ({})",
            index, entry.record.alias, domain, entry.record.email, nickname
        );
    }
    if directory.is_empty() {
        println!("No aliases");
    }
}

fn print_endpoints(catalog: &EndpointCatalog) {
    for (id, endpoint) in catalog.iter() {
        println!("{:>3}  {} ({})", id.index(), endpoint.email, endpoint.nickname);
    }
}

/// Print notices until the engine is dropped
async fn print_notices(notices: mpsc::Receiver<Notice>) {
    let mut stream = ReceiverStream::new(notices);
    while let Some(notice) = stream.next().await {
        match notice {
            // Reported once by main with the returned error
            Notice::Failed { operation, .. } => debug!("{} reported failure", operation),
            Notice::DirectoryChanged { .. } => info!("{}", notice),
            notice => println!("{}", notice),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aliasdns_core::Endpoint;

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            parse_pair("sales=Sales Team"),
            Ok(("sales".to_string(), "Sales Team".to_string()))
        );
        assert_eq!(
            parse_pair("a=b=c"),
            Ok(("a".to_string(), "b=c".to_string()))
        );
        assert!(parse_pair("sales").is_err());
        assert!(parse_pair("=Sales").is_err());
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_level("warn"), Some(Level::WARN));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "aliasctl",
            "--config",
            "/tmp/aliases.json",
            "edit",
            "2",
            "news",
            "Personal",
            "--expect",
            "old",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Remote(RemoteCommand::Edit { index: 2, ref expect, .. })
                if expect.as_deref() == Some("old")
        ));

        let cli = Cli::try_parse_from([
            "aliasctl",
            "--config",
            "c.json",
            "add-batch",
            "a=0",
            "b=Personal",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Remote(RemoteCommand::AddBatch { ref pairs }) if pairs.len() == 2
        ));

        let cli = Cli::try_parse_from(["aliasctl", "--config", "c.json", "endpoints"]).unwrap();
        assert!(matches!(cli.command, Command::Endpoints));

        let cli = Cli::try_parse_from(["aliasctl", "--config", "c.json", "list"]).unwrap();
        assert!(matches!(cli.command, Command::Remote(RemoteCommand::List)));

        assert!(
            Cli::try_parse_from(["aliasctl", "--config", "c.json", "add-batch"]).is_err(),
            "add-batch needs at least one pair"
        );
    }

    #[test]
    fn test_load_config_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let cli = Cli::try_parse_from(["aliasctl", "--config", path.to_str().unwrap(), "list"])
            .unwrap();

        let err = load_config(&cli).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound
        ));
    }

    #[test]
    fn test_resolve_endpoint() {
        let catalog = EndpointCatalog::new(vec![
            Endpoint::new("sales@corp.example", "Sales Team"),
            Endpoint::new("me@home.example", "Personal"),
        ]);

        assert_eq!(resolve_endpoint(&catalog, "1").unwrap(), EndpointId::new(1));
        assert_eq!(
            resolve_endpoint(&catalog, "Sales Team").unwrap(),
            EndpointId::new(0)
        );
        assert!(resolve_endpoint(&catalog, "7").is_err());
    }

    #[test]
    fn test_entry_ref() {
        assert_eq!(entry_ref(3, None), EntryRef::at(3));
        assert_eq!(
            entry_ref(3, Some("news".to_string())),
            EntryRef::at(3).expecting("news")
        );
    }
}
