use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use insightcloudsec::config::{ProviderConfig, StoredConfig};
use insightcloudsec::provider::{validate_data_source_config, validate_resource_config};
use insightcloudsec::resource::{
    get_all_data_source_types, get_all_resource_types, get_data_source_schema,
    get_resource_schema, provider_schema,
};
use insightcloudsec::{AttributeTree, Diagnostic, Provider, ProviderError, ReadOutcome, ResourceState};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Operator surface for the InsightCloudSec provider core
#[derive(Parser, Debug)]
#[command(name = "terraform-provider-insightcloudsec", version = insightcloudsec::VERSION, about, long_about = None)]
struct Args {
    /// Console base URL (overrides INSIGHTCLOUDSEC_BASE_URL and the stored config)
    #[arg(long, global = true)]
    url: Option<String>,

    /// API key (overrides INSIGHTCLOUDSEC_API_KEY)
    #[arg(long, global = true, hide = true)]
    apikey: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", env = "INSIGHTCLOUDSEC_LOG_LEVEL", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a resource or data source schema, or list every type
    Schema {
        #[arg(value_name = "TYPE")]
        type_name: Option<String>,
    },
    /// Validate a resource configuration without calling the API
    Validate {
        #[arg(long = "type")]
        type_name: String,
        #[arg(long)]
        file: PathBuf,
        /// Treat the type as a data source
        #[arg(long)]
        data: bool,
    },
    Create {
        #[arg(long = "type")]
        type_name: String,
        #[arg(long)]
        file: PathBuf,
    },
    Read {
        #[arg(long = "type")]
        type_name: String,
        #[arg(long)]
        id: String,
        /// Prior state to refresh
        #[arg(long)]
        state: Option<PathBuf>,
    },
    Update {
        #[arg(long = "type")]
        type_name: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        prior: PathBuf,
        #[arg(long)]
        file: PathBuf,
    },
    Delete {
        #[arg(long = "type")]
        type_name: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Adopt an existing entity by id
    Import {
        #[arg(long = "type")]
        type_name: String,
        #[arg(long)]
        id: String,
    },
    /// Read a data source
    Data {
        #[arg(long = "type")]
        type_name: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Persist the console base URL
    Configure {
        #[arg(long = "url", value_name = "URL")]
        base_url: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("provider {} started with log level: {:?}", insightcloudsec::VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("insightcloudsec").join("provider.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".insightcloudsec").join("provider.log");
    }
    PathBuf::from("provider.log")
}

/// Load an attribute tree from a JSON or YAML file
fn load_tree(path: &Path) -> Result<AttributeTree> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let map: serde_json::Map<String, serde_json::Value> = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML in {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON in {}", path.display()))?
    };

    Ok(AttributeTree::from_json_map(&map))
}

fn load_optional(path: Option<&PathBuf>) -> Result<AttributeTree> {
    match path {
        Some(path) => load_tree(path),
        None => Ok(AttributeTree::new()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(diagnostic: &Diagnostic) {
    match serde_json::to_string_pretty(diagnostic) {
        Ok(text) => eprintln!("{text}"),
        Err(_) => eprintln!("{}: {}", diagnostic.summary, diagnostic.detail),
    }
}

/// State goes to stdout, its warnings to stderr
fn print_state(state: &ResourceState) -> Result<()> {
    for warning in &state.warnings {
        report(warning);
    }
    print_json(state)
}

fn print_outcome(type_name: &str, id: &str, outcome: ReadOutcome) -> Result<()> {
    match outcome {
        ReadOutcome::Found(state) => print_state(&state),
        ReadOutcome::Gone => {
            report(&Diagnostic::warning(
                "Resource Gone",
                format!("{type_name} {id} no longer exists; its state should be removed."),
            ));
            Ok(())
        }
    }
}

fn connect(args: &Args) -> Result<Provider, ProviderError> {
    let config = ProviderConfig::resolve(args.url.clone(), args.apikey.clone())?;
    Provider::configure(config)
}

fn print_schema(type_name: Option<&str>) -> Result<()> {
    let Some(type_name) = type_name else {
        return print_json(&serde_json::json!({
            "provider": provider_schema(),
            "resources": get_all_resource_types(),
            "data_sources": get_all_data_source_types(),
        }));
    };

    let schema = get_resource_schema(type_name)
        .or_else(|| get_data_source_schema(type_name))
        .with_context(|| format!("unknown type {type_name}"))?;
    print_json(schema)
}

async fn run(args: &Args) -> Result<()> {
    match &args.command {
        Command::Schema { type_name } => print_schema(type_name.as_deref()),
        Command::Validate { type_name, file, data } => {
            let config = load_tree(file)?;
            let validated = if *data {
                validate_data_source_config(type_name, &config)?
            } else {
                validate_resource_config(type_name, &config)?
            };
            print_json(&validated)
        }
        Command::Create { type_name, file } => {
            let config = load_tree(file)?;
            let state = connect(args)?.create(type_name, &config).await?;
            print_state(&state)
        }
        Command::Read { type_name, id, state } => {
            let prior = load_optional(state.as_ref())?;
            let outcome = connect(args)?.read(type_name, id, &prior).await?;
            print_outcome(type_name, id, outcome)
        }
        Command::Update {
            type_name,
            id,
            prior,
            file,
        } => {
            let prior = load_tree(prior)?;
            let config = load_tree(file)?;
            let state = connect(args)?.update(type_name, id, &prior, &config).await?;
            print_state(&state)
        }
        Command::Delete { type_name, id, state } => {
            let prior = load_optional(state.as_ref())?;
            connect(args)?.delete(type_name, id, &prior).await?;
            Ok(())
        }
        Command::Import { type_name, id } => {
            let outcome = connect(args)?.import(type_name, id).await?;
            print_outcome(type_name, id, outcome)
        }
        Command::Data { type_name, file } => {
            let config = load_optional(file.as_ref())?;
            let state = connect(args)?.read_data_source(type_name, &config).await?;
            print_state(&state)
        }
        Command::Configure { base_url } => {
            let mut stored = StoredConfig::load();
            stored.set_base_url(base_url).context("failed to save configuration")?;
            if let Some(path) = StoredConfig::config_path() {
                eprintln!("Saved base URL to {}", path.display());
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    if let Err(err) = run(&args).await {
        // Provider failures are reported as diagnostics, anything else as an anyhow chain
        let Some(provider_err) = err.downcast_ref::<ProviderError>() else {
            return Err(err);
        };
        tracing::error!("{}", provider_err);
        report(&Diagnostic::from(provider_err));
        std::process::exit(1);
    }

    Ok(())
}
