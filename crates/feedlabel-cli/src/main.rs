mod cli;
mod output;
mod request;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use feedlabel_ai::{HfTokenizer, OnnxClassifier, OnnxInference};
use feedlabel_core::{AppConfig, ConfigError, ModelConfig, parse_day};
use feedlabel_service::{RecordService, ServiceError};
use feedlabel_store::{DuckConnector, ResilientStore, records};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use output::{Classified, Failure, Message, print_json};

type Service<'a> = RecordService<'a, DuckConnector, HfTokenizer, OnnxClassifier>;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_inference(model: &ModelConfig) -> anyhow::Result<OnnxInference> {
    OnnxInference::load(model.model_dir(), model.max_length, model.device)
        .context("loading classifier")
}

fn open_store(cli: &Cli) -> anyhow::Result<ResilientStore<DuckConnector>> {
    let path = cli
        .db
        .as_deref()
        .ok_or(ConfigError::Missing("database path (FEEDLABEL_DB)"))?;
    ResilientStore::open(DuckConnector::file(path))
        .with_context(|| format!("opening database {}", path.display()))
}

/// Startup failures come back as `Err`; request failures are printed and
/// turned into a failing exit code.
fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    info!("feedlabel v{}", env!("CARGO_PKG_VERSION"));

    if let Command::InitDb = cli.command {
        let store = open_store(&cli)?;
        records::ensure_schema(&store).context("creating schema")?;
        print_json(&Message::new(format!("table {} ready", records::TABLE)))?;
        return Ok(ExitCode::SUCCESS);
    }

    if let Command::Classify { text } = &cli.command {
        let model = ModelConfig::new(cli.model_dir.clone(), cli.max_length, cli.device)?;
        let inference = load_inference(&model)?;
        return respond(inference.prediction(text).map_err(ServiceError::from).map(|prediction| {
            let label_name = inference.label_name(prediction.label);
            Classified {
                prediction,
                label_name,
            }
        }));
    }

    let config = AppConfig::new(cli.db.clone(), cli.model_dir.clone(), cli.max_length, cli.device)?;
    let inference = load_inference(&config.model)?;
    let store = ResilientStore::open(DuckConnector::file(config.database()))
        .with_context(|| format!("opening database {}", config.database().display()))?;
    let service: Service<'_> = RecordService::new(&inference, &store);

    let code = dispatch(&service, cli.command)?;
    if store.reconnects() > 0 {
        info!(reconnects = store.reconnects(), "database connection was re-established");
    }
    Ok(code)
}

fn dispatch(service: &Service<'_>, command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Create { json } => {
            respond(request::read_fields(&json).map_err(ServiceError::from).and_then(|fields| {
                service.create_record(fields)
            }))
        }
        Command::ByDate { date } => respond(
            parse_day(&date)
                .map_err(ServiceError::from)
                .and_then(|day| service.label_by_date(day)),
        ),
        Command::ById { id } => match service.label_by_id(id) {
            Ok(Some(record)) => respond(Ok(record)),
            Ok(None) => respond(Ok(Message::new("comment not found"))),
            Err(e) => respond::<Message>(Err(e)),
        },
        Command::Recent { days } => respond(
            request::day_count(days)
                .map_err(ServiceError::from)
                .and_then(|n| service.label_recent_days(n)),
        ),
        Command::LabelRecent { days } => respond(
            request::day_count(days)
                .map_err(ServiceError::from)
                .and_then(|n| service.label_and_persist_recent_days(n))
                .map(Message::labelled),
        ),
        Command::Classify { .. } | Command::InitDb => {
            anyhow::bail!("command does not go through the record service")
        }
    }
}

/// Print a request outcome on stdout.
fn respond<T: serde::Serialize>(outcome: Result<T, ServiceError>) -> anyhow::Result<ExitCode> {
    match outcome {
        Ok(value) => {
            print_json(&value)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(status = e.status_code(), error = %e, "request failed");
            print_json(&Failure::from(&e))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
