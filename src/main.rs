use anyhow::Context;
use clap::Parser;
use std::fs;
use std::io::Read;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use lockgraph::config::{CommandLineArgs, Config};
use lockgraph::deadlock::{DeadlockAnalyzer, EventRecord, compatibility_matrix};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = CommandLineArgs::parse();
    let config = Config::load(&args)?;
    // Keep the guard alive for the lifetime of the process
    let _log_guard = init_tracing(&config)?;

    if args.compat_matrix {
        print_json(&compatibility_matrix(), args.pretty)?;
        return Ok(());
    }

    let input = read_input(&args)?;
    let event = if args.event_json {
        serde_json::from_str::<EventRecord>(&input).context("input is not an event-record JSON")?
    } else {
        EventRecord::from_message(input)
    };

    let analyzer =
        DeadlockAnalyzer::with_critical_tables(config.analyzer.critical_tables.clone());
    match analyzer.analyze_event(&event) {
        Some(info) => print_json(&info, args.pretty)?,
        None => {
            tracing::info!("no deadlock diagnostic recognized in input");
            println!("null");
        },
    }

    Ok(())
}

/// Initialize tracing to stderr, optionally teeing into a log file.
/// Stdout is reserved for the JSON result.
fn init_tracing(
    config: &Config,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_new(&config.logging.level)
        .with_context(|| format!("invalid logging level {:?}", config.logging.level))?;

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if let Some(path) = &config.logging.file {
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open log file {path}"))?;
        let (writer, guard) = tracing_appender::non_blocking(file);
        let file_layer = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer);
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry().with(filter).with(stderr_layer).init();
        Ok(None)
    }
}

fn read_input(args: &CommandLineArgs) -> anyhow::Result<String> {
    match &args.input {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("cannot read input file {path}"))
        },
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("cannot read message from stdin")?;
            Ok(buffer)
        },
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
