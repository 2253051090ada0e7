use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};

use logscope_api::{ApiClient, LogQuery};
use logscope_logs::{
    filter_records, to_csv, ClassificationFilter, FilterSpec, RecordBuffer, StreamConfig,
    StreamController,
};
use logscope_types::{Classification, LogLevel, LogRecord, LogUpdate};

mod config;

/// Logscope - a command line client for viewing and filtering security log streams
#[derive(Parser, Debug)]
#[command(name = "logscope")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "logscope.toml")]
    config: PathBuf,

    /// Backend base URL (overrides the config file)
    #[arg(long)]
    server: Option<String>,

    /// Poll interval in seconds for tailing (overrides the config file)
    #[arg(long)]
    interval: Option<u64>,

    /// Maximum records held in the window (overrides the config file)
    #[arg(long)]
    capacity: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch once and print matching records
    List(FilterArgs),

    /// Follow the stream, printing records as they arrive (Ctrl-C stops)
    Tail(FilterArgs),

    /// Fetch once and write matching records as CSV
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Fetch once and print level / classification tallies
    Stats,

    /// Update flags on one record
    Update {
        id: String,

        #[arg(long)]
        alert: Option<bool>,

        #[arg(long)]
        trigger: Option<bool>,

        /// One of: normal, suspicious, anomaly, critical
        #[arg(long)]
        classification: Option<Classification>,
    },

    /// Delete one record
    Delete { id: String },
}

/// Client-side narrowing criteria shared by list, tail and export
#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Case-insensitive text search over message, provider, channel and host
    #[arg(long)]
    search: Option<String>,

    #[arg(long)]
    level: Option<LogLevel>,

    #[arg(long)]
    channel: Option<String>,

    /// One of: normal, suspicious, anomaly, critical, unclassified
    #[arg(long)]
    classification: Option<ClassificationFilter>,

    /// Keep only records with the alert flag set (or unset, with false)
    #[arg(long)]
    alert: Option<bool>,

    #[arg(long)]
    trigger: Option<bool>,

    /// Inclusive lower timestamp bound (RFC 3339)
    #[arg(long)]
    from: Option<DateTime<Utc>>,

    /// Inclusive upper timestamp bound (RFC 3339)
    #[arg(long)]
    to: Option<DateTime<Utc>>,

    /// Single local calendar day (YYYY-MM-DD); shorthand for --from/--to
    #[arg(long, conflicts_with_all = ["from", "to"])]
    day: Option<NaiveDate>,
}

impl FilterArgs {
    /// Backend-side narrowing for the fields the `/logs` endpoint accepts;
    /// the full client-side filter still applies on top
    fn query(&self) -> LogQuery {
        LogQuery {
            channel: self.channel.clone(),
            level: self.level.as_ref().map(|l| l.as_str().to_string()),
            ..Default::default()
        }
    }

    fn into_spec(self) -> FilterSpec {
        let spec = FilterSpec {
            search_text: self.search,
            level: self.level,
            channel: self.channel,
            classification: self.classification,
            start_date: self.from,
            end_date: self.to,
            alert: self.alert,
            trigger: self.trigger,
        };
        match self.day {
            Some(day) => spec.on_day(day),
            None => spec,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load(
        &cli.config,
        cli.server.as_deref(),
        cli.interval,
        cli.capacity,
    )?;
    let client = ApiClient::new(&config.server_url);

    match cli.command {
        Command::List(filter) => {
            let query = filter.query();
            let spec = filter.into_spec();
            let records = client
                .fetch_logs(&query)
                .await
                .context("Failed to fetch logs")?;
            let matching = filter_records(&records, &spec);
            for record in &matching {
                print_record(record);
            }
            eprintln!("{} of {} records match", matching.len(), records.len());
        }

        Command::Tail(filter) => {
            let spec = filter.into_spec();
            let stream_config = StreamConfig {
                poll_interval: Duration::from_secs(config.poll_interval_secs),
                capacity: config.buffer_capacity,
            };
            let controller = StreamController::new(Arc::new(client), stream_config);
            controller
                .start()
                .await
                .context("Failed to start streaming")?;

            let mut printed: HashSet<String> = HashSet::new();
            let mut ticker = tokio::time::interval(stream_config.poll_interval);
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,

                    _ = ticker.tick() => {
                        // Oldest-first within the window, so output reads
                        // chronologically
                        let records = controller.buffer().filtered(&spec);
                        for record in records.iter().rev() {
                            if printed.insert(record.id.clone()) {
                                print_record(record);
                            }
                        }
                    }
                }
            }
            controller.stop();
        }

        Command::Export { filter, out } => {
            let query = filter.query();
            let spec = filter.into_spec();
            let records = client
                .fetch_logs(&query)
                .await
                .context("Failed to fetch logs")?;
            let matching = filter_records(&records, &spec);
            let csv = to_csv(&matching);

            match out {
                Some(path) => {
                    fs::write(&path, csv)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Exported {} records to {}", matching.len(), path.display());
                }
                None => print!("{csv}"),
            }
        }

        Command::Stats => {
            let records = client
                .fetch_logs(&LogQuery::default())
                .await
                .context("Failed to fetch logs")?;
            let buffer = RecordBuffer::new(records.len().max(1));
            buffer.merge_new(records);

            let levels = buffer.level_counts();
            println!("Levels:");
            println!("  information   {}", levels.information);
            println!("  warning       {}", levels.warning);
            println!("  error         {}", levels.error);
            println!("  critical      {}", levels.critical);
            println!("  other         {}", levels.other);

            let classes = buffer.classification_counts();
            println!("Classifications:");
            println!("  normal        {}", classes.normal);
            println!("  suspicious    {}", classes.suspicious);
            println!("  anomaly       {}", classes.anomaly);
            println!("  critical      {}", classes.critical);
            println!("  unclassified  {}", classes.unclassified);

            println!("Total: {}", levels.total());
        }

        Command::Update {
            id,
            alert,
            trigger,
            classification,
        } => {
            let update = LogUpdate {
                alert,
                trigger,
                classification,
            };
            client
                .update_log(&id, &update)
                .await
                .with_context(|| format!("Failed to update log {id}"))?;
            println!("Updated {id}");
        }

        Command::Delete { id } => {
            client
                .delete_log(&id)
                .await
                .with_context(|| format!("Failed to delete log {id}"))?;
            println!("Deleted {id}");
        }
    }

    Ok(())
}

fn print_record(record: &LogRecord) {
    let classification = record
        .classification
        .map(|c| format!(" ({c})"))
        .unwrap_or_default();
    let mut flags = String::new();
    if record.alert {
        flags.push_str(" !alert");
    }
    if record.trigger {
        flags.push_str(" !trigger");
    }

    println!(
        "{} [{}] {} {}{}{} | {}",
        record.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        record.level,
        record.event_host,
        record.provider,
        classification,
        flags,
        record.display_message()
    );
}
