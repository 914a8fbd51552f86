use std::{io::IsTerminal, mem, path::PathBuf, sync::Arc};

use chrono::Utc;
use clap::{ArgAction, Parser};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::{
    config::{self, Format},
    event::{BatchStatus, Event, VecBatch},
    get_version,
    sinks::influxdb::{
        AtomicStats, Connector, InfluxDbClient, MetricsStats, OutputStats, StatsSnapshot,
    },
    trace,
};

/// Publishes newline-delimited JSON events from stdin to InfluxDB.
#[derive(Parser, Debug)]
#[command(name = "influxdb-output", version, rename_all = "kebab-case")]
pub struct Opts {
    /// Read configuration from this file. The format is detected from the
    /// file name unless `--format` is given.
    #[arg(short, long, env = "INFLUXDB_OUTPUT_CONFIG")]
    pub config: PathBuf,

    /// Format of the configuration file: toml, yaml or json.
    #[arg(long)]
    pub format: Option<Format>,

    /// Enable more detailed internal logging. Repeat to increase level.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Reduce detail of internal logging. Repeat to reduce further.
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,

    /// Log in JSON.
    #[arg(long)]
    pub json_logs: bool,

    /// Check that InfluxDB is reachable and exit.
    #[arg(long)]
    pub healthcheck: bool,
}

impl Opts {
    pub fn get_matches() -> Self {
        Opts::parse()
    }

    pub fn log_level(&self) -> String {
        trace::levels(self.verbose, self.quiet)
    }
}

/// What became of the input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub invalid_lines: usize,
    pub batches_acked: usize,
    pub batches_failed: usize,
    /// Events of failed batches that would have to be sent again.
    pub events_not_written: usize,
    pub read_failed: bool,
}

impl Summary {
    pub fn exit_code(&self) -> exitcode::ExitCode {
        if self.read_failed {
            exitcode::IOERR
        } else if self.batches_failed > 0 {
            exitcode::UNAVAILABLE
        } else if self.invalid_lines > 0 {
            exitcode::DATAERR
        } else {
            exitcode::OK
        }
    }
}

pub async fn run(opts: Opts) -> exitcode::ExitCode {
    trace::init(
        std::io::stderr().is_terminal(),
        opts.json_logs,
        &opts.log_level(),
    );
    info!(message = "Starting influxdb-output.", version = %get_version());

    let config = match config::load_from_path(&opts.config, opts.format) {
        Ok(config) => config,
        Err(errors) => {
            for error in errors {
                error!(message = "Configuration error.", %error);
            }
            return exitcode::CONFIG;
        }
    };

    let stats = Arc::new((MetricsStats, AtomicStats::default()));
    let shared: Arc<dyn OutputStats> = Arc::clone(&stats) as Arc<dyn OutputStats>;
    let mut client = match config.build(shared) {
        Ok(client) => client,
        Err(error) => {
            error!(message = "Configuration error.", %error);
            return exitcode::CONFIG;
        }
    };

    if let Err(error) = client.connect() {
        error!(message = "Could not connect.", %error);
        return exitcode::CONFIG;
    }

    let code = if opts.healthcheck {
        match client.healthcheck().await {
            Ok(()) => {
                info!("Healthcheck passed.");
                exitcode::OK
            }
            Err(error) => {
                error!(message = "Healthcheck failed.", %error);
                exitcode::UNAVAILABLE
            }
        }
    } else {
        let stdin = BufReader::new(tokio::io::stdin());
        let summary = publish_lines(&mut client, stdin, config.batch.max_events).await;
        print_summary(&summary, &stats.1.snapshot());
        summary.exit_code()
    };

    match client.close() {
        Ok(()) => code,
        Err(error) => {
            error!(message = "Failed to close connection.", %error);
            exitcode::SOFTWARE
        }
    }
}

fn print_summary(summary: &Summary, stats: &StatsSnapshot) {
    println!(
        "batches: {} acked, {} failed; events: {} received, {} acked, {} dropped, {} not written; invalid lines: {}",
        summary.batches_acked,
        summary.batches_failed,
        stats.events,
        stats.acked,
        stats.dropped,
        summary.events_not_written,
        summary.invalid_lines,
    );
}

/// Reads one event per line and publishes them in batches of `max_events`.
///
/// Blank lines are ignored and invalid lines are skipped with a warning. A
/// failed batch is not sent again.
pub async fn publish_lines<C, R>(
    client: &mut InfluxDbClient<C>,
    reader: R,
    max_events: usize,
) -> Summary
where
    C: Connector,
    R: AsyncBufRead + Unpin,
{
    let mut summary = Summary::default();
    let mut pending = Vec::with_capacity(max_events);
    let mut lines = reader.lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match parse_event(&line) {
                    Ok(event) => pending.push(event),
                    Err(error) => {
                        warn!(message = "Skipping invalid event.", %error);
                        summary.invalid_lines += 1;
                    }
                }
                if pending.len() >= max_events {
                    publish(client, &mut pending, &mut summary).await;
                }
            }
            Ok(None) => break,
            Err(error) => {
                error!(message = "Failed to read input.", %error);
                summary.read_failed = true;
                break;
            }
        }
    }

    if !pending.is_empty() {
        publish(client, &mut pending, &mut summary).await;
    }
    summary
}

async fn publish<C: Connector>(
    client: &mut InfluxDbClient<C>,
    pending: &mut Vec<Event>,
    summary: &mut Summary,
) {
    let mut batch = VecBatch::new(mem::take(pending));
    match client.publish(&mut batch).await {
        Ok(()) => summary.batches_acked += 1,
        Err(error) => {
            error!(message = "Failed to publish batch.", %error);
            summary.batches_failed += 1;
            if let BatchStatus::Retry(events) = batch.into_status() {
                summary.events_not_written += events.len();
            }
        }
    }
}

fn parse_event(line: &str) -> crate::Result<Event> {
    let value = serde_json::from_str(line)?;
    Ok(Event::from_json(value, Utc::now())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::influxdb::{test_util::MockConnector, Field, InfluxDbConfig};

    fn client(connector: &MockConnector, max_events: usize) -> InfluxDbClient<MockConnector> {
        let mut config: InfluxDbConfig = toml::from_str(
            r#"
            address = "localhost:8086"
            database = "beats"
            measurement = "events"
            tag_fields = ["host"]
            "#,
        )
        .unwrap();
        config.batch.max_events = max_events;
        let stats: Arc<dyn OutputStats> = Arc::new(AtomicStats::default());
        let mut client = config.build_with(connector.clone(), stats).unwrap();
        client.connect().unwrap();
        client
    }

    #[test]
    fn parses_options() {
        let opts = Opts::try_parse_from([
            "influxdb-output",
            "--config",
            "/etc/influxdb-output.conf",
            "--format",
            "yaml",
            "-vv",
            "--json-logs",
        ])
        .unwrap();

        assert_eq!(opts.config, PathBuf::from("/etc/influxdb-output.conf"));
        assert_eq!(opts.format, Some(Format::Yaml));
        assert_eq!(opts.log_level(), "influxdb_output=trace");
        assert!(opts.json_logs);
        assert!(!opts.healthcheck);
    }

    #[tokio::test]
    async fn publishes_lines_in_batches() {
        let connector = MockConnector::new();
        let mut client = client(&connector, 2);
        let input = concat!(
            r#"{"timestamp": "2018-11-14T08:09:10Z", "fields": {"host": "a", "v": 1}}"#,
            "\n",
            "\n",
            r#"{"host": "b", "v": 2.5}"#,
            "\n",
            "not json\n",
            r#"{"host": "c", "msg": "hi"}"#,
            "\n",
        );

        let summary = publish_lines(&mut client, input.as_bytes(), 2).await;

        assert_eq!(
            summary,
            Summary {
                invalid_lines: 1,
                batches_acked: 2,
                ..Default::default()
            }
        );
        assert_eq!(summary.exit_code(), exitcode::DATAERR);

        let written = connector.written();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].len(), 2);
        assert_eq!(written[0][0].fields()["v"], Field::Int(1));
        assert_eq!(written[0][1].fields()["v"], Field::Float(2.5));
        assert_eq!(written[1][0].tags()["host"], "c");
    }

    #[tokio::test]
    async fn failed_batches_are_reported() {
        let connector = MockConnector::new();
        connector.fail_writes(true);
        let mut client = client(&connector, 10);
        let input = "{\"v\": 1}\n{\"host\": \"a\"}\n{\"v\": 3}\n";

        let summary = publish_lines(&mut client, input.as_bytes(), 10).await;

        assert_eq!(
            summary,
            Summary {
                batches_failed: 1,
                events_not_written: 2,
                ..Default::default()
            }
        );
        assert_eq!(summary.exit_code(), exitcode::UNAVAILABLE);
    }

    #[test]
    fn exit_codes() {
        assert_eq!(Summary::default().exit_code(), exitcode::OK);
        let summary = Summary {
            read_failed: true,
            batches_failed: 1,
            ..Default::default()
        };
        assert_eq!(summary.exit_code(), exitcode::IOERR);
    }
}
