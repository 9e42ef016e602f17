//! WPS client CLI
//!
//! Entry point for the `wps-client` command-line tool.

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use wps_client::config::ClientConfig;
use wps_client::logging::{init_logging, LoggingGuard};
use wps_client::signal::{SignalHandler, SignalState};
use wps_client::{
    ArtifactStore, ClientContext, ClientError, ExitCode, FileInspector, HttpTransport, JobClient,
    JobDescriptor, JobStatus, JobSummary, MapfilePublisher, Output,
};

#[derive(Parser)]
#[command(name = "wps-client")]
#[command(about = "Run WPS processes and publish their outputs", version)]
struct Cli {
    /// Path to config file (default: ./wps-client.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Print a JSON summary instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Log filter, overrides [logging] level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a process, wait for it to finish and collect the outputs
    Run {
        #[command(flatten)]
        job: JobArgs,

        #[command(flatten)]
        watch: WatchArgs,
    },

    /// Submit a process and print its status location
    Submit {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Follow a job submitted earlier
    Watch {
        /// Status document URL printed by `submit`
        status_location: String,

        /// Requested output, as NAME or NAME=TITLE (repeatable)
        #[arg(long = "output", short = 'o', value_parser = parse_output)]
        outputs: Vec<(String, Option<String>)>,

        #[command(flatten)]
        watch: WatchArgs,
    },
}

#[derive(Args)]
struct JobArgs {
    /// WPS endpoint, e.g. http://host/wps
    server: String,

    /// Process identifier
    process: String,

    /// Input as NAME=VALUE (repeatable)
    #[arg(long = "input", short = 'i', value_parser = parse_input)]
    inputs: Vec<(String, String)>,

    /// Requested output, as NAME or NAME=TITLE (repeatable)
    #[arg(long = "output", short = 'o', value_parser = parse_output)]
    outputs: Vec<(String, Option<String>)>,
}

#[derive(Args)]
struct WatchArgs {
    /// Seconds between polls, overrides [polling] interval_seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Give up after this many polls, overrides [polling] max_polls
    #[arg(long)]
    max_polls: Option<u32>,

    /// Write a map file for the complex outputs once the job finishes
    #[arg(long)]
    publish: bool,

    /// Also write the JSON summary to this file
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::load(cli.config.as_deref(), cli_overrides(&cli)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(ExitCode::Config.as_i32());
        }
    };

    let _guard: LoggingGuard = match init_logging(&config.logging) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error initialising logging: {}", e);
            process::exit(ExitCode::Config.as_i32());
        }
    };

    let ctx = match client_context(&config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error creating HTTP client: {}", e);
            process::exit(ExitCode::Config.as_i32());
        }
    };

    let code = match cli.command {
        Commands::Run { job, watch } => run_job(&ctx, &config, job, &watch, cli.json),
        Commands::Submit { job } => run_submit(&ctx, job, cli.json),
        Commands::Watch {
            status_location,
            outputs,
            watch,
        } => run_watch(&ctx, &config, &status_location, outputs, &watch, cli.json),
    };

    process::exit(code.as_i32());
}

/// CLI flags as a config layer over file and defaults
fn cli_overrides(cli: &Cli) -> Option<Value> {
    let mut polling = Map::new();
    let watch = match &cli.command {
        Commands::Run { watch, .. } | Commands::Watch { watch, .. } => Some(watch),
        Commands::Submit { .. } => None,
    };
    if let Some(watch) = watch {
        if let Some(interval) = watch.interval {
            polling.insert("interval_seconds".to_string(), json!(interval));
        }
        if let Some(max) = watch.max_polls {
            polling.insert("max_polls".to_string(), json!(max));
        }
    }

    let mut layer = Map::new();
    if !polling.is_empty() {
        layer.insert("polling".to_string(), Value::Object(polling));
    }
    if let Some(level) = &cli.log_level {
        layer.insert("logging".to_string(), json!({ "level": level }));
    }

    (!layer.is_empty()).then_some(Value::Object(layer))
}

fn client_context(config: &ClientConfig) -> Result<ClientContext, wps_client::TransportError> {
    let transport = HttpTransport::new(&config.transport_config())?;
    Ok(ClientContext::new(
        Arc::new(transport),
        Arc::new(FileInspector::new()),
        ArtifactStore::new(config.data.artifacts_path.clone()),
        config.publish_settings(),
    ))
}

fn build_client(ctx: &ClientContext, job: JobArgs) -> Result<JobClient, ClientError> {
    let (names, titles) = split_outputs(job.outputs);
    let (input_names, input_values) = job.inputs.into_iter().unzip();
    let descriptor = JobDescriptor::new(job.process, input_names, input_values, names, titles)?;
    JobClient::build(ctx, job.server, &descriptor)
}

fn run_submit(ctx: &ClientContext, job: JobArgs, json_output: bool) -> ExitCode {
    let mut client = match build_client(ctx, job) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return e.exit_code();
        }
    };

    let code = match client.submit() {
        Ok(handle) => {
            if !json_output {
                println!("{}", handle.status_location());
            }
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };

    if json_output {
        print_summary(&JobSummary::from_client(&client).with_exit_code(code));
    }
    code
}

fn run_job(
    ctx: &ClientContext,
    config: &ClientConfig,
    job: JobArgs,
    watch: &WatchArgs,
    json_output: bool,
) -> ExitCode {
    let mut client = match build_client(ctx, job) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return e.exit_code();
        }
    };

    let submitted = client.submit().map(|handle| handle.status_location().to_string());
    match submitted {
        Ok(status_location) => {
            if !json_output {
                eprintln!("Submitted: {}", status_location);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            report(&client, e.exit_code(), watch, json_output);
            return e.exit_code();
        }
    }

    follow(&mut client, config, watch, json_output)
}

fn run_watch(
    ctx: &ClientContext,
    config: &ClientConfig,
    status_location: &str,
    outputs: Vec<(String, Option<String>)>,
    watch: &WatchArgs,
    json_output: bool,
) -> ExitCode {
    let (names, titles) = split_outputs(outputs);
    let mut client = JobClient::attach(ctx, status_location, &names, &titles);
    follow(&mut client, config, watch, json_output)
}

/// Poll until terminal, then optionally publish and report.
fn follow(client: &mut JobClient, config: &ClientConfig, watch: &WatchArgs, json_output: bool) -> ExitCode {
    let handler = SignalHandler::new();
    if let Err(e) = handler.install() {
        tracing::warn!(error = %e, "Could not install signal handler");
    }
    let signals = handler.state();

    let mut code = poll_loop(client, config, &signals, json_output);

    if code == ExitCode::Success && watch.publish {
        if let Err(e) = client.publish(&MapfilePublisher::new()) {
            eprintln!("Error: {}", e);
            code = e.exit_code();
        }
    }

    report(client, code, watch, json_output);
    code
}

fn poll_loop(
    client: &mut JobClient,
    config: &ClientConfig,
    signals: &SignalState,
    json_output: bool,
) -> ExitCode {
    let interval = Duration::from_secs(config.polling.interval_seconds);
    let mut polls: u32 = 0;

    loop {
        if signals.is_stop_requested() {
            tracing::info!("Stopped polling; the job keeps running on the server");
            return ExitCode::Cancelled;
        }

        polls += 1;
        match client.poll() {
            Ok(outcome) => {
                if !json_output {
                    eprintln!("[{}] {}", polls, outcome.status);
                }
                if outcome.terminal {
                    return match outcome.status {
                        JobStatus::Error { .. } => ExitCode::ProcessFailed,
                        _ => ExitCode::Success,
                    };
                }
            }
            // The status document may be briefly unavailable; keep polling.
            Err(ClientError::TransportFailure { reason }) => {
                tracing::warn!(poll = polls, "Status request failed: {}", reason);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                return e.exit_code();
            }
        }

        if config.polling.max_polls.is_some_and(|max| polls >= max) {
            tracing::warn!(polls, "Giving up after the configured number of polls");
            return ExitCode::Cancelled;
        }

        if !signals.sleep(interval) {
            tracing::info!("Stopped polling; the job keeps running on the server");
            return ExitCode::Cancelled;
        }
    }
}

fn report(client: &JobClient, code: ExitCode, watch: &WatchArgs, json_output: bool) {
    let summary = JobSummary::from_client(client).with_exit_code(code);

    if let Some(path) = &watch.summary {
        if let Err(e) = summary.write_to_file(path) {
            eprintln!("Warning: Could not write summary to {}: {}", path.display(), e);
        }
    }

    if json_output {
        print_summary(&summary);
    } else {
        print_human(&summary);
    }
}

fn print_summary(summary: &JobSummary) {
    match summary.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn print_human(summary: &JobSummary) {
    if let Some(message) = &summary.last_message {
        println!("{}", message);
    }
    if let Some(process_id) = &summary.process_id {
        println!("  Process: {}", process_id);
    }
    println!("  State: {}", summary.state);

    if !summary.outputs.is_empty() {
        println!("  Outputs:");
        for entry in &summary.outputs {
            match &entry.output {
                Output::Literal(lit) => println!("    {} = {}", entry.title, lit.value),
                Output::Complex(complex) => {
                    let location = complex
                        .local_path()
                        .map(|p| p.display().to_string())
                        .or_else(|| complex.reference().map(str::to_string))
                        .unwrap_or_else(|| "(inline)".to_string());
                    println!("    {} -> {}", entry.title, location);
                }
            }
        }
    }

    for warning in &summary.warnings {
        println!("  Warning: {}", warning);
    }

    if let Some(map_file) = &summary.map_file {
        println!("  Map file: {}", map_file.display());
    }
}

/// Separate output names from titles.
///
/// A partial title list no longer matches the outputs in count, so the
/// client shows every output under its name.
fn split_outputs(outputs: Vec<(String, Option<String>)>) -> (Vec<String>, Vec<String>) {
    let mut names = Vec::with_capacity(outputs.len());
    let mut titles = Vec::with_capacity(outputs.len());
    for (name, title) in outputs {
        names.push(name);
        if let Some(title) = title {
            titles.push(title);
        }
    }
    (names, titles)
}

fn parse_input(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{}'", arg)),
    }
}

fn parse_output(arg: &str) -> Result<(String, Option<String>), String> {
    let (name, title) = match arg.split_once('=') {
        Some((name, title)) => (name, Some(title.to_string())),
        None => (arg, None),
    };
    if name.is_empty() {
        return Err(format!("expected NAME or NAME=TITLE, got '{}'", arg));
    }
    Ok((name.to_string(), title))
}
