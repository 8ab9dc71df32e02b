use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use glob::glob;
use tracekit_core::{
    ErrorKind, OutputOption, OutputTrace, Packet, Registry, Trace, TraceError, TraceOption,
    parse_uri,
};
use tracing_subscriber::EnvFilter;

mod summary;

use summary::{REPORT_VERSION, Report, TraceSummary};

#[derive(Parser, Debug)]
#[command(name = "tracekit")]
#[command(version)]
#[command(
    about = "Read, filter and convert packet traces (pcap, pcapng, ERF, relays, live interfaces).",
    long_about = None,
    after_help = "Examples:\n  tracekit info pcapfile:capture.pcap --pretty\n  tracekit copy erf:in.erf.gz pcapfile:web.pcap --filter 'tcp port 80'\n  tracekit formats"
)]
struct Cli {
    /// Log more (repeat for trace-level output). RUST_LOG overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Summarise one or more traces as a versioned JSON report.
    #[command(
        after_help = "File locations may be glob patterns:\n  tracekit info 'pcapfile:captures/*.pcap'"
    )]
    Info {
        /// Trace URIs (format:location)
        #[arg(required = true)]
        uris: Vec<String>,

        /// Only count packets matching this filter expression
        #[arg(long)]
        filter: Option<String>,

        /// Truncate packets to this many bytes before counting
        #[arg(long)]
        snaplen: Option<u32>,

        /// Put a live interface into promiscuous mode
        #[arg(long)]
        promisc: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Copy packets from one trace to another, converting formats.
    Copy {
        /// Input trace URI
        input: String,

        /// Output trace URI
        output: String,

        #[arg(long)]
        filter: Option<String>,

        #[arg(long)]
        snaplen: Option<u32>,

        #[arg(long)]
        promisc: bool,

        /// Gzip level for the output (0-9)
        #[arg(long)]
        compress: Option<u32>,

        /// Append to the output file instead of replacing it
        #[arg(long)]
        append: bool,

        /// Extra output option as key=value (repeatable)
        #[arg(short = 'O', long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,

        /// Stop after this many packets
        #[arg(short = 'c', long)]
        count: Option<u64>,

        /// Suppress the summary line
        #[arg(long)]
        quiet: bool,
    },

    /// List the registered trace formats.
    Formats,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Info {
            uris,
            filter,
            snaplen,
            promisc,
            pretty,
        } => cmd_info(
            &uris,
            &InputArgs {
                filter,
                snaplen,
                promisc,
            },
            pretty,
        ),
        Commands::Copy {
            input,
            output,
            filter,
            snaplen,
            promisc,
            compress,
            append,
            options,
            count,
            quiet,
        } => cmd_copy(CopyArgs {
            input,
            output,
            source: InputArgs {
                filter,
                snaplen,
                promisc,
            },
            compress,
            append,
            options,
            count,
            quiet,
        }),
        Commands::Formats => {
            cmd_formats();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

impl From<TraceError> for CliError {
    fn from(err: TraceError) -> Self {
        let hint = match err.kind() {
            ErrorKind::BadFormat => Some("URIs look like format:location; run `tracekit formats`"),
            ErrorKind::InitFailed => Some("check that the location exists and is readable"),
            ErrorKind::NoConversion => Some("choose an output format that supports this link type"),
            ErrorKind::OptionUnavailable => Some("this format does not support the option"),
            _ => None,
        };
        CliError::new(err.to_string(), hint.map(str::to_string))
    }
}

/// Input options shared by `info` and `copy`.
struct InputArgs {
    filter: Option<String>,
    snaplen: Option<u32>,
    promisc: bool,
}

fn cmd_info(uris: &[String], input: &InputArgs, pretty: bool) -> Result<(), CliError> {
    let mut traces = Vec::new();
    for pattern in uris {
        for uri in expand_uri(pattern)? {
            traces.push(summarise(&uri, input)?);
        }
    }
    let report = Report {
        report_version: REPORT_VERSION,
        traces,
    };
    let json = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("JSON serialization failed")?;
    println!("{json}");
    Ok(())
}

fn open_input(uri: &str, input: &InputArgs) -> Result<Trace, CliError> {
    let mut trace = Trace::create(uri)?;
    if let Some(expr) = &input.filter {
        trace.config_str(&format!("filter={expr}"))?;
    }
    if let Some(len) = input.snaplen {
        trace.config(TraceOption::Snaplen(len))?;
    }
    if input.promisc {
        trace.config(TraceOption::Promisc(true))?;
    }
    trace.start()?;
    Ok(trace)
}

fn summarise(uri: &str, input: &InputArgs) -> Result<TraceSummary, CliError> {
    let mut trace = open_input(uri, input)?;
    let mut summary = TraceSummary::new(uri, trace.format_name());
    let mut packet = Packet::new();
    loop {
        match trace.read_packet(&mut packet) {
            Ok(0) => break,
            Ok(_) => summary.add(&packet),
            // a filter that does not compile fails every read
            Err(err) if err.kind() == ErrorKind::BadFormat => return Err(err.into()),
            Err(err) => {
                tracing::warn!(%uri, %err, "trace ended early");
                summary.error = Some(err.to_string());
                break;
            }
        }
    }
    summary.finish()?;
    trace.destroy();
    Ok(summary)
}

struct CopyArgs {
    input: String,
    output: String,
    source: InputArgs,
    compress: Option<u32>,
    append: bool,
    options: Vec<String>,
    count: Option<u64>,
    quiet: bool,
}

fn cmd_copy(args: CopyArgs) -> Result<(), CliError> {
    let input = single_uri(&args.input)?;
    let mut source = open_input(&input, &args.source)?;

    let mut sink = OutputTrace::create(&args.output)?;
    if let Some(level) = args.compress {
        sink.config(OutputOption::Compress(level))?;
    }
    if args.append {
        sink.config_str("fileflags=append")?;
    }
    for option in &args.options {
        sink.config_str(option)?;
    }
    sink.start()?;

    let mut packet = Packet::new();
    let mut written = 0u64;
    let mut skipped = 0u64;
    while args.count.is_none_or(|limit| written < limit) {
        if source.read_packet(&mut packet)? == 0 {
            break;
        }
        match sink.write_packet(&packet) {
            Ok(_) => written += 1,
            Err(err) if err.kind() == ErrorKind::NoConversion => {
                tracing::warn!(%err, "packet skipped");
                sink.take_error();
                skipped += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
    sink.destroy()?;
    source.destroy();

    if written == 0 && skipped > 0 {
        return Err(CliError::new(
            format!("none of the {skipped} packets could be written to {}", args.output),
            Some("choose an output format that supports this link type".to_string()),
        ));
    }
    if !args.quiet {
        eprintln!("OK: {written} packets written -> {} ({skipped} skipped)", args.output);
    }
    Ok(())
}

fn cmd_formats() {
    let registry = Registry::builtin();
    for entry in registry.entries() {
        let mut modes = Vec::new();
        if entry.input.is_some() {
            modes.push("read");
        }
        if entry.output.is_some() {
            modes.push("write");
        }
        let aliases = if entry.aliases.is_empty() {
            String::new()
        } else {
            format!(" (aliases: {})", entry.aliases.join(", "))
        };
        println!(
            "{:<10} {:<10} {}{}",
            entry.name,
            modes.join("+"),
            entry.description,
            aliases
        );
    }
}

/// Expand a glob in a file URI's location. Other URIs pass through.
fn expand_uri(uri: &str) -> Result<Vec<String>, CliError> {
    let parsed = parse_uri(uri)?;
    if !is_glob_pattern(&parsed.location) {
        return Ok(vec![uri.to_string()]);
    }

    let paths = glob(&parsed.location).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", parsed.location),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    let mut matches = Vec::new();
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", parsed.location),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(format!("{}:{}", parsed.format, path.display()));
        }
    }
    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", parsed.location),
            Some("check the path or quote the pattern".to_string()),
        ));
    }
    Ok(matches)
}

fn single_uri(uri: &str) -> Result<String, CliError> {
    let mut matches = expand_uri(uri)?;
    if matches.len() > 1 {
        let listed = matches.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple files match '{}' ({} matches); matches: {listed}{more}",
                uri,
                matches.len()
            ),
            Some("pass a single trace, or run once per file".to_string()),
        ));
    }
    Ok(matches.remove(0))
}

/// `[` alone does not count: relay locations use it for IPv6 hosts.
fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?')
}
