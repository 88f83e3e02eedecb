//! certinfo: check a TLS server's certificate chain against several trust stores.

use anyhow::{Context, Result};
use certinfo_lib::config::Config;
use certinfo_lib::report::{renderer_for, OutputFormat};
use certinfo_lib::tls::OpensslConnector;
use certinfo_lib::{scan_server, ScanCommand, ServerTarget, TrustStoreRepository};
use clap::Parser;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "certinfo",
    about = "Check a TLS server's certificate chain against several trust stores",
    long_about = "certinfo connects to each server once per trust store, collects the\n\
                  certificate chain and the TLS library's verdict, and reports chain\n\
                  order, anchor inclusion, SHA-1 usage, hostname match, Extended\n\
                  Validation and the stapled OCSP response.\n\n\
                  Trust stores come from the configuration file; without one the\n\
                  system trust store is used.",
    after_help = "EXAMPLES:\n\
                  \n  certinfo www.example.com\
                  \n  certinfo example.com:8443 [2001:db8::1]:443\
                  \n  certinfo --sni www.example.com 192.0.2.10\
                  \n  certinfo --ca-file corp-root.pem intranet.example\
                  \n  certinfo --json --print-full-certificate www.example.com"
)]
struct Cli {
    /// Servers to scan: host, host:port, [v6] or [v6]:port (default port 443)
    #[arg(required = true, value_name = "TARGET")]
    targets: Vec<String>,

    /// Also validate against the anchors in this PEM file
    #[arg(long, value_name = "FILE")]
    ca_file: Option<PathBuf>,

    /// Print every field of the leaf certificate instead of a summary
    #[arg(long)]
    print_full_certificate: bool,

    /// Server name to send in SNI (default: the target's host)
    #[arg(long, value_name = "NAME")]
    sni: Option<String>,

    /// Report format (text or json)
    #[arg(long, value_name = "FORMAT", conflicts_with = "json")]
    format: Option<OutputFormat>,

    /// Shorthand for --format json
    #[arg(long)]
    json: bool,

    /// Socket timeout, e.g. "5", "10s", "1m" (default: 5s)
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// Configuration file (default: the platform config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log filter, e.g. "info" or "certinfo_lib=debug"
    #[arg(long, value_name = "FILTER", default_value = "warn")]
    log_level: String,
}

/// Parse a duration string into a `Duration`.
///
/// Plain numbers (e.g. "10") default to seconds. Otherwise, standard
/// humantime units are accepted: `ms`, `s`, `m`, `h`, etc.
fn parse_duration(s: &str) -> Result<Duration> {
    // Plain integer → treat as seconds
    if s.chars().all(|c| c.is_ascii_digit()) {
        let secs: u64 = s.parse().context("Invalid duration value")?;
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).with_context(|| format!("Invalid duration: '{s}'"))
}

fn init_logging(filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_new(filter).with_context(|| format!("Invalid log filter: '{filter}'"))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("Failed to install log subscriber")
}

fn parse_targets(cli: &Cli) -> Result<Vec<ServerTarget>> {
    cli.targets
        .iter()
        .map(|raw| -> Result<ServerTarget> {
            let target = ServerTarget::parse(raw)?;
            Ok(match &cli.sni {
                Some(sni) => target.with_sni(sni.clone()),
                None => target,
            })
        })
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let format = if cli.json {
        OutputFormat::Json
    } else {
        cli.format.or(config.format).unwrap_or_default()
    };
    let timeout = cli.timeout.unwrap_or_else(|| config.timeout_or_default());

    let repository =
        TrustStoreRepository::from_config(&config).context("Failed to load trust stores")?;
    let connector = OpensslConnector::new(timeout);
    let renderer = renderer_for(format);
    let command = ScanCommand {
        ca_file: cli.ca_file.clone(),
        print_full_certificate: cli.print_full_certificate,
    };
    let targets = parse_targets(&cli)?;

    tracing::info!(
        targets = targets.len(),
        stores = repository.all().len(),
        primary = %repository.primary(),
        ?timeout,
        "starting scan"
    );

    let reports: Vec<(String, Result<String>)> = targets
        .into_par_iter()
        .map(|target| {
            let label = target.address();
            let report = scan_server(&connector, &repository, target, &command)
                .and_then(|result| renderer.render(&result))
                .map_err(anyhow::Error::from);
            (label, report)
        })
        .collect();

    let mut failures = 0;
    for (label, report) in reports {
        match report {
            Ok(text) => println!("{}", text),
            Err(e) => {
                failures += 1;
                eprintln!("{}: {:#}", label, e);
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}
