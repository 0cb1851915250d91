#![forbid(unsafe_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use spoolscan::config::ScannerConfig;
use spoolscan::core::models::{ScanOutcome, SpoolRecord, TagUid};
use spoolscan::core::record_codec;
use spoolscan::core::scan_service::{ScanReport, ScanService};
use spoolscan::error::{DecodeError, Result, SpoolError};
use spoolscan::transport::DumpTransport;
use spoolscan::ui::app::{App, Scanner};

#[derive(Parser)]
#[command(name = "spoolscan", version, about = "Read filament spool tags")]
struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug output on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the candidate sector keys for a tag UID
    Derive {
        /// Tag UID in hex
        #[arg(long)]
        uid: String,

        /// Number of keys (defaults to the configured count)
        #[arg(long)]
        count: Option<usize>,
    },

    /// Decode a name block and a color block given in hex
    Decode {
        name_block: String,
        color_block: String,
    },

    /// Authenticate against a tag and read its spool record
    Read {
        /// Tag dump to read instead of a live tag
        #[arg(long)]
        dump: Option<PathBuf>,

        /// Override the UID (defaults to the tag's own)
        #[arg(long)]
        uid: Option<String>,

        /// Read from a PC/SC reader
        #[arg(long)]
        pcsc: bool,

        /// Reader name to match (defaults to the configured reader)
        #[arg(long, requires = "pcsc")]
        reader: Option<String>,

        /// Show the result as a card in the terminal
        #[arg(long)]
        view: bool,
    },

    /// List connected PC/SC readers
    #[cfg(feature = "pcsc")]
    Readers,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = if let Some(ref config_path) = cli.config {
        ScannerConfig::load_from(config_path).unwrap_or_else(|e| {
            eprintln!("Warning: could not load config: {e}");
            ScannerConfig::default()
        })
    } else {
        ScannerConfig::load().unwrap_or_else(|_| ScannerConfig::default())
    };

    let viewing = matches!(cli.command, Commands::Read { view: true, .. });
    if !viewing {
        init_tracing(&config.log_filter, cli.verbose);
    }

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(default_filter: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("spoolscan=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(command: Commands, config: &ScannerConfig) -> Result<ExitCode> {
    match command {
        Commands::Derive { uid, count } => {
            let mut params = config.scan_params()?;
            if let Some(count) = count {
                params.derivation.key_count = count;
            }
            let uid = TagUid::from_hex(&uid)?;
            let keys = ScanService::new(params).derive_keys(&uid)?;

            println!("Tag UID: {uid}");
            for (index, key) in keys.iter().enumerate() {
                println!("{:>3}  {}", index + 1, key.to_hex());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Decode {
            name_block,
            color_block,
        } => {
            let name_block = hex::decode(name_block)?;
            let color_block = hex::decode(color_block)?;
            let record = match record_codec::decode_blocks(&name_block, &color_block) {
                Ok(record) => record,
                Err(e @ DecodeError::NonAscii { .. }) => {
                    warn!(error = %e, "name block is not ASCII");
                    SpoolRecord::unknown()
                }
                Err(e) => return Err(e.into()),
            };
            print_record(&record);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Read {
            dump,
            uid,
            pcsc,
            reader,
            view,
        } => {
            let service = ScanService::new(config.scan_params()?);
            let uid = uid.as_deref().map(TagUid::from_hex).transpose()?;

            let mut scanner: Scanner = match (dump, pcsc) {
                (Some(path), false) => dump_scanner(service, path, uid),
                (None, true) => {
                    let reader = reader.or_else(|| config.reader.clone());
                    pcsc_scanner(service, reader, uid)?
                }
                _ => {
                    return Err(SpoolError::Config(
                        "pass exactly one of --dump <FILE> or --pcsc".to_string(),
                    ))
                }
            };

            let report = scanner()?;
            if view {
                let mut terminal = ratatui::init();
                let result = App::with_report(scanner, report).run(&mut terminal);
                ratatui::restore();
                result?;
                return Ok(ExitCode::SUCCESS);
            }

            println!("Tag UID: {}", report.uid);
            print_record(&report.outcome.display_record());
            match report.outcome {
                ScanOutcome::Decoded(_) => Ok(ExitCode::SUCCESS),
                ScanOutcome::AuthenticationFailed => Ok(ExitCode::from(2)),
                ScanOutcome::ReadError(reason) => {
                    eprintln!("{reason}");
                    Ok(ExitCode::from(3))
                }
            }
        }
        #[cfg(feature = "pcsc")]
        Commands::Readers => {
            for name in spoolscan::transport::PcscTransport::list_readers()? {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_record(record: &SpoolRecord) {
    println!("Filament Name: {}", record.name);
    println!("Filament Color: {}", record.color);
}

/// Scan a dump file, re-reading it from disk on every scan.
fn dump_scanner(service: ScanService, path: PathBuf, uid: Option<TagUid>) -> Scanner {
    Box::new(move || scan_dump(&service, &path, uid.clone()))
}

fn scan_dump(service: &ScanService, path: &Path, uid: Option<TagUid>) -> Result<ScanReport> {
    let mut transport = DumpTransport::open(path)?;
    let uid = uid.unwrap_or_else(|| transport.uid());
    service.scan(&mut transport, uid)
}

/// Scan whatever tag is on the reader, reconnecting on every scan.
#[cfg(feature = "pcsc")]
fn pcsc_scanner(
    service: ScanService,
    reader: Option<String>,
    uid: Option<TagUid>,
) -> Result<Scanner> {
    use spoolscan::transport::PcscTransport;

    Ok(Box::new(move || {
        let mut transport = PcscTransport::new(reader.as_deref())?;
        tracing::info!(reader = %transport.reader_name(), "scanning on PC/SC reader");
        let tag_uid = match &uid {
            Some(uid) => uid.clone(),
            None => transport.read_uid()?,
        };
        service.scan(&mut transport, tag_uid)
    }))
}

#[cfg(not(feature = "pcsc"))]
fn pcsc_scanner(
    _service: ScanService,
    _reader: Option<String>,
    _uid: Option<TagUid>,
) -> Result<Scanner> {
    Err(SpoolError::Config(
        "spoolscan was built without the `pcsc` feature".to_string(),
    ))
}
