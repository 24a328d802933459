//! nimo-at - command-line access to a NIMO modem
//!
//! Sends raw AT commands and decodes message queues and location reports
//! for scripting and bench testing.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use nimo_modem::config::{self, ModemConfig};
use nimo_modem::core::message::{decode_records, Direction, Manufacturer, MessageRecord};
use nimo_modem::core::transport::list_ports;
use nimo_modem::{
    AtCommandTransport, AtOutcome, CrcXmodem, LocationSnapshot, NmeaLocationDecoder,
    SerialChannel,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Exit code for a timed out command
const EXIT_TIMEOUT: u8 = 4;
/// Exit code for an error or checksum failure reported by the modem
const EXIT_PROTOCOL_ERROR: u8 = 9;

/// CLI output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format for scripting
    Json,
}

/// NIMO modem CLI
#[derive(Parser, Debug)]
#[command(
    name = "nimo-at",
    version,
    about = "AT command access to NIMO satellite modems",
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, env = "NIMO_CONFIG")]
    config: Option<PathBuf>,

    /// Serial port name (e.g., COM3, /dev/ttyUSB0)
    #[arg(short, long, env = "NIMO_PORT")]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Modem manufacturer (orbcomm, quectel)
    #[arg(short, long)]
    manufacturer: Option<Manufacturer>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log parser internals
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available serial ports
    ListPorts,

    /// Send one AT command and print the response
    Send {
        /// Command text, e.g. AT+GSN
        command: String,

        /// Response prefix to remove, e.g. +GSN:
        #[arg(long)]
        prefix: Option<String>,

        /// Append a CRC even when CRC mode is off
        #[arg(long)]
        crc: bool,

        /// Response timeout (seconds)
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// List mobile-originated message states
    MoStates {
        /// Override the vendor query command
        #[arg(long)]
        command: Option<String>,
    },

    /// List mobile-terminated message states
    MtStates {
        /// Override the vendor query command
        #[arg(long)]
        command: Option<String>,
    },

    /// Decode a location from the modem or from NMEA text
    Location {
        /// GNSS query command
        #[arg(long, default_value = "AT%GPS=15,14,\"RMC\",\"GGA\",\"GSA\"")]
        command: String,

        /// Response prefix of the query
        #[arg(long, default_value = "%GPS:")]
        prefix: String,

        /// Decode sentences from a file instead of querying the modem
        #[arg(long)]
        nmea: Option<PathBuf>,

        /// Response timeout (seconds)
        #[arg(short, long, default_value = "20")]
        timeout: u64,
    },

    /// Wait for unsolicited result codes
    Urc {
        /// Line prefix (defaults to the manufacturer's)
        #[arg(long)]
        prefix: Option<String>,

        /// How long to listen (seconds)
        #[arg(short, long, default_value = "60")]
        duration: u64,
    },

    /// Compute the CRC suffix of a command
    Crc {
        /// Command text
        command: String,

        /// Initial CRC register
        #[arg(long, default_value = "0", value_parser = parse_u16)]
        seed: u16,
    },
}

fn parse_u16(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| e.to_string())
}

fn load_config(cli: &Cli) -> anyhow::Result<ModemConfig> {
    let mut config = match &cli.config {
        Some(path) => ModemConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ModemConfig::load_default()?,
    };
    if let Some(port) = &cli.port {
        config.serial.port.clone_from(port);
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(manufacturer) = cli.manufacturer {
        config.manufacturer = manufacturer;
    }
    if cli.verbose {
        config.at.trace = true;
        config.nmea.trace = true;
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(config: &ModemConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_modem(config: &ModemConfig) -> anyhow::Result<AtCommandTransport<SerialChannel>> {
    let channel = SerialChannel::open(config.serial.clone())
        .with_context(|| format!("opening {}", config.serial.port))?;
    Ok(AtCommandTransport::with_settings(channel, &config.at))
}

fn exit_code(outcome: AtOutcome) -> ExitCode {
    match outcome {
        AtOutcome::Ok => ExitCode::SUCCESS,
        AtOutcome::Timeout => ExitCode::from(EXIT_TIMEOUT),
        _ => ExitCode::from(EXIT_PROTOCOL_ERROR),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config, cli.verbose);

    tracing::debug!("{} v{} ({})", nimo_modem::NAME, nimo_modem::VERSION, config.manufacturer);
    if let Some(path) = config::config_path().filter(|_| cli.config.is_none()) {
        tracing::debug!("Default configuration path: {}", path.display());
    }

    match &cli.command {
        Commands::ListPorts => {
            for port in list_ports()? {
                println!("{} [{:?}]", port.port_name, port.port_type);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Send { command, prefix, crc, timeout } => {
            let mut modem = open_modem(&config)?;
            let timeout = timeout.map_or(config.at.timeout(), Duration::from_secs);
            modem.send(command, *crc).await?;
            let outcome = modem.parse(prefix.as_deref(), timeout, None).await?;
            let response = modem.get_response();
            match cli.format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({
                        "outcome": outcome,
                        "code": outcome.code() as i32,
                        "response": response,
                    })
                ),
                OutputFormat::Text => {
                    if !response.is_empty() {
                        println!("{response}");
                    }
                    println!("{outcome}");
                }
            }
            Ok(exit_code(outcome))
        }
        Commands::MoStates { command } => {
            list_states(&cli, &config, Direction::MobileOriginated, command.as_deref()).await
        }
        Commands::MtStates { command } => {
            list_states(&cli, &config, Direction::MobileTerminated, command.as_deref()).await
        }
        Commands::Location { command, prefix, nmea, timeout } => {
            let decoder = NmeaLocationDecoder::new()
                .resolution(config.nmea.resolution)
                .trace(config.nmea.trace);
            let text = match nmea {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut modem = open_modem(&config)?;
                    modem.send(command, false).await?;
                    let outcome = modem
                        .parse(Some(prefix), Duration::from_secs(*timeout), None)
                        .await?;
                    if !outcome.is_ok() {
                        eprintln!("Location query failed: {outcome}");
                        return Ok(exit_code(outcome));
                    }
                    modem.get_response()
                }
            };
            print_location(&cli, &decoder.decode_text(&text))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Urc { prefix, duration } => {
            let Some(prefix) = prefix
                .as_deref()
                .or(config.manufacturer.profile().urc_prefix)
            else {
                bail!("{} modems do not report unsolicited codes", config.manufacturer);
            };
            let mut modem = open_modem(&config)?;
            let deadline = tokio::time::Instant::now() + Duration::from_secs(*duration);
            while tokio::time::Instant::now() < deadline {
                if let Some(code) = modem.get_unsolicited_code(prefix).await? {
                    println!("{code}");
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Crc { command, seed } => {
            println!("{}", CrcXmodem::with_seed(*seed).apply(command));
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn list_states(
    cli: &Cli,
    config: &ModemConfig,
    direction: Direction,
    command: Option<&str>,
) -> anyhow::Result<ExitCode> {
    let profile = config.manufacturer.profile();
    let query = match direction {
        Direction::MobileOriginated => profile.mo_states,
        Direction::MobileTerminated => profile.mt_states,
    };
    let command = command.map_or_else(|| profile.command(query, None), str::to_string);
    let prefix = profile.prefix(query);

    let mut modem = open_modem(config)?;
    let (outcome, response) = modem.exchange(&command, Some(&prefix)).await?;
    if !outcome.is_ok() {
        eprintln!("{command} failed: {outcome}");
        return Ok(exit_code(outcome));
    }

    let records = decode_records(&response, direction, config.manufacturer);
    print_records(cli, &records)?;
    Ok(ExitCode::SUCCESS)
}

fn print_records(cli: &Cli, records: &[MessageRecord]) -> anyhow::Result<()> {
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No messages.");
            }
            for record in records {
                println!(
                    "{:<12} SIN {:>3} {:?} {:?} {}/{} bytes",
                    record.name,
                    record.sin,
                    record.priority,
                    record.state,
                    record.bytes_delivered,
                    record.length
                );
            }
        }
    }
    Ok(())
}

fn print_location(cli: &Cli, location: &LocationSnapshot) -> anyhow::Result<()> {
    match cli.format {
        OutputFormat::Json => println!("{}", location.to_json()?),
        OutputFormat::Text => {
            if !location.has_position() {
                println!("No position fix.");
                return Ok(());
            }
            println!("Time:       {}", location.time_iso());
            println!("Latitude:   {:.5}", location.latitude);
            println!("Longitude:  {:.5}", location.longitude);
            println!("Altitude:   {:.1} m", location.altitude);
            println!("Speed:      {:.1} kn", location.speed);
            println!("Heading:    {:.0}", location.heading);
            println!("Fix:        {:?} ({:?})", location.fix_type, location.fix_quality);
            println!("Satellites: {}", location.satellites);
            println!(
                "DOP:        P {:.1} H {:.1} V {:.1}",
                location.pdop, location.hdop, location.vdop
            );
        }
    }
    Ok(())
}
