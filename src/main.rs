#![forbid(unsafe_code)]

//! Command-line front end for the `tr64c` session client.
//!
//! Wraps the library operations for quick use from a shell: print the `tr64c`
//! version, scan for devices, list device actions, run a single query, or
//! print the host table of a router.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use tr64c_session::{ops, AppError, ClientConfig, Result, Session};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "tr64c-session", about = "Drive tr64c from the command line", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the `tr64c` executable; overrides the configuration file.
    #[arg(long)]
    executable: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the `tr64c` version.
    Version,

    /// Discover devices on a local network interface.
    Scan {
        /// Local interface IP address to scan from.
        interface: String,
        /// Discovery timeout in milliseconds.
        #[arg(long, default_value_t = 1000)]
        timeout_ms: u64,
    },

    /// List the services and actions of a device.
    List {
        /// Device description URL.
        host: String,
    },

    /// Invoke one action and print its result.
    Query {
        /// Device description URL.
        host: String,
        /// Action path, `[device/]service/action`.
        action: String,
        /// Arguments of the form `Variable=value`.
        args: Vec<String>,
    },

    /// Print the MAC address, IP address and name of every known host.
    Hosts {
        /// Device description URL.
        host: String,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut config = match (&args.config, &args.executable) {
        (Some(path), executable) => {
            let mut config = ClientConfig::load_from_path(path)?;
            if let Some(executable) = executable {
                config.executable.clone_from(executable);
            }
            config
        }
        (None, Some(executable)) => ClientConfig::new(executable),
        (None, None) => {
            return Err(AppError::Config(
                "either --config or --executable is required".into(),
            ))
        }
    };

    match args.command {
        Command::Version => match ops::version(&config.executable).await? {
            Some(ver) => println!(
                "Using tr64c version {} with backend {}.",
                ver.version, ver.backend
            ),
            None => println!("Unrecognised tr64c version output."),
        },
        Command::Scan {
            interface,
            timeout_ms,
        } => {
            let devices = ops::scan_devices(&config.executable, &interface, timeout_ms).await?;
            for device in &devices {
                println!("Found {} at {}.", device.device, device.url);
            }
        }
        Command::List { host } => {
            config.load_credentials().await?;
            let mut session = Session::open(&config.session(host))?;
            print_json(&session.list().await?)?;
            session.close().await?;
        }
        Command::Query { host, action, args } => {
            config.load_credentials().await?;
            let mut session = Session::open(&config.session(host))?;
            print_json(&session.query(&action, &args).await?)?;
            session.close().await?;
        }
        Command::Hosts { host } => {
            config.load_credentials().await?;
            let mut session = Session::open(&config.session(host))?;
            print_hosts(&mut session).await?;
            session.close().await?;
        }
    }

    Ok(())
}

async fn print_hosts(session: &mut Session) -> Result<()> {
    let count = session
        .query("Hosts/GetHostNumberOfEntries", &[] as &[&str])
        .await?["HostNumberOfEntries"]
        .as_u64()
        .ok_or_else(|| AppError::Protocol("HostNumberOfEntries missing or not a number".into()))?;
    info!(count, "host entries reported");

    println!("{:17}  {:15}  Host", "MAC", "IP");
    for index in 0..count {
        let record = session
            .query(
                "Hosts/GetGenericHostEntry",
                &[format!("HostNumberOfEntries={index}")],
            )
            .await?;
        println!(
            "{:17}  {:15}  {}",
            text(&record["MACAddress"]),
            text(&record["IPAddress"]),
            text(&record["HostName"])
        );
    }
    Ok(())
}

fn text(value: &Value) -> &str {
    value.as_str().unwrap_or("")
}

fn print_json(value: &Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Protocol(format!("failed to render response: {err}")))?;
    println!("{rendered}");
    Ok(())
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
