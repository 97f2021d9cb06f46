use clap::Parser;
use serial_pair::config::{ConfigLoader, ConfigResult};
use serial_pair::controller::{list_pairs, ControllerSettings, SessionController};
use serial_pair::port::{PortNaming, SystemOpener};
use serial_pair::{logging, AppResult, WriteMode};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Send and receive text lines between two paired serial ports.",
    long_about = "Probes COM1..COMn, pairs the ports that open (1st with 2nd, 3rd with 4th, ...), \
                  and opens one pair for an interactive send/receive session. Meant for virtual \
                  null-modem pairs such as com0com or socat ptys."
)]
struct Args {
    /// Configuration file (overrides the standard search locations).
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Highest port number to probe.
    #[arg(long, value_name = "N")]
    max_port: Option<u16>,

    /// Device path template; `{n}` is replaced by the port number.
    #[arg(long, value_name = "TEMPLATE")]
    port_template: Option<String>,

    /// Give up on an incomplete incoming line after this many milliseconds.
    #[arg(long, value_name = "MS")]
    receive_timeout_ms: Option<u64>,

    /// Keep writing until the whole line has been accepted by the port.
    #[arg(long)]
    write_all: bool,

    /// Print the discovered pairs and exit.
    #[arg(long)]
    list: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            e.exit_code()
        }
    }
}

fn run(args: Args) -> AppResult<()> {
    let mut loader = load_config(args.config.as_ref())?;
    let config = loader.config_mut();

    if let Some(max_port) = args.max_port {
        config.discovery.max_port = max_port;
    }
    if let Some(template) = args.port_template {
        config.discovery.port_template = template;
    }
    if let Some(ms) = args.receive_timeout_ms {
        config.session.receive_deadline_ms = Some(ms);
    }
    if args.write_all {
        config.session.write_mode = WriteMode::WriteAll;
    }
    config.validate()?;

    let config = loader.into_config();
    if let Err(e) = logging::init(&config.logging, args.verbose) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let naming: PortNaming = config.naming()?;
    tracing::debug!(template = naming.template(), "using port naming");
    let opener = SystemOpener::new(naming, config.timeouts.policy());

    if args.list {
        return list_pairs(&opener, config.discovery.max_port, &mut io::stdout().lock());
    }

    let mut settings = ControllerSettings::from_config(&config);
    settings.clear_screen = io::stdout().is_terminal();

    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    SessionController::new(&opener, settings, stdin, stdout, io::stderr()).run()
}

fn load_config(explicit: Option<&PathBuf>) -> ConfigResult<ConfigLoader> {
    match explicit {
        Some(path) => ConfigLoader::load_from(path),
        None => ConfigLoader::load(),
    }
}
