//! Serialnet CLI
//!
//! Runs a virtual serial port network until Ctrl-C or `quit`, with an
//! interactive console on stdin for changing its membership.

use std::process::ExitCode;

#[cfg(unix)]
fn main() -> ExitCode {
    app::main()
}

#[cfg(not(unix))]
fn main() -> ExitCode {
    eprintln!("serialnet needs pseudo-terminals and only runs on Unix");
    ExitCode::from(serialnet_core::ExitCodes::ERROR)
}

#[cfg(unix)]
mod app {
    use anyhow::Context;
    use clap::{Parser, ValueEnum};
    use crossbeam_channel::{select, Receiver};
    use serialnet_core::cli::console::HELP;
    use serialnet_core::cli::{ensure_ports, format_ports, ConsoleCommand};
    use serialnet_core::config::LoggingConfig;
    use serialnet_core::core::serial::DEFAULT_BAUD_RATE;
    use serialnet_core::{
        AppConfig, CliResult, ExitCodes, NetworkOptions, OutputFormat, SerialConfig,
        SerialNetwork, VirtualSerialNetwork, VirtualSerialPair,
    };
    use std::io::{self, BufRead};
    use std::path::PathBuf;
    use std::process::ExitCode;
    use std::thread;
    use tracing_appender::non_blocking::WorkerGuard;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    const PAIR_PORTS: usize = 2;

    /// CLI output format
    #[derive(Debug, Clone, Copy, ValueEnum)]
    enum Format {
        /// Human-readable text
        Text,
        /// JSON format for scripting
        Json,
    }

    impl From<Format> for OutputFormat {
        fn from(format: Format) -> Self {
            match format {
                Format::Text => Self::Text,
                Format::Json => Self::Json,
            }
        }
    }

    /// Serialnet CLI
    #[derive(Parser, Debug)]
    #[command(
        name = "serialnet",
        version,
        about = "Virtual serial port network for testing serial software",
        long_about = None
    )]
    struct Cli {
        /// Config file (defaults to the platform config directory)
        #[arg(short, long, env = "SERIALNET_CONFIG")]
        config: Option<PathBuf>,

        /// Number of virtual ports to create
        #[arg(short = 'n', long)]
        ports: Option<usize>,

        /// Serial device to attach (repeatable)
        #[arg(short, long = "external", value_name = "NAME")]
        external: Vec<String>,

        /// Baud rate for devices given with --external
        #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
        baud: u32,

        /// Deliver each port's bytes back to itself too
        #[arg(long)]
        loopback: bool,

        /// Run a fixed pair of two virtual ports
        #[arg(long, conflicts_with_all = ["ports", "external", "loopback"])]
        pair: bool,

        /// Output format for the port list
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Quiet mode (errors only)
        #[arg(short, long, conflicts_with = "verbose")]
        quiet: bool,

        /// Also write logs to this file
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Print the effective configuration and exit
        #[arg(long)]
        print_config: bool,
    }

    pub fn main() -> ExitCode {
        let cli = Cli::parse();

        let result = run(&cli)
            .unwrap_or_else(|e| CliResult::error(ExitCodes::ERROR, format!("{e:#}")));

        if let Some(msg) = result.message() {
            if result.is_success() {
                println!("{msg}");
            } else {
                eprintln!("Error: {msg}");
            }
        }
        result.to_exit_code()
    }

    fn run(cli: &Cli) -> anyhow::Result<CliResult> {
        let loaded = match &cli.config {
            Some(path) => AppConfig::load_from(path),
            None => AppConfig::load(),
        };
        let mut config = match loaded {
            Ok(config) => config,
            Err(e) => return Ok(CliResult::from(e)),
        };

        if let Err(msg) = apply_overrides(cli, &mut config) {
            return Ok(CliResult::error(ExitCodes::INVALID_ARGS, msg));
        }

        if cli.print_config {
            print!("{}", config.to_toml()?);
            return Ok(CliResult::success());
        }

        let _log_guard = init_logging(cli, &config.logging)?;
        tracing::info!("Starting serialnet v{}", serialnet_core::VERSION);

        let options = NetworkOptions {
            loopback: config.network.loopback,
            poll_timeout: config.network.poll_interval(),
            stop_timeout: config.network.stop_timeout(),
        };
        let mut network: Box<dyn SerialNetwork> = if config.network.pair {
            Box::new(VirtualSerialPair::with_options(options))
        } else {
            Box::new(VirtualSerialNetwork::with_options(
                config.network.virtual_ports,
                config.external.clone(),
                options,
            ))
        };

        if let Err(e) = network.start() {
            return Ok(CliResult::from(e));
        }
        let required = if config.network.pair { PAIR_PORTS } else { 0 };
        if let Err(result) = ensure_ports(network.ports(), required) {
            return Ok(result);
        }

        let format = OutputFormat::from(cli.format);
        let loopback = options.loopback && !config.network.pair;
        println!("{}", format_ports(network.ports(), loopback, format));

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        ctrlc::set_handler(move || {
            let _ = shutdown_tx.try_send(());
        })
        .context("Failed to install Ctrl-C handler")?;

        serve_console(network.as_mut(), &shutdown_rx, loopback, format);

        network.stop();
        Ok(CliResult::success())
    }

    fn apply_overrides(cli: &Cli, config: &mut AppConfig) -> Result<(), String> {
        if let Some(ports) = cli.ports {
            config.network.virtual_ports = ports;
        }
        for name in &cli.external {
            let port = SerialConfig::new(name)
                .and_then(|c| c.baud_rate(cli.baud))
                .map_err(|e| format!("--external {name}: {e}"))?;
            config.external.push(port);
        }
        if cli.loopback {
            config.network.loopback = true;
        }
        if cli.pair {
            config.network.pair = true;
        }
        if cli.log_file.is_some() {
            config.logging.file.clone_from(&cli.log_file);
        }
        Ok(())
    }

    fn init_logging(cli: &Cli, logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
        let level = if cli.verbose {
            "debug"
        } else if cli.quiet {
            "error"
        } else {
            logging.level.as_str()
        };
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .with_context(|| format!("Invalid log level: {level}"))?;

        let (file_layer, guard) = match &logging.file {
            Some(path) => {
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map_or_else(|| PathBuf::from("."), PathBuf::from);
                let name = path
                    .file_name()
                    .with_context(|| format!("Invalid log file: {}", path.display()))?;
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                let appender = tracing_appender::rolling::never(dir, name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (
                    Some(fmt::layer().with_writer(writer).with_ansi(false)),
                    Some(guard),
                )
            }
            None => (None, None),
        };

        let registry = tracing_subscriber::registry().with(filter).with(file_layer);
        if logging.json {
            registry
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        } else {
            registry.with(fmt::layer().with_writer(io::stderr)).init();
        }

        Ok(guard)
    }

    /// Read stdin on a helper thread so Ctrl-C stays responsive
    fn spawn_stdin_reader() -> Receiver<String> {
        let (tx, rx) = crossbeam_channel::unbounded();
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(l) => {
                        if tx.send(l).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });
        rx
    }

    fn serve_console(
        network: &mut dyn SerialNetwork,
        shutdown: &Receiver<()>,
        loopback: bool,
        format: OutputFormat,
    ) {
        let lines = spawn_stdin_reader();

        loop {
            select! {
                recv(shutdown) -> _ => {
                    tracing::info!("Interrupted");
                    break;
                }
                recv(lines) -> line => {
                    let Ok(line) = line else {
                        tracing::debug!("stdin closed");
                        break;
                    };
                    match ConsoleCommand::parse(&line) {
                        Ok(Some(ConsoleCommand::Quit)) => break,
                        Ok(Some(command)) => execute(network, command, loopback, format),
                        Ok(None) => {}
                        Err(e) => eprintln!("{e}"),
                    }
                }
            }
        }
    }

    fn execute(
        network: &mut dyn SerialNetwork,
        command: ConsoleCommand,
        loopback: bool,
        format: OutputFormat,
    ) {
        match command {
            ConsoleCommand::Help => {
                println!("{HELP}");
                return;
            }
            ConsoleCommand::List | ConsoleCommand::Quit => {}
            ConsoleCommand::Create(count) => network.create(count),
            ConsoleCommand::Add(port) => network.add(vec![port]),
            ConsoleCommand::Remove(names) => network.remove(&names),
        }
        println!("{}", format_ports(network.ports(), loopback, format));
    }
}
