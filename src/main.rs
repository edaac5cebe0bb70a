//! Tunnel Throughput Bench - Main CLI Application
//!
//! Runs every configured Shadowsocks method through a local sing-box
//! server/client pair and prints the measured download throughput.

use clap::Parser;
use tunnel_throughput_bench::{
    cli::Cli,
    config::{display_config_summary, load_config, validate_config, EnvManager},
    driver::{BenchmarkDriver, DriverSettings},
    error::{AppError, Result},
    logging::{BenchLogger, LoggerFactory},
    models::{Config, Method, ResultSet},
    output::{render_json, ConsoleProgress, OutputFormatterFactory},
    stream::StreamServer,
    transfer,
    tunnel::{OpensslSecretGenerator, SingBoxLauncher},
    workdir::WorkDir,
    PKG_NAME, VERSION,
};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process;
use url::Url;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();

    if cli.env_help {
        println!("{}", EnvManager::display_env_help());
        return;
    }

    let use_color = cli.use_colors();

    match run_application(cli).await {
        Ok(()) => {}
        Err(AppError::Interrupted(_)) => {
            println!("\nInterrupted.");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("{}", e.format_for_console(use_color));
            print_error_suggestions(&e);
            process::exit(e.exit_code());
        }
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    let interrupt = listen_for_interrupt()?;
    cli.validate().map_err(AppError::validation)?;

    if cli.debug {
        eprintln!("{} v{}", PKG_NAME, VERSION);
        eprintln!(
            "Built {} from {} for {}",
            option_env!("BUILD_TIME").unwrap_or("unknown"),
            option_env!("GIT_COMMIT").unwrap_or("unknown"),
            option_env!("TARGET_TRIPLE").unwrap_or("unknown")
        );
        eprintln!();
    }

    let config = load_config(cli)?;

    if !config.enable_color {
        colored::control::set_override(false);
    }

    for warning in validate_config(&config)? {
        eprintln!("{}", warning.format(config.enable_color));
    }

    if config.debug {
        eprintln!("Configuration loaded successfully:");
        eprintln!("{}", display_config_summary(&config));
        eprintln!();
    }

    let methods = config.parsed_methods()?;
    let logger = LoggerFactory::new(config.clone()).create_bench_logger().await;

    let workdir = WorkDir::create()?;
    let server = StreamServer::loopback(config.http_port, config.max_test_bytes)
        .with_logger(logger.clone())
        .start()
        .await?;

    let outcome = match server.bench_url() {
        Ok(target) => benchmark(&config, &methods, target, workdir.path(), logger.clone(), interrupt).await,
        Err(e) => Err(e),
    };

    if let Err(e) = server.shutdown().await {
        logger.log_stream_server_error(&e).await;
    }

    if config.keep_workdir {
        let path = workdir.keep();
        eprintln!("Tunnel configs kept in {}", path.display());
    } else if let Err(e) = workdir.remove() {
        logger.logger().warn(&format!("Failed to remove work directory: {}", e)).log().await;
    }

    let results = outcome?;
    print_results(&config, &results)
}

/// Run the driver over all methods, racing it against the interrupt
async fn benchmark(
    config: &Config,
    methods: &[Method],
    target: Url,
    workdir: &Path,
    logger: BenchLogger,
    interrupt: InterruptSignal,
) -> Result<ResultSet> {
    let tool = transfer::from_config(config)?;
    logger
        .logger()
        .info(&format!("Measuring with {}", tool.name()))
        .field("transfer", tool.name())
        .log()
        .await;

    let settings = DriverSettings::from_config(config, target, workdir);
    let driver = BenchmarkDriver::new(
        settings,
        Box::new(OpensslSecretGenerator::new(config.openssl_binary())),
        Box::new(SingBoxLauncher::new(config.singbox_binary())),
        tool,
    )
    .with_logger(logger);

    let formatter = OutputFormatterFactory::create_formatter(config.enable_color, config.verbose);
    let progress = if config.json_output {
        ConsoleProgress::new(formatter).on_stderr()
    } else {
        ConsoleProgress::new(formatter)
    };

    tokio::select! {
        results = driver.run(methods, &progress) => results,
        _ = interrupt => Err(AppError::interrupted("Benchmark interrupted by user")),
    }
}

type InterruptSignal = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Ctrl-C listener. The handler is installed on creation, so a press during
/// startup is held until the driver races against it.
fn listen_for_interrupt() -> Result<InterruptSignal> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        Ok(Box::pin(async move {
            if sigint.recv().await.is_none() {
                std::future::pending::<()>().await;
            }
        }))
    }
    #[cfg(not(unix))]
    {
        let listener = tokio::spawn(tokio::signal::ctrl_c());
        Ok(Box::pin(async move {
            if !matches!(listener.await, Ok(Ok(()))) {
                std::future::pending::<()>().await;
            }
        }))
    }
}

fn print_results(config: &Config, results: &ResultSet) -> Result<()> {
    if config.json_output {
        println!("{}", render_json(results)?);
    } else {
        let formatter = OutputFormatterFactory::create_formatter(config.enable_color, config.verbose);
        println!("{}", formatter.format_summary(results)?);
    }
    Ok(())
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) | AppError::Validation(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format (see --env-help)");
            eprintln!("  - Methods must be unique and non-empty");
            eprintln!("  - Server and client port ranges must not overlap");
        }
        AppError::StreamServer(_) => {
            eprintln!();
            eprintln!("Stream server help:");
            eprintln!("  - Another process may be using the HTTP port");
            eprintln!("  - Pick a free port with --http-port");
        }
        _ => {}
    }
}
