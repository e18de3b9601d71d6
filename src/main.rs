use std::{net::SocketAddr, sync::Arc};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use jamgate::{
    AxumServer, FileSystemAdapter, GracefulShutdown, HttpClientAdapter, HttpHandler, HttpServer,
    build_router,
    config::{ConfigOverrides, ServerConfig, ServerConfigValidator, load_config, load_pipeline},
    tracing_setup,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(flatten)]
    options: CommonOptions,
}

#[derive(Parser, Debug, Clone, Default)]
struct CommonOptions {
    /// Configuration file (TOML, YAML or JSON)
    #[clap(short, long)]
    config: Option<String>,

    /// Site directory to serve
    #[clap(short, long)]
    root: Option<String>,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Check the configuration and both rule files
    Validate {
        #[clap(flatten)]
        options: CommonOptions,
    },
    /// Serve the site (default)
    Serve {
        #[clap(flatten)]
        options: CommonOptions,

        /// Address to listen on, e.g. 0.0.0.0:8080
        #[clap(short, long)]
        listen: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Some(Commands::Validate { options }) => validate_command(&options).await,
        Some(Commands::Serve { options, listen }) => serve_command(&options, listen).await,
        None => serve_command(&args.options, None).await,
    }
}

async fn resolve_config(options: &CommonOptions, listen: Option<String>) -> Result<ServerConfig> {
    let overrides = ConfigOverrides {
        root: options.root.clone(),
        listen_addr: listen,
    };
    load_config(options.config.as_deref(), &overrides)
        .await
        .context("Failed to load configuration")
}

async fn serve_command(options: &CommonOptions, listen: Option<String>) -> Result<()> {
    let config = resolve_config(options, listen).await?;

    tracing_setup::init_tracing(&config.logging)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    ServerConfigValidator::validate(&config).context("Invalid configuration")?;

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.listen_addr))?;
    let proxy_timeout = config.proxy.timeout_duration()?;

    let pipeline = load_pipeline(&config)
        .await
        .context("Failed to load site rules")?;
    tracing::info!(
        "Serving {} with {} header rules and {} redirect rules",
        config.root,
        pipeline.header_rule_count(),
        pipeline.redirect_rule_count()
    );

    let http_client = Arc::new(
        HttpClientAdapter::with_timeout(proxy_timeout)
            .context("Failed to create HTTP client adapter")?,
    );
    let handler = HttpHandler::new(
        Arc::new(pipeline),
        http_client,
        Arc::new(FileSystemAdapter::new()),
        config.root.clone(),
        &config.auth_realm,
    )?
    .with_rule_files([config.headers_path(), config.redirects_path()]);

    let graceful_shutdown = GracefulShutdown::new();
    let signal_handler = {
        let graceful_shutdown = graceful_shutdown.clone();
        tokio::spawn(async move { graceful_shutdown.run_signal_handler().await })
    };

    let server = AxumServer::new(
        addr,
        build_router(Arc::new(handler)),
        graceful_shutdown.clone(),
    );
    let result = server.run().await;

    signal_handler.abort();
    tracing::info!("Graceful shutdown completed");
    result
}

/// Validate configuration and rule files, then exit
async fn validate_command(options: &CommonOptions) -> Result<()> {
    let config = match resolve_config(options, None).await {
        Ok(config) => {
            println!("Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("Configuration parsing failed:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = ServerConfigValidator::validate(&config) {
        eprintln!("Configuration validation failed:");
        eprintln!("{e}");
        std::process::exit(1);
    }
    println!("Configuration validation: OK");

    let pipeline = match load_pipeline(&config).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Rule files are invalid:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };

    println!();
    println!("Summary:");
    println!("   Listen Address: {}", config.listen_addr);
    println!("   Site Root: {}", config.root);
    println!(
        "   Header Rules: {} ({})",
        pipeline.header_rule_count(),
        config.headers_path().display()
    );
    println!(
        "   Redirect Rules: {} ({})",
        pipeline.redirect_rule_count(),
        config.redirects_path().display()
    );
    println!("   Proxy Timeout: {}", config.proxy.timeout);
    Ok(())
}
