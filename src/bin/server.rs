use clap::Parser;
use imagegen_server::domain::yaml_config::YamlConfig;
use imagegen_server::infra::generation::HttpGenerationClient;
use imagegen_server::infra::session::BearerTokenResolver;
use imagegen_server::infra::storage_client::StorageClient;
use imagegen_server::server::{run_server, AppState};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "imagegen-server")]
#[command(about = "Image-to-image generation gateway backed by S3-compatible storage")]
struct Cli {
    #[arg(
        short = 'c',
        long = "config",
        env = "CONFIG_FILE",
        help = "Path to YAML configuration file"
    )]
    config_file: PathBuf,

    #[arg(long, env = "DEBUG", help = "Enable debug logging")]
    debug: bool,

    #[arg(
        long,
        help = "Skip the bucket connectivity check on startup"
    )]
    skip_connectivity_check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load and parse YAML configuration before logging so `debug:` can apply
    let yaml_config = match YamlConfig::from_file(&cli.config_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!();
            eprintln!("Failed to load configuration file: {}", e);
            eprintln!();
            std::process::exit(1);
        }
    };

    if cli.debug || yaml_config.debug {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }

    tracing::info!("Loaded configuration from: {}", cli.config_file.display());

    let resolved_config = match yaml_config.resolve_env_vars() {
        Ok(config) => config,
        Err(e) => {
            eprintln!();
            eprintln!("Configuration error: {}", e);
            eprintln!();
            std::process::exit(1);
        }
    };

    tracing::info!("Configuration resolved successfully");
    tracing::info!(
        "  Storage endpoint: {}",
        resolved_config.storage.endpoint.as_deref().unwrap_or("AWS S3")
    );
    tracing::info!(
        "  Default bucket: {}",
        if resolved_config.storage.default_bucket.is_empty() {
            "<none>"
        } else {
            resolved_config.storage.default_bucket.as_str()
        }
    );
    tracing::info!("  Generation API: {}", resolved_config.generation.base_url);
    tracing::info!("  Generation model: {}", resolved_config.generation.model);

    let storage = match StorageClient::from_config(&resolved_config.storage).await {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!();
            eprintln!("Failed to initialize storage: {}", e);
            eprintln!();
            eprintln!("Please check your storage credentials and endpoint.");
            std::process::exit(1);
        }
    };

    if !cli.skip_connectivity_check {
        tracing::info!("Testing bucket connectivity...");
        if let Err(e) = storage.test_connection().await {
            eprintln!();
            eprintln!("Bucket connectivity test failed: {}", e);
            eprintln!();
            eprintln!("Please verify:");
            eprintln!("  - Storage credentials are valid");
            eprintln!("  - The default bucket exists and is accessible");
            eprintln!("  - Region and endpoint are correct");
            std::process::exit(1);
        }
    }

    let generation = match HttpGenerationClient::new(&resolved_config.generation) {
        Ok(client) => client,
        Err(e) => {
            eprintln!();
            eprintln!("Failed to initialize generation client: {}", e);
            std::process::exit(1);
        }
    };

    let sessions = BearerTokenResolver::new(resolved_config.sessions.clone());
    tracing::info!(
        "Server starting with {} configured session(s)",
        sessions.user_names().count()
    );
    for name in sessions.user_names() {
        tracing::info!("  - Session configured: {}", name);
    }

    let app_state = AppState {
        storage: Arc::new(storage),
        generation: Arc::new(generation),
        sessions: Arc::new(sessions),
        max_upload_bytes: resolved_config.max_upload_bytes,
    };

    if let Err(e) = run_server(app_state, resolved_config.port).await {
        eprintln!();
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
