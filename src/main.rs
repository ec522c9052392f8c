use clap::Parser;
use clap::Subcommand;
use crux_bot::api::serve_api;
use crux_bot::channel::adapter::build_turn_handler;
use crux_bot::channel::ChannelAdapter;
use crux_bot::config::mask_secret;
use crux_bot::config::AppConfig;
use crux_bot::config::Credentials;
use crux_bot::Result;
use tracing::info;

#[derive(Parser)]
#[command(name = "crux-bot")]
#[command(about = "Retrieval-augmented chat bot endpoint")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP listener for channel activities (default)
    Serve {
        /// Host to bind, overrides server.host
        #[arg(long)]
        host: Option<String>,
        /// Port to bind, overrides server.port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Answer one question through embedding, retrieval and generation
    Ask {
        /// The question to answer
        question: String,
    },
    /// Load configuration and credentials and print them masked
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine; the variables may come from the real environment.
    let _ = dotenvy::dotenv();

    let mut config = AppConfig::load()?;

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let _guard = if cli.verbose {
                crux_bot::logging::init_logging_with_level("debug", &config.logging.directory)?
            } else {
                crux_bot::logging::init_logging(&config.logging)?
            };

            let credentials = Credentials::from_env()?;
            let adapter = ChannelAdapter::from_config(&config, &credentials)?;
            info!("Configuration loaded successfully");

            serve_api(&config, adapter).await
        }
        Commands::Ask { question } => {
            crux_bot::logging::init_simple_logging();

            let credentials = Credentials::from_env()?;
            let handler = build_turn_handler(&config, &credentials)?;

            match handler.answer(&question).await {
                Ok(answer) => {
                    println!("Context: {}", answer.context.as_str());
                    println!();
                    println!("{}", answer.text);
                    Ok(())
                }
                Err((state, error)) => {
                    eprintln!("Failed while {state}: {error}");
                    Err(error)
                }
            }
        }
        Commands::CheckConfig => check_config(&config),
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    println!("Checking configuration...");
    println!("  Listen address:    {}", config.bind_address());
    println!("  OpenAI endpoint:   {}", config.openai.endpoint);
    println!("  Embedding model:   {}", config.openai.embedding_model);
    println!("  Chat model:        {}", config.openai.chat_model);
    println!(
        "  Retrieval:         {} (threshold {}, count {})",
        config.retrieval.function, config.retrieval.match_threshold, config.retrieval.match_count
    );

    match Credentials::from_env() {
        Ok(credentials) => {
            println!("  OPENAI_API_KEY:    {}", mask_secret(&credentials.openai_api_key));
            println!("  SUPABASE_URL:      {}", credentials.supabase_url);
            println!("  SUPABASE_KEY:      {}", mask_secret(&credentials.supabase_key));
            println!("  MICROSOFT_APP_ID:  {}", credentials.app_id);
            println!(
                "  Channel auth:      {}",
                if credentials.channel_auth_enabled() {
                    "enabled"
                } else {
                    "disabled (emulator)"
                }
            );
            println!("\nConfiguration check completed successfully!");
            Ok(())
        }
        Err(e) => {
            println!("Configuration error: {e}");
            println!("\nSet the variable in the environment or in a .env file and run this check again.");
            Err(e)
        }
    }
}
