//! Gatehouse authorization server CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "gatehouse")]
#[command(about = "Gatehouse OAuth 2.0 authorization server", long_about = None)]
struct Cli {
    /// Load environment variables from this file instead of `.env`
    #[arg(long, global = true)]
    env_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init {
        /// Path to `SQLite` database
        #[arg(long, env = "GATEHOUSE_DB", default_value = "gatehouse.db")]
        db: String,
        /// Seed development scopes, a demo user and the `webapp` client
        #[arg(long)]
        demo: bool,
    },
    /// Start the authorization server
    Serve {
        /// Address to bind to
        #[arg(long, env = "GATEHOUSE_BIND", default_value = "127.0.0.1:5080")]
        bind: String,
        /// Path to `SQLite` database
        #[arg(long, env = "GATEHOUSE_DB", default_value = "gatehouse.db")]
        db: String,
        /// Issuer (`iss`) of minted tokens
        #[arg(long, env = "GATEHOUSE_ISSUER", default_value = "gatehouse")]
        issuer: String,
        /// Audience (`aud`) of minted tokens
        #[arg(long, env = "GATEHOUSE_AUDIENCE", default_value = "gatehouse-api")]
        audience: String,
        /// HS256 secret for issued access and ID tokens
        #[arg(long, env = "GATEHOUSE_SIGNING_KEY", default_value = "")]
        signing_key: String,
        /// HS256 secret used to verify caller session tokens
        #[arg(long, env = "GATEHOUSE_SESSION_SECRET", default_value = "")]
        session_secret: String,
        /// Access token lifetime in seconds
        #[arg(long, env = "GATEHOUSE_ACCESS_TOKEN_LIFETIME", default_value_t = 1800)]
        access_token_lifetime: u64,
        /// Refresh token lifetime in seconds
        #[arg(long, env = "GATEHOUSE_REFRESH_TOKEN_LIFETIME", default_value_t = 2_592_000)]
        refresh_token_lifetime: u64,
    },
    /// Secret generation utilities
    #[command(subcommand)]
    Secret(SecretCommands),
}

#[derive(Subcommand)]
enum SecretCommands {
    /// Generate a signing key or session secret
    Jwt,
    /// Hash a client secret for storage
    Client {
        /// The plaintext client secret
        secret: String,
    },
    /// Mint a session token for manual testing
    Session {
        /// User id to put in the token
        user_id: i64,
        /// Session secret the server verifies with
        #[arg(long, env = "GATEHOUSE_SESSION_SECRET")]
        session_secret: String,
        /// Token lifetime in seconds
        #[arg(long, default_value_t = 3600)]
        ttl: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file before clap parses args so env vars are available for clap's `env` attribute.
    // Support `--env-file <path>` by pre-scanning argv (must happen before clap parse).
    load_env_file();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db, demo } => commands::init::run(&db, demo),
        Commands::Serve {
            bind,
            db,
            issuer,
            audience,
            signing_key,
            session_secret,
            access_token_lifetime,
            refresh_token_lifetime,
        } => {
            let config = commands::serve::ServerConfig {
                bind_addr: bind.parse()?,
                db_path: db,
                issuer,
                audience,
                signing_key,
                session_secret,
                access_token_lifetime_secs: access_token_lifetime,
                refresh_token_lifetime_secs: refresh_token_lifetime,
            };
            commands::serve::run(config).await
        }
        Commands::Secret(secret_cmd) => match secret_cmd {
            SecretCommands::Jwt => commands::secret::generate_jwt_secret(),
            SecretCommands::Client { secret } => commands::secret::hash_client_secret(&secret),
            SecretCommands::Session {
                user_id,
                session_secret,
                ttl,
            } => commands::secret::mint_session(user_id, &session_secret, ttl),
        },
    }
}

/// Loads environment variables from a `.env` file.
///
/// Checks for `--env-file <path>` in argv first; falls back to `.env` in the
/// current directory. Silently ignores missing files.
fn load_env_file() {
    let args: Vec<String> = std::env::args().collect();
    let custom_path = args
        .windows(2)
        .find(|w| w[0] == "--env-file")
        .map(|w| w[1].clone());

    if let Some(path) = custom_path {
        if let Err(e) = dotenvy::from_filename(&path) {
            eprintln!("Warning: failed to load env file {path}: {e}");
        }
    } else {
        let _ = dotenvy::dotenv();
    }
}
