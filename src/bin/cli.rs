use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input};
use dotenvy::dotenv;

use dentra::modules::notifications::QueueEmailDispatcher;
use dentra::modules::password_reset::{PasswordResetError, PasswordResetService};
use dentra::sweeper::run_sweep_once;
use dentra_config::{DatabaseConfig, QueueConfig, ServerConfig};
use dentra_core::{Clock, SystemClock};
use dentra_db::{
    PgBlacklistStore, PgPasswordResetStore, PgPool, PgTokenStore, PgUserRepository, init_db_pool,
};
use dentra_queue::RedisStreamPublisher;

#[derive(Parser)]
#[command(name = "dentra-cli")]
#[command(about = "Dentra CLI - Administrative tools for the Dentra API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete expired password-reset tokens and blacklist entries
    Sweep,
    /// Issue a new password-reset token and queue the email again
    ResendReset {
        /// Email address of the account (prompted if omitted)
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let database_config = DatabaseConfig::from_env()?;
    let pool = init_db_pool(&database_config)
        .await
        .context("Failed to connect to database")?;
    let server_config = ServerConfig::from_env();

    match cli.command {
        Commands::Sweep => handle_sweep(pool, &server_config).await,
        Commands::ResendReset { email, yes } => {
            handle_resend_reset(pool, &server_config, email, yes).await
        }
    }
}

fn token_store(pool: PgPool, server_config: &ServerConfig) -> anyhow::Result<PgTokenStore> {
    let ttl = chrono::Duration::from_std(server_config.reset_token_ttl)
        .context("RESET_TOKEN_TTL_SECS is out of range")?;
    Ok(PgTokenStore::new(pool, Arc::new(SystemClock), ttl))
}

async fn handle_sweep(pool: PgPool, server_config: &ServerConfig) -> anyhow::Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let tokens = token_store(pool.clone(), server_config)?;
    let blacklist = PgBlacklistStore::new(pool, clock);

    let report = run_sweep_once(&tokens, &blacklist).await?;

    println!("✅ Sweep complete");
    println!("   Reset tokens removed: {}", report.reset_tokens);
    println!("   Blacklist entries removed: {}", report.blacklisted_tokens);
    Ok(())
}

async fn handle_resend_reset(
    pool: PgPool,
    server_config: &ServerConfig,
    email: Option<String>,
    yes: bool,
) -> anyhow::Result<()> {
    let email = match email {
        Some(email) => email,
        None => Input::new()
            .with_prompt("Account email")
            .validate_with(|input: &String| -> Result<(), &str> {
                if input.contains('@') {
                    Ok(())
                } else {
                    Err("Please enter a valid email address")
                }
            })
            .interact_text()?,
    };

    if !yes
        && !Confirm::new()
            .with_prompt(format!(
                "Invalidate existing reset tokens for {} and send a new link?",
                email
            ))
            .default(false)
            .interact()?
    {
        println!("Aborted.");
        return Ok(());
    }

    let queue_config = QueueConfig::from_env();
    let publisher = RedisStreamPublisher::connect(&queue_config)
        .await
        .context("Failed to connect to queue")?;

    let service = PasswordResetService::new(
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(token_store(pool.clone(), server_config)?),
        Arc::new(PgPasswordResetStore::new(pool, Arc::new(SystemClock))),
        Arc::new(QueueEmailDispatcher::new(Arc::new(publisher), &queue_config)),
    );

    match service.resend_password_reset(&email).await {
        Ok(token_id) => {
            println!("✅ Password reset email queued");
            println!("   Email: {}", email);
            println!("   Token id: {}", token_id);
            Ok(())
        }
        Err(PasswordResetError::NotFound) => bail!("No active account for {}", email),
        Err(e) => Err(e.into()),
    }
}
