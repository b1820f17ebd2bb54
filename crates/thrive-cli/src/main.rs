use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use thrive_config::JwtConfig;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "thrive-cli")]
#[command(about = "Thrive CLI - maintenance jobs for the booking database", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upsert Stripe product mappings from a JSON file
    ImportProducts {
        /// JSON array of product rows
        file: PathBuf,
    },
    /// Mark scheduled sessions that have ended as completed
    CompleteSessions,
    /// Cancel draft bookings and sessions whose payment never arrived
    ExpireDrafts {
        /// Age after which an unpaid draft is cancelled
        #[arg(long, default_value = "60")]
        older_than_minutes: i64,
    },
    /// Mint an access token for local development
    IssueToken {
        /// Student, teacher or admin id
        #[arg(short = 's', long)]
        subject: Uuid,

        #[arg(short = 'e', long)]
        email: String,

        /// admin, teacher or student
        #[arg(short = 'r', long, default_value = "student")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thrive=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::IssueToken {
            subject,
            email,
            role,
        } => thrive_cli::issue_token(subject, &email, &role, &JwtConfig::from_env())
            .map(|token| println!("{token}")),
        Commands::ImportProducts { file } => {
            let pool = thrive_db::init_db_pool().await;
            thrive_cli::import_products_file(&pool, &file)
                .await
                .map(|count| println!("✅ Imported {count} products"))
        }
        Commands::CompleteSessions => {
            let pool = thrive_db::init_db_pool().await;
            thrive_cli::complete_sessions(&pool)
                .await
                .map(|count| println!("✅ Completed {count} sessions"))
        }
        Commands::ExpireDrafts { older_than_minutes } => {
            let pool = thrive_db::init_db_pool().await;
            thrive_cli::expire_drafts(&pool, older_than_minutes)
                .await
                .map(|expired| {
                    println!(
                        "✅ Cancelled {} draft bookings and {} draft sessions",
                        expired.bookings, expired.sessions
                    )
                })
        }
    };

    if let Err(e) = result {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}
