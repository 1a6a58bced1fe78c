//! `AmberEats` CLI - Loyalty math, session checks and the role demo.
//!
//! # Usage
//!
//! ```bash
//! # Show the tier earned by a points balance
//! ae-cli loyalty tier 1250
//!
//! # Award points to the demo seed state and print the result
//! ae-cli loyalty award --points 800 --source review --seed demo
//!
//! # Sign in against the configured backend
//! ae-cli session sign-in -e maria@example.com -p 'correct horse'
//!
//! # Create an account as a courier
//! ae-cli session sign-up -e ana@example.com -p 'correct horse' -n Ana -r courier
//!
//! # Run the in-memory walkthrough, switching to a restaurant profile
//! ae-cli demo --role restaurant
//! ```
//!
//! # Commands
//!
//! - `loyalty` - Tier lookup and point awards on an in-memory state
//! - `session` - Sign in or sign up against the hosted backend
//! - `demo` - Scripted sign-up, update, role switch and sign-out

#![cfg_attr(not(test), forbid(unsafe_code))]

use amber_eats_identity::config::TelemetryConfig;
use clap::{Parser, Subcommand};
use commands::loyalty::Seed;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "ae-cli")]
#[command(author, version, about = "AmberEats CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Loyalty tier and points tools
    Loyalty {
        #[command(subcommand)]
        action: LoyaltyAction,
    },
    /// Authenticate against the hosted backend
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Walk through a session on an in-memory backend
    Demo {
        /// Role to switch the demo profile to (`client`, `restaurant`, `courier`, `admin`)
        #[arg(short, long, default_value = "restaurant")]
        role: String,
    },
}

#[derive(Subcommand)]
enum LoyaltyAction {
    /// Print the tier and next threshold for a points balance
    Tier {
        /// Points balance
        points: u32,
    },
    /// Award points and print the resulting loyalty state
    Award {
        /// Points to add
        #[arg(short, long)]
        points: u32,

        /// What earned the points (`order`, `referral`, `review`, `bonus`)
        #[arg(short, long, default_value = "order")]
        source: String,

        /// History entry title (defaults to one derived from the source)
        #[arg(short, long)]
        title: Option<String>,

        /// Starting state
        #[arg(long, value_enum, default_value_t = Seed::Demo)]
        seed: Seed,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Sign in with email and password
    SignIn {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    SignUp {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        /// Account role (`client`, `restaurant`, `courier`, `admin`)
        #[arg(short, long, default_value = "client")]
        role: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &TelemetryConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let telemetry = TelemetryConfig::from_env();
    let _sentry_guard = init_sentry(&telemetry);

    // Command output goes to stdout, so logs go to stderr
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ae_cli=info,amber_eats_identity=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Loyalty { action } => match action {
            LoyaltyAction::Tier { points } => commands::loyalty::tier(points)?,
            LoyaltyAction::Award {
                points,
                source,
                title,
                seed,
            } => commands::loyalty::award(points, &source, title, seed).await?,
        },
        Commands::Session { action } => match action {
            SessionAction::SignIn { email, password } => {
                commands::session::sign_in(&email, password).await?;
            }
            SessionAction::SignUp {
                email,
                password,
                name,
                role,
            } => {
                commands::session::sign_up(&email, password, name, &role).await?;
            }
        },
        Commands::Demo { role } => commands::demo::run(&role).await?,
    }
    Ok(())
}
