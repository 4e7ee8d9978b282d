use clap::{Parser, Subcommand};
use coachflow_core::{Config, RequestContext};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "coachflow", version, about = "coachflow CLI")]
struct Cli {
    /// Organization the request is made on behalf of
    #[arg(long, global = true, default_value = "default")]
    org: String,
    /// Acting coach or user id
    #[arg(long, global = true)]
    actor: Option<String>,
    /// Log filter (overrides COACHFLOW_LOG, RUST_LOG and config)
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Program template management
    Program {
        #[command(subcommand)]
        action: commands::program::ProgramAction,
    },
    /// Individual enrollments
    Enrollment {
        #[command(subcommand)]
        action: commands::enrollment::EnrollmentAction,
    },
    /// Cohorts
    Cohort {
        #[command(subcommand)]
        action: commands::cohort::CohortAction,
    },
    /// Program instances
    Instance {
        #[command(subcommand)]
        action: commands::instance::InstanceAction,
    },
    /// Client coaching notes, action items and sessions
    Coaching {
        #[command(subcommand)]
        action: commands::coaching::CoachingAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_env("COACHFLOW_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(Config::load_or_default().logging.level)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let mut ctx = RequestContext::new(cli.org);
    if let Some(actor) = cli.actor {
        ctx = ctx.with_actor(actor);
    }

    let result = match cli.command {
        Commands::Program { action } => commands::program::run(&ctx, action),
        Commands::Enrollment { action } => commands::enrollment::run(&ctx, action),
        Commands::Cohort { action } => commands::cohort::run(&ctx, action),
        Commands::Instance { action } => commands::instance::run(&ctx, action),
        Commands::Coaching { action } => commands::coaching::run(&ctx, action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
