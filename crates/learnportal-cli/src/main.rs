//! LearnPortal CLI
//!
//! Command-line front end for the tenant-scoped learning platform client

mod config;
mod views;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::PortalConfig;
use learnportal_core::session_store::{
    ACCESS_TOKEN_KEY, TENANT_REALM_KEY, USER_EMAIL_KEY, capture_login_redirect,
};
use learnportal_core::{LoginNavigator, SessionStore};
use learnportal_egress::LearningApi;
use learnportal_egress::requests::{BulkAssignment, CourseFilters};
use learnportal_session_file::FileSessionStore;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "learnportal")]
#[command(about = "LearnPortal - tenant-scoped learning platform client", long_about = None)]
struct Cli {
    /// Path to configuration file (YAML or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a session, either from the SSO redirect or explicit values
    Login {
        /// Redirect URL carrying token, email and realm parameters
        #[arg(long, conflicts_with_all = ["token", "email", "realm"])]
        redirect_url: Option<String>,

        #[arg(long, requires_all = ["email", "realm"])]
        token: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Tenant identifier, e.g. acme
        #[arg(long)]
        realm: Option<String>,
    },
    /// Clear the stored session
    Logout,
    /// Show the tenant context of the stored session
    Whoami,
    /// Personal dashboard assembled from several services
    Dashboard,
    /// Browse the course catalog
    Courses {
        #[arg(long)]
        category: Option<String>,

        #[arg(long = "type")]
        course_type: Option<String>,

        #[arg(long)]
        search: Option<String>,
    },
    /// List projects
    Projects {
        #[arg(long)]
        status: Option<String>,
    },
    /// Assign one course to many users
    BulkAssign {
        #[arg(long)]
        course: String,

        /// User to assign (repeatable)
        #[arg(long = "user", required = true)]
        users: Vec<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: String,

        #[arg(long, default_value = "MEDIUM")]
        priority: String,

        #[arg(long)]
        notes: Option<String>,
    },
    /// Project detail with readiness and risk
    ProjectReadiness {
        #[arg(long)]
        project: String,
    },
    /// Assign gap-closing training to a project's team
    ProjectAutoAssign {
        #[arg(long)]
        project: String,
    },
}

/// Tells the terminal user where to sign in again.
struct TerminalNavigator;

impl LoginNavigator for TerminalNavigator {
    fn redirect(&self, login_url: &str) {
        eprintln!("Session expired. Sign in again at {}", login_url);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = if let Some(ref path) = cli.config {
        PortalConfig::from_file(path)?
    } else {
        PortalConfig::default()
    };

    // Merge environment variables (they override config file)
    config.merge_env();
    config.validate()?;

    init_tracing(&config.logging.level)?;
    if let Some(ref path) = cli.config {
        debug!("Loaded configuration from {}", path.display());
    }

    let store = Arc::new(
        FileSessionStore::open(config.session_path()).context("Failed to open session file")?,
    );
    let api = LearningApi::with_navigator(
        config.api_config(),
        store.clone(),
        Arc::new(TerminalNavigator),
    )?;

    let output = match cli.command {
        Commands::Login {
            redirect_url,
            token,
            email,
            realm,
        } => {
            login(store.as_ref(), redirect_url, token, email, realm)?;
            info!("Session stored in {}", store.path().display());
            whoami(&api)?
        }
        Commands::Logout => {
            api.logout()?;
            json!({ "loggedOut": true, "loginUrl": config.login_url })
        }
        Commands::Whoami => whoami(&api)?,
        Commands::Dashboard => views::dashboard(&api).await?,
        Commands::Courses {
            category,
            course_type,
            search,
        } => {
            let filters = CourseFilters {
                category,
                course_type,
                search,
            };
            api.get_courses(&filters).await?
        }
        Commands::Projects { status } => api.get_projects(status.as_deref()).await?,
        Commands::BulkAssign {
            course,
            users,
            due,
            priority,
            notes,
        } => {
            let assignment = BulkAssignment {
                course_id: course,
                user_ids: users,
                due_date: due,
                priority,
                notes,
            };
            api.bulk_assign_course(&assignment).await?
        }
        Commands::ProjectReadiness { project } => views::project_readiness(&api, &project).await?,
        Commands::ProjectAutoAssign { project } => {
            api.auto_assign_project_training(&project).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries the JSON output
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!("{}", log_level)))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn login(
    store: &dyn SessionStore,
    redirect_url: Option<String>,
    token: Option<String>,
    email: Option<String>,
    realm: Option<String>,
) -> anyhow::Result<()> {
    if let Some(url) = redirect_url {
        if !capture_login_redirect(store, &url)? {
            anyhow::bail!("Redirect URL must carry token, email and realm parameters");
        }
        return Ok(());
    }

    match (token, email, realm) {
        (Some(token), Some(email), Some(realm)) => {
            store.set(ACCESS_TOKEN_KEY, &token)?;
            store.set(USER_EMAIL_KEY, &email)?;
            store.set(TENANT_REALM_KEY, &realm)?;
            Ok(())
        }
        _ => anyhow::bail!("Provide --redirect-url, or all of --token, --email and --realm"),
    }
}

fn whoami(api: &LearningApi) -> anyhow::Result<Value> {
    let ctx = match api.tenant_context() {
        Ok(ctx) => ctx,
        Err(e) if e.is_missing_session() => {
            anyhow::bail!("{}. Run `learnportal login` first", e)
        }
        Err(e) => return Err(e.into()),
    };

    Ok(json!({
        "tenantId": ctx.tenant_id,
        "tenantName": ctx.display_name(),
        "userId": ctx.user_id,
        "userEmail": ctx.user_email,
        "roles": ctx.roles,
    }))
}
