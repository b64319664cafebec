//! Eventdesk - headless runner for the multi-role dashboard core.

mod actions;
mod context;
mod runtime;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use eventdesk_config::{init_logging, Config, Paths};
use eventdesk_types::{RequestId, Role, UserId};
use route_guard::home_route_for;

use crate::context::AppContext;
use crate::runtime::{mount, MountOutcome};

/// Eventdesk - run a role-gated dashboard session against the backend.
#[derive(Parser)]
#[command(name = "eventdesk")]
#[command(about = "Eventdesk dashboard runner")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Account email
    #[arg(long, env = "EVENTDESK_EMAIL", global = true, default_value = "")]
    email: String,

    /// Account password
    #[arg(long, env = "EVENTDESK_PASSWORD", global = true, default_value = "")]
    password: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and print the resolved identity and home route
    Login,

    /// Create an account
    Signup {
        /// Display name
        #[arg(long)]
        name: String,
        /// Role to sign up as (client, agency, admin)
        #[arg(long)]
        role: String,
    },

    /// Run the live dashboard for the signed-in role
    Board {
        /// Mount the view guarded for this role instead of the session's
        /// own (demonstrates the redirect path)
        #[arg(long)]
        require: Option<String>,
    },

    /// Submit a new event request (client role)
    Create {
        /// Request title
        #[arg(long)]
        title: String,
        /// Event date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
    },

    /// Accept an open event request (agency/admin role)
    Accept {
        /// Request id
        id: i64,
    },

    /// Reject an open event request (agency/admin role)
    Reject {
        /// Request id
        id: i64,
    },

    /// Reassign a user's role (admin role)
    AssignRole {
        /// Target user id (UUID)
        #[arg(long)]
        user: String,
        /// New role (client, agency, admin)
        #[arg(long)]
        role: String,
    },
}

fn parse_role(raw: &str) -> anyhow::Result<Role> {
    Role::parse(raw).map_err(|e| anyhow::anyhow!("{} (expected client, agency, or admin)", e))
}

/// Signs in and installs the session, failing the command on bad
/// credentials.
async fn sign_in(ctx: &AppContext, email: &str, password: &str) -> anyhow::Result<Role> {
    anyhow::ensure!(!email.is_empty(), "--email (or EVENTDESK_EMAIL) is required");
    anyhow::ensure!(
        !password.is_empty(),
        "--password (or EVENTDESK_PASSWORD) is required"
    );

    let signed_in = ctx.auth.sign_in(email, password).await?;
    let role = signed_in.profile.role;
    ctx.session.set_signed_in(signed_in);
    Ok(role)
}

/// Connects the change feed in the background for the current session.
fn spawn_feed(ctx: &Arc<AppContext>) -> anyhow::Result<()> {
    let token = ctx.access_token()?;
    let feed = ctx.feed.clone();
    tokio::spawn(async move {
        if let Err(e) = feed.connect(&token).await {
            error!(error = %e, "change feed connection failed");
        }
    });
    Ok(())
}

async fn run_board(ctx: Arc<AppContext>, session_role: Role, require: Option<String>) -> anyhow::Result<()> {
    let required_role = match require {
        Some(raw) => parse_role(&raw)?,
        None => session_role,
    };

    spawn_feed(&ctx)?;

    match mount(ctx.clone(), required_role).await? {
        MountOutcome::Redirected(route) => {
            println!("redirected to {}", route.path());
        }
        MountOutcome::Mounted(dashboard) => {
            println!(
                "{} dashboard: {} request(s), {} unread message(s)",
                dashboard.role(),
                dashboard.visible().len(),
                dashboard.unread_count()
            );
            for request in dashboard.visible() {
                println!(
                    "  #{:<5} {:<10} {}  {}",
                    request.id, request.status, request.date, request.title
                );
            }

            tokio::select! {
                exit = dashboard.run() => {
                    info!(?exit, "dashboard stopped");
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, shutting down");
                }
            }
        }
    }

    ctx.feed.disconnect().await;
    Ok(())
}

/// One-shot board used to validate a single action; watching the feed
/// confirm the write is what `board` runs are for.
async fn board_snapshot(ctx: &Arc<AppContext>) -> anyhow::Result<request_board::RequestBoard> {
    let token = ctx.access_token()?;
    let rows: Vec<eventdesk_types::EventRequest> = ctx
        .records
        .select(
            request_board::REQUESTS_COLLECTION,
            &record_client::TableQuery::new().select("id,title,date,status"),
            &token,
        )
        .await?;
    let mut board = request_board::RequestBoard::new();
    board.seed(rows);
    Ok(board)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = Paths::new()?;
    let config = Config::load(&paths)?;
    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_level.clone());
    init_logging(&log_level);

    let ctx = Arc::new(AppContext::from_config(config)?);

    match cli.command {
        Commands::Login => {
            let role = sign_in(&ctx, &cli.email, &cli.password).await?;
            let snapshot = ctx.session.current();
            let profile = snapshot
                .profile()
                .context("session missing after sign-in")?;
            println!("signed in as {} <{}>", profile.name, profile.email);
            println!("role: {}", role);
            println!("home: {}", home_route_for(role).path());
        }
        Commands::Signup { name, role } => {
            let role = parse_role(&role)?;
            anyhow::ensure!(!cli.email.is_empty(), "--email is required");
            anyhow::ensure!(!cli.password.is_empty(), "--password is required");

            let signed_up = ctx.auth.sign_up(&name, &cli.email, &cli.password, role).await?;
            println!(
                "account created: {} ({})",
                signed_up.profile.name, signed_up.profile.role
            );
        }
        Commands::Board { require } => {
            let role = sign_in(&ctx, &cli.email, &cli.password).await?;
            run_board(ctx, role, require).await?;
        }
        Commands::Create { title, date } => {
            sign_in(&ctx, &cli.email, &cli.password).await?;
            let date = chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .context("--date must be YYYY-MM-DD")?;
            actions::create_request(&ctx, &title, date).await?;
            println!("request submitted");
        }
        Commands::Accept { id } => {
            sign_in(&ctx, &cli.email, &cli.password).await?;
            let board = board_snapshot(&ctx).await?;
            actions::accept_request(&ctx, &board, RequestId(id)).await?;
            println!("request #{} accepted", id);
        }
        Commands::Reject { id } => {
            sign_in(&ctx, &cli.email, &cli.password).await?;
            let board = board_snapshot(&ctx).await?;
            actions::reject_request(&ctx, &board, RequestId(id)).await?;
            println!("request #{} rejected", id);
        }
        Commands::AssignRole { user, role } => {
            sign_in(&ctx, &cli.email, &cli.password).await?;
            let role = parse_role(&role)?;
            let user = UserId::parse(&user).context("--user must be a UUID")?;
            actions::assign_role(&ctx, user, role).await?;
            println!("role updated");
        }
    }

    Ok(())
}
