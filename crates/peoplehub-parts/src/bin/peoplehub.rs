//! peoplehub: command-line access to site groups, their users, and recent
//! documents.
//!
//! Output is JSON on stdout; logs go to stderr (or `LOG_FILE`).

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use peoplehub_core::logging::RESULT_COUNT;
use peoplehub_core::{ExpansionPolicy, GroupOption, User};
use peoplehub_sharepoint::{MembershipResolver, SearchResultMapper, SharePointClient};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "peoplehub")]
#[command(author, version, about = "SharePoint group members and their recent documents")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the site's role-assignment members (group picker contents)
    Groups,

    /// Resolve the users of a site group
    People {
        /// Site group id
        #[arg(short, long)]
        group: i64,

        /// Also fetch each user's avatar
        #[arg(long)]
        photos: bool,

        /// Fail when any directory group cannot be expanded
        #[arg(long)]
        fail_fast: bool,
    },

    /// Search recently modified Word documents
    Documents {
        /// Only documents by this author (display name)
        #[arg(short, long)]
        author: Option<String>,
    },
}

#[derive(Serialize)]
struct GroupsOutput {
    members: Vec<peoplehub_core::SiteMember>,
    options: Vec<GroupOption>,
}

fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors
    //   RUST_LOG    - standard env filter (default: "peoplehub=info")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "peoplehub=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("peoplehub.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(command: Commands) -> anyhow::Result<()> {
    let client = SharePointClient::from_env()?;

    match command {
        Commands::Groups => {
            let resolver = MembershipResolver::new(client);
            let members = resolver.get_member_info().await?;
            let options = members.iter().map(GroupOption::from).collect();
            print_json(&GroupsOutput { members, options })?;
        }

        Commands::People {
            group,
            photos,
            fail_fast,
        } => {
            let mut resolver = MembershipResolver::new(client);
            if fail_fast {
                resolver = resolver.with_policy(ExpansionPolicy::FailFast);
            }
            let mut resolution = resolver.resolve_group_members(group).await?;

            if photos {
                let mut fetched = Vec::new();
                resolver
                    .backfill_photos(&resolution.users, |index, photo| {
                        fetched.push((index, photo))
                    })
                    .await;
                for (index, photo) in fetched {
                    if let Some(user) = resolution.users.get_mut(index) {
                        user.photo = Some(photo);
                    }
                }
            }
            print_json(&resolution)?;
        }

        Commands::Documents { author } => {
            let mapper = SearchResultMapper::new(client);
            let user = author.map(|name| User::new(name.clone(), name));
            let results = mapper.search(user.as_ref()).await?;
            info!({ RESULT_COUNT } = results.len(), "Search finished");
            print_json(&results)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
