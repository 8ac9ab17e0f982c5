//! CLI entry point for rollcall.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rollcall_app::{CacheConfig, SyncService};
use rollcall_core::{GroupId, ProfileId, SessionId};
use rollcall_store_memory::MemoryRemote;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod actor;
mod commands;

/// Inspect and drive the rollcall cache against a JSON dataset.
#[derive(Parser, Debug)]
#[command(
    name = "rollcall",
    version,
    about = "rollcall: group check-in cache driven against a local dataset"
)]
struct Cli {
    /// Dataset file standing in for the hosted store.
    #[arg(long, default_value = "rollcall.json")]
    data: PathBuf,

    /// Cache configuration file (defaults to .rollcall/cache.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Acting profile, by id or username.
    #[arg(long, env = "ROLLCALL_ACTOR")]
    actor: Option<String>,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the groups of the acting profile.
    Groups,

    /// List the members of a group with their scores.
    Members {
        #[arg(long)]
        group: GroupId,
    },

    /// List the sessions of a group.
    Sessions {
        #[arg(long)]
        group: GroupId,
    },

    /// Show the history of a session, newest first.
    History {
        #[arg(long)]
        session: SessionId,
    },

    /// Check a member (the actor by default) in to a session.
    Checkin {
        #[arg(long)]
        session: SessionId,
        #[arg(long)]
        member: Option<ProfileId>,
    },

    /// Total score of a member in a session.
    Score {
        #[arg(long)]
        session: SessionId,
        #[arg(long)]
        member: ProfileId,
    },

    /// Summary of a session's history.
    Stats {
        #[arg(long)]
        session: SessionId,
    },
}

impl Command {
    const fn mutates(&self) -> bool {
        matches!(self, Self::Checkin { .. })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    install_tracing();
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(execute(cli))
}

async fn execute(cli: Cli) -> Result<()> {
    let Cli {
        data,
        config,
        actor,
        json,
        cmd,
    } = cli;
    let config = match config {
        Some(path) => CacheConfig::from_path(path)?,
        None => CacheConfig::from_workdir(".")?,
    };
    let persist_path = config.persist_path.clone();

    let remote = Arc::new(MemoryRemote::open(&data)?);
    let actor = actor::resolve(actor.as_deref(), |username| {
        Ok(remote.profile_by_username(username)?.id)
    })?;
    if let Some(actor) = actor {
        remote.sign_in(actor);
    }

    let service = SyncService::new(Arc::clone(&remote), config);
    if let Some(path) = &persist_path {
        service.restore(path)?;
    }
    if let Some(actor) = actor {
        service.login(actor).await?;
    }

    let mutates = cmd.mutates();
    commands::run(cmd, &service, actor, json).await?;

    if mutates {
        remote.save(&data)?;
    }
    if let Some(path) = &persist_path {
        service.persist(path)?;
    }
    Ok(())
}

fn install_tracing() {
    // RUST_LOG overrides the INFO default.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
