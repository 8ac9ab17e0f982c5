use anyhow::{Context, Result};
use rollcall_app::{RemoteSource, SyncService};
use rollcall_core::{GroupId, ProfileId, SessionId};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::Command;

pub async fn run<R: RemoteSource>(
    command: Command,
    service: &SyncService<R>,
    actor: Option<ProfileId>,
    json: bool,
) -> Result<()> {
    match command {
        Command::Groups => handle_groups(service, actor, json).await,
        Command::Members { group } => handle_members(service, group, json).await,
        Command::Sessions { group } => handle_sessions(service, group, json).await,
        Command::History { session } => handle_history(service, session, json).await,
        Command::Checkin { session, member } => handle_checkin(service, session, member, json).await,
        Command::Score { session, member } => handle_score(service, session, member, json).await,
        Command::Stats { session } => handle_stats(service, session, json).await,
    }
}

fn require_actor(actor: Option<ProfileId>) -> Result<ProfileId> {
    actor.context("this command needs --actor or ROLLCALL_ACTOR")
}

fn timestamp(at: OffsetDateTime) -> Result<String> {
    Ok(at.format(&Rfc3339)?)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn handle_groups<R: RemoteSource>(
    service: &SyncService<R>,
    actor: Option<ProfileId>,
    json: bool,
) -> Result<()> {
    let actor = require_actor(actor)?;
    let memberships = service.groups().fetch_user_groups(Some(actor)).await;
    if json {
        return print_json(&memberships);
    }
    if memberships.is_empty() {
        println!("No groups found");
    }
    for membership in memberships {
        let group = membership.group;
        println!("{}  {}  {:<6}  {}", group.id, group.code, membership.role, group.name);
    }
    Ok(())
}

async fn handle_members<R: RemoteSource>(
    service: &SyncService<R>,
    group: GroupId,
    json: bool,
) -> Result<()> {
    let members = service.members().fetch_group_members(group, false).await;
    if let Some(err) = service.members().last_error() {
        anyhow::bail!("failed to load members of {group}: {err}");
    }
    if json {
        return print_json(&members);
    }
    for member in members {
        let name = member.profile.username.as_deref().unwrap_or("?");
        println!(
            "{}  {:<6}  {:>6}  {name}",
            member.profile_id, member.role, member.score
        );
    }
    Ok(())
}

async fn handle_sessions<R: RemoteSource>(
    service: &SyncService<R>,
    group: GroupId,
    json: bool,
) -> Result<()> {
    let sessions = service.sessions().fetch_sessions_by_group(group, false).await;
    if let Some(err) = service.sessions().last_error() {
        anyhow::bail!("failed to load sessions of {group}: {err}");
    }
    if json {
        return print_json(&sessions);
    }
    for session in sessions {
        println!(
            "{}  {:<7}  {}  {}",
            session.id,
            session.status,
            timestamp(session.created_at)?,
            session.name
        );
    }
    Ok(())
}

async fn handle_history<R: RemoteSource>(
    service: &SyncService<R>,
    session: SessionId,
    json: bool,
) -> Result<()> {
    let entries = service.history().fetch_session_history(session, false).await;
    if let Some(err) = service.history().last_error() {
        anyhow::bail!("failed to load history of {session}: {err}");
    }
    if json {
        return print_json(&entries);
    }
    for entry in entries {
        let member = entry.member_profile.username.as_deref().unwrap_or("?");
        println!(
            "{}  {member:<12}  {:<10}  {:>6}",
            timestamp(entry.created_at)?,
            entry.action,
            entry.score
        );
    }
    Ok(())
}

async fn handle_checkin<R: RemoteSource>(
    service: &SyncService<R>,
    session: SessionId,
    member: Option<ProfileId>,
    json: bool,
) -> Result<()> {
    let entry = service.perform_checkin(session, member).await?;
    if json {
        return print_json(&entry);
    }
    println!(
        "checked in: {} to {} (+{})",
        entry.member_id, entry.session_id, entry.score
    );
    Ok(())
}

async fn handle_score<R: RemoteSource>(
    service: &SyncService<R>,
    session: SessionId,
    member: ProfileId,
    json: bool,
) -> Result<()> {
    service.history().fetch_session_history(session, false).await;
    let score = service.history().user_session_score(session, member);
    if json {
        return print_json(&serde_json::json!({
            "session": session,
            "member": member,
            "score": score,
        }));
    }
    println!("{score}");
    Ok(())
}

async fn handle_stats<R: RemoteSource>(
    service: &SyncService<R>,
    session: SessionId,
    json: bool,
) -> Result<()> {
    service.history().fetch_session_history(session, false).await;
    let stats = service.history().session_stats(session);
    if json {
        return print_json(&stats);
    }
    println!("entries:      {}", stats.total_entries);
    println!("check-ins:    {}", stats.total_checkins);
    println!("participants: {}", stats.total_participants);
    println!("total score:  {}", stats.total_score);
    match stats.latest_activity {
        Some(at) => println!("latest:       {}", timestamp(at)?),
        None => println!("latest:       -"),
    }
    Ok(())
}
