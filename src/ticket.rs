//! Support tickets: one thread per requester under the support channel.
//!
//! A requester has no ticket, an open one, or closed ones.  Opening is a no-op while a
//! non-archived thread carrying the requester's id exists.  Closing archives the thread.
//! Open requests are serialized per requester so two quick presses can't both pass the
//! existing-thread check.

use crate::{
    commands::CLOSE_TICKET_BUTTON,
    config::Config,
    directory::{
        ChannelInfo, ChannelKind, Directory, DirectoryError, DirectoryResult, Member, NewThread,
        ThreadVisibility,
    },
    interaction::Actor,
    log_internal,
    logging::PrintColor,
    notice::{Button, Embed, Notice},
};
use serenity::all::{GuildId, Permissions, UserId};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};

const NAME_PREFIX_LEN: usize = 50;
const NAME_MAX_LEN: usize = 90;
pub const AUTO_ARCHIVE_MINUTES: u16 = 1440;

/// Permission that lets staff close anyone's ticket
pub const STAFF_PERMISSION: Permissions = Permissions::MANAGE_THREADS;

/// Thread name for a requester's ticket: `ticket-<username>-<id>`.  The username part is
/// restricted to `[A-Za-z0-9-]`, so the id is always findable as a substring.
pub fn thread_name(username: &str, user_id: UserId) -> String {
    let mut base = String::new();
    for c in format!("ticket-{}", username).chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            base.push(c);
        } else {
            // One dash per UTF-16 unit, so a name cut at 50 looks the same as in the
            // Discord client.
            for _ in 0..c.len_utf16() {
                base.push('-');
            }
        }
    }
    base.truncate(NAME_PREFIX_LEN.min(base.len()));

    let mut name = format!("{}-{}", base, user_id);
    name.truncate(NAME_MAX_LEN.min(name.len()));
    name
}

/// Whether a ticket thread belongs to `user_id`.  Matches the `-<id>` tail [`thread_name`]
/// always ends with, so digits inside a username can't claim someone else's ticket.
pub fn is_owner(thread: &ChannelInfo, user_id: UserId) -> bool {
    thread.name.ends_with(&format!("-{}", user_id))
}

/// Staff may close any ticket; requesters may close their own.
pub fn can_close(thread: &ChannelInfo, actor: &Member) -> bool {
    actor.has_permission(STAFF_PERMISSION) || is_owner(thread, actor.user_id)
}

/// Per-requester locks for ticket creation
#[derive(Default)]
pub struct TicketLocks(Mutex<HashMap<UserId, Arc<Mutex<()>>>>);

impl TicketLocks {
    pub async fn acquire(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.0.lock().await;
            // Drop locks nobody holds or waits on.
            locks.retain(|id, lock| *id == user_id || Arc::strong_count(lock) > 1);
            locks.entry(user_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[derive(Debug)]
pub enum OpenOutcome {
    /// Support channel missing or not a text channel
    SupportUnavailable,
    /// Requester already has an active ticket
    Existing(ChannelInfo),
    Created {
        thread: ChannelInfo,
        visibility: ThreadVisibility,
    },
}

impl OpenOutcome {
    pub fn reply_text(&self) -> String {
        match self {
            OpenOutcome::SupportUnavailable => {
                "Support channel is unavailable. Please contact a moderator.".to_owned()
            }
            OpenOutcome::Existing(thread) => {
                format!("You already have an open ticket: {}.", thread.mention())
            }
            OpenOutcome::Created { thread, .. } => {
                format!("Your ticket has been created: {}.", thread.mention())
            }
        }
    }
}

/// Find or create the requester's ticket thread.
pub async fn open_ticket(
    directory: &dyn Directory,
    cfg: &Config,
    locks: &TicketLocks,
    guild_id: GuildId,
    requester: &Actor,
) -> DirectoryResult<OpenOutcome> {
    let support = match directory.channel(cfg.support_channel_id).await {
        Ok(channel) if channel.kind == ChannelKind::Text => channel,
        Ok(_) => {
            tracing::warn!("Support channel is not a text channel.");
            return Ok(OpenOutcome::SupportUnavailable);
        }
        Err(err) => {
            tracing::warn!("Support channel lookup failed: {}", err);
            return Ok(OpenOutcome::SupportUnavailable);
        }
    };

    let _guard = locks.acquire(requester.id).await;

    // Cached thread lists go stale, so always ask the directory.
    let active = match directory.active_threads(guild_id, support.id).await {
        Ok(active) => active,
        Err(err) => {
            tracing::warn!("Could not refresh active ticket threads: {}", err);
            Vec::new()
        }
    };

    if let Some(existing) = active
        .into_iter()
        .find(|thread| !thread.archived && is_owner(thread, requester.id))
    {
        return Ok(OpenOutcome::Existing(existing));
    }

    let mut request = NewThread {
        name: thread_name(&requester.username, requester.id),
        visibility: ThreadVisibility::Private,
        auto_archive_minutes: AUTO_ARCHIVE_MINUTES,
        reason: format!("Support ticket for {}", requester.tag),
    };

    let thread = match directory.create_thread(support.id, &request).await {
        Ok(thread) => thread,
        Err(err) => {
            tracing::warn!(
                "Private thread creation failed, falling back to public thread: {}",
                err
            );
            request.visibility = ThreadVisibility::Public;
            directory.create_thread(support.id, &request).await?
        }
    };

    if let Err(err) = directory.add_thread_member(thread.id, requester.id).await {
        tracing::warn!("Failed to add {} to their ticket: {}", requester.tag, err);
    }
    invite_staff(directory, cfg, guild_id, &thread, requester.id).await;

    let opening = Notice::text(format!("{} opened a ticket.", requester.mention()))
        .with_embed(
            Embed::new("Support Ticket", 0x2ECC71)
                .description(
                    "A staff member will be with you shortly. Share your issue below so we can \
                     help you faster.",
                )
                .footer(format!("Requester: {}", requester.tag)),
        )
        .with_button(Button {
            custom_id: CLOSE_TICKET_BUTTON,
            label: "Close Ticket",
            primary: false,
        });
    if let Err(err) = directory.send_message(thread.id, &opening).await {
        tracing::error!("Failed to post ticket controls in {}: {}", thread.color(), err);
    }

    Ok(OpenOutcome::Created {
        thread,
        visibility: request.visibility,
    })
}

/// Add every holder of the admin role to the thread.  Individual failures are skipped.
async fn invite_staff(
    directory: &dyn Directory,
    cfg: &Config,
    guild_id: GuildId,
    thread: &ChannelInfo,
    requester_id: UserId,
) {
    let staff = match directory.role_members(guild_id, cfg.admin_role_id).await {
        Ok(staff) => staff,
        Err(err) => {
            tracing::warn!("Admin role not found. Skipping admin thread invitations: {}", err);
            return;
        }
    };

    if staff.is_empty() {
        tracing::warn!("Admin role has no members to invite into ticket.");
        return;
    }

    for member in staff.iter().filter(|member| member.user_id != requester_id) {
        if let Err(err) = directory.add_thread_member(thread.id, member.user_id).await {
            tracing::warn!(
                "Failed to add admin {} to ticket thread: {}",
                member.tag,
                err
            );
        }
    }
}

/// Post the closing notice and archive the thread.  Authorization is checked with
/// [`can_close`] beforehand.
pub async fn close_ticket(
    directory: &dyn Directory,
    thread: &ChannelInfo,
    closer: &Actor,
) -> Result<(), DirectoryError> {
    let notice = Notice::text(format!("Ticket closed by {}.", closer.mention()));
    if let Err(err) = directory.send_message(thread.id, &notice).await {
        tracing::warn!("Failed to post closing notice in {}: {}", thread.color(), err);
    }

    directory.archive_thread(thread.id, "Ticket closed").await?;

    log_internal!("{} closed ticket {}", closer.color(), thread.color());
    Ok(())
}
