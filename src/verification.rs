//! Role transitions that gate access to the guild.
//!
//! A member is unverified or verified.  Joining grants the unverified role; verifying swaps it
//! for the verified role.  The swap is two separate directory calls with no rollback, so a
//! failure between them can leave the member holding neither role (or both).

use crate::{
    config::Config,
    directory::{Directory, DirectoryError, DirectoryResult, Member},
};
use serenity::all::GuildId;

const VERIFY_REASON: &str = "Verification completed via Vintra";
const JOIN_REASON: &str = "Assign unverified role on join";

#[derive(Debug)]
pub enum VerifyOutcome {
    /// Member already held the verified role; nothing was changed
    Already,
    Success,
    Error(DirectoryError),
}

impl VerifyOutcome {
    pub fn reply_text(&self) -> &'static str {
        match self {
            VerifyOutcome::Already => "You are already verified! ⚡",
            VerifyOutcome::Success => "You are now verified! Welcome in! ✅",
            VerifyOutcome::Error(_) => "Could not verify you. Please contact an administrator.",
        }
    }
}

/// Swap the unverified role for the verified role.
pub async fn verify(
    directory: &dyn Directory,
    cfg: &Config,
    guild_id: GuildId,
    member: &Member,
) -> VerifyOutcome {
    if member.has_role(cfg.verified_role_id) {
        return VerifyOutcome::Already;
    }

    if member.has_role(cfg.unverified_role_id) {
        if let Err(err) = directory
            .remove_role(guild_id, member.user_id, cfg.unverified_role_id, VERIFY_REASON)
            .await
        {
            return VerifyOutcome::Error(err);
        }
    }

    match directory
        .add_role(guild_id, member.user_id, cfg.verified_role_id, VERIFY_REASON)
        .await
    {
        Ok(()) => VerifyOutcome::Success,
        Err(err) => VerifyOutcome::Error(err),
    }
}

/// Grant the unverified role to a newcomer unless they already hold it.  Returns whether a role
/// was added.
pub async fn mark_unverified(
    directory: &dyn Directory,
    cfg: &Config,
    guild_id: GuildId,
    member: &Member,
) -> DirectoryResult<bool> {
    if member.has_role(cfg.unverified_role_id) {
        return Ok(false);
    }

    directory
        .add_role(guild_id, member.user_id, cfg.unverified_role_id, JOIN_REASON)
        .await?;
    Ok(true)
}
