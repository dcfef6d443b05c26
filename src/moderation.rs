//! Guards shared by the moderation commands, and the kick/mute actions behind them.
//!
//! Checks run in a fixed order and stop at the first refusal: the actor's native permission,
//! the bot's native permission, self-targeting, target lookup, then role hierarchy for the
//! actor and for the bot.  Nothing is mutated unless every check passes.

use crate::{
    directory::{Directory, DirectoryError, Member, Timeout},
    log_internal,
    logging::PrintColor,
};
use serenity::all::{GuildId, Permissions, UserId};

pub const DEFAULT_REASON: &str = "No reason provided.";

pub fn reason_or_default(reason: Option<&str>) -> String {
    reason.unwrap_or(DEFAULT_REASON).to_owned()
}

/// Longest timeout Discord accepts: 28 days
pub const MAX_MUTE_MINUTES: u64 = 28 * 24 * 60;

/// Mute length in minutes, capped at [`MAX_MUTE_MINUTES`].  `None` means indefinite.
fn mute_minutes(minutes: Option<i64>) -> Option<u64> {
    match minutes {
        Some(minutes) if minutes > 0 => Some((minutes as u64).min(MAX_MUTE_MINUTES)),
        _ => None,
    }
}

/// Duration of a mute.  Anything but a positive number of minutes is indefinite.
pub fn mute_timeout(minutes: Option<i64>) -> Timeout {
    match mute_minutes(minutes) {
        Some(minutes) => Timeout::Millis(minutes * 60 * 1000),
        None => Timeout::Indefinite,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sanction {
    Kick,
    Mute { minutes: Option<i64> },
}

impl Sanction {
    pub fn verb(&self) -> &'static str {
        match self {
            Sanction::Kick => "kick",
            Sanction::Mute { .. } => "mute",
        }
    }

    fn permission(&self) -> Permissions {
        match self {
            Sanction::Kick => Permissions::KICK_MEMBERS,
            Sanction::Mute { .. } => Permissions::MUTE_MEMBERS,
        }
    }

    fn permission_label(&self) -> &'static str {
        match self {
            Sanction::Kick => "Kick Members",
            Sanction::Mute { .. } => "Mute Members",
        }
    }

    fn success_text(&self, target_tag: &str, reason: &str) -> String {
        match self {
            Sanction::Kick => format!("Kicked {}. Reason: {}", target_tag, reason),
            Sanction::Mute { minutes } => match mute_minutes(*minutes) {
                Some(minutes) => format!(
                    "Muted {} for {} minutes. Reason: {}",
                    target_tag, minutes, reason
                ),
                None => format!("Muted {} indefinitely. Reason: {}", target_tag, reason),
            },
        }
    }
}

/// Why a moderation command did nothing
#[derive(Debug)]
pub enum Refusal {
    ActorMissingPermission(Sanction),
    BotMissingPermission(Sanction),
    /// Carries the verb of the refused command
    SelfTarget(&'static str),
    TargetNotFound,
    ActorOutranked(Sanction),
    BotOutranked(Sanction),
    Failed(Sanction, DirectoryError),
}

impl Refusal {
    pub fn reply_text(&self) -> String {
        match self {
            Refusal::ActorMissingPermission(sanction) => format!(
                "You are missing the {} permission.",
                sanction.permission_label()
            ),
            Refusal::BotMissingPermission(sanction) => {
                format!("I do not have permission to {} members.", sanction.verb())
            }
            Refusal::SelfTarget(verb) => format!("You cannot {} yourself.", verb),
            Refusal::TargetNotFound => "Could not find that member in the server.".to_owned(),
            Refusal::ActorOutranked(sanction) => format!(
                "You cannot {} a member with an equal or higher role.",
                sanction.verb()
            ),
            Refusal::BotOutranked(sanction) => format!(
                "I cannot {} a member with an equal or higher role than mine.",
                sanction.verb()
            ),
            Refusal::Failed(sanction, _) => format!(
                "Failed to {} that member. Please check my permissions and role hierarchy.",
                sanction.verb()
            ),
        }
    }
}

/// Refuse commands aimed at the actor themselves.
pub fn reject_self_target(
    verb: &'static str,
    actor_id: UserId,
    target_id: UserId,
) -> Result<(), Refusal> {
    if actor_id == target_id {
        Err(Refusal::SelfTarget(verb))
    } else {
        Ok(())
    }
}

/// Look up the target of a moderation command.
pub async fn find_target(
    directory: &dyn Directory,
    guild_id: GuildId,
    target_id: UserId,
) -> Result<Member, Refusal> {
    directory
        .member(guild_id, target_id)
        .await
        .map_err(|_| Refusal::TargetNotFound)
}

/// Run every guard, then kick or mute the target.  Returns the text to reply with on success.
pub async fn apply(
    directory: &dyn Directory,
    guild_id: GuildId,
    bot_id: UserId,
    sanction: Sanction,
    actor: &Member,
    target_id: UserId,
    reason: &str,
) -> Result<String, Refusal> {
    if !actor.has_permission(sanction.permission()) {
        return Err(Refusal::ActorMissingPermission(sanction));
    }

    let bot = match directory.member(guild_id, bot_id).await {
        Ok(bot) if bot.has_permission(sanction.permission()) => bot,
        Ok(_) => return Err(Refusal::BotMissingPermission(sanction)),
        Err(err) => {
            tracing::warn!("Could not load the bot's own member: {}", err);
            return Err(Refusal::BotMissingPermission(sanction));
        }
    };

    reject_self_target(sanction.verb(), actor.user_id, target_id)?;
    let target = find_target(directory, guild_id, target_id).await?;

    let positions = directory
        .role_positions(guild_id)
        .await
        .map_err(|err| Refusal::Failed(sanction, err))?;
    let target_position = target.highest_position(&positions);

    if actor.highest_position(&positions) <= target_position {
        return Err(Refusal::ActorOutranked(sanction));
    }
    if bot.highest_position(&positions) <= target_position {
        return Err(Refusal::BotOutranked(sanction));
    }

    let result = match sanction {
        Sanction::Kick => directory.kick(guild_id, target.user_id, reason).await,
        Sanction::Mute { minutes } => {
            directory
                .timeout(guild_id, target.user_id, mute_timeout(minutes), reason)
                .await
        }
    };

    if let Err(err) = result {
        return Err(Refusal::Failed(sanction, err));
    }

    log_internal!(
        "{} {} {}: {}",
        actor.color(),
        match sanction {
            Sanction::Kick => "kicked",
            Sanction::Mute { .. } => "muted",
        },
        target.color(),
        reason,
    );
    Ok(sanction.success_text(&target.tag, reason))
}
