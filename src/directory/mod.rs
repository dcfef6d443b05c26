//! The guild directory: every member, role, channel and thread lookup or mutation the bot makes
//! goes through the [`Directory`] trait.  Production uses [`SerenityDirectory`], which reads the
//! serenity cache first and falls back to HTTP.  Tests use an in-memory double.

use crate::notice::Notice;
use serenity::all::{
    ChannelId, CreateCommand, GuildId, MessageId, Permissions, RoleId, UserId,
};
use std::collections::HashMap;
use thiserror::Error;

#[cfg(test)]
pub mod memory;
mod serenity_impl;

pub use serenity_impl::SerenityDirectory;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("discord request failed: {0}")]
    Discord(#[from] serenity::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("rejected: {0}")]
    Rejected(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// A user's presence in the guild, as far as this bot cares
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub user_id: UserId,
    /// Account username, used when naming ticket threads
    pub username: String,
    /// `name#discrim` for legacy accounts, plain username otherwise
    pub tag: String,
    pub roles: Vec<RoleId>,
    /// Guild-level permissions
    pub permissions: Permissions,
}

impl Member {
    pub fn has_role(&self, role_id: RoleId) -> bool {
        self.roles.contains(&role_id)
    }

    /// Administrators implicitly hold every permission.
    pub fn has_permission(&self, permission: Permissions) -> bool {
        self.permissions.administrator() || self.permissions.contains(permission)
    }

    /// Position of the member's highest role.  Members with no roles sit at the `@everyone`
    /// position, 0.
    pub fn highest_position(&self, positions: &HashMap<RoleId, u16>) -> u16 {
        self.roles
            .iter()
            .filter_map(|role_id| positions.get(role_id))
            .copied()
            .max()
            .unwrap_or(0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Thread,
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
    /// Only meaningful for threads
    pub archived: bool,
}

impl ChannelInfo {
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThreadVisibility {
    /// Only invited members and moderators can see it
    Private,
    Public,
}

/// Request for a new thread under a text channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewThread {
    pub name: String,
    pub visibility: ThreadVisibility,
    pub auto_archive_minutes: u16,
    pub reason: String,
}

/// A message already present in a channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedMessage {
    pub author_id: UserId,
    pub component_ids: Vec<String>,
    pub embed_titles: Vec<String>,
}

/// How long a member stays unable to talk
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timeout {
    Millis(u64),
    /// As long as the platform allows
    Indefinite,
}

#[serenity::async_trait]
pub trait Directory: Send + Sync {
    async fn member(&self, guild_id: GuildId, user_id: UserId) -> DirectoryResult<Member>;
    /// Hierarchy position of every role in the guild
    async fn role_positions(&self, guild_id: GuildId) -> DirectoryResult<HashMap<RoleId, u16>>;
    async fn role_members(&self, guild_id: GuildId, role_id: RoleId)
        -> DirectoryResult<Vec<Member>>;
    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> DirectoryResult<()>;
    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> DirectoryResult<()>;
    async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> DirectoryResult<()>;
    async fn timeout(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        timeout: Timeout,
        reason: &str,
    ) -> DirectoryResult<()>;

    async fn channel(&self, channel_id: ChannelId) -> DirectoryResult<ChannelInfo>;
    /// Freshly fetched, non-archived threads whose parent is `channel_id`
    async fn active_threads(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> DirectoryResult<Vec<ChannelInfo>>;
    async fn create_thread(
        &self,
        channel_id: ChannelId,
        thread: &NewThread,
    ) -> DirectoryResult<ChannelInfo>;
    async fn add_thread_member(&self, thread_id: ChannelId, user_id: UserId)
        -> DirectoryResult<()>;
    async fn archive_thread(&self, thread_id: ChannelId, reason: &str) -> DirectoryResult<()>;

    async fn send_message(&self, channel_id: ChannelId, notice: &Notice)
        -> DirectoryResult<MessageId>;
    async fn direct_message(&self, user_id: UserId, notice: &Notice) -> DirectoryResult<()>;
    /// Newest first
    async fn recent_messages(
        &self,
        channel_id: ChannelId,
        limit: u8,
    ) -> DirectoryResult<Vec<PostedMessage>>;

    async fn register_commands(
        &self,
        guild_id: GuildId,
        commands: Vec<CreateCommand>,
    ) -> DirectoryResult<usize>;
    /// Show "Watching <activity>"
    async fn set_presence(&self, activity: &str);
}

/// Outcome of turning an interaction's actor into a full member
pub enum MemberResolution {
    Resolved(Member),
    Unresolved(DirectoryError),
}

/// Use the member snapshot carried by the interaction if there is one, otherwise fetch it.
pub async fn resolve_member(
    directory: &dyn Directory,
    guild_id: GuildId,
    user_id: UserId,
    carried: Option<&Member>,
) -> MemberResolution {
    if let Some(member) = carried {
        return MemberResolution::Resolved(member.clone());
    }

    match directory.member(guild_id, user_id).await {
        Ok(member) => MemberResolution::Resolved(member),
        Err(err) => MemberResolution::Unresolved(err),
    }
}
