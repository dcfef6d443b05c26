use super::*;
use serenity::all::{
    ActivityData, AutoArchiveDuration, Cache, Channel, ChannelType, CreateThread, EditMember,
    EditThread, GetMessages, Http, Role, ShardMessenger, Timestamp,
};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

/// Longest communication timeout Discord accepts: 28 days
pub const MAX_TIMEOUT_MS: u64 = 28 * 24 * 60 * 60 * 1000;

/// Directory backed by the live serenity client
pub struct SerenityDirectory {
    cache: Arc<Cache>,
    http: Arc<Http>,
    shard: ShardMessenger,
}

impl SerenityDirectory {
    pub fn new(ctx: &serenity::all::Context) -> Self {
        Self {
            cache: ctx.cache.clone(),
            http: ctx.http.clone(),
            shard: ctx.shard.clone(),
        }
    }

    /// Guild owner and role table, from the cache when the guild is cached
    async fn guild_roles(
        &self,
        guild_id: GuildId,
    ) -> DirectoryResult<(UserId, HashMap<RoleId, Role>)> {
        // Don't hold the cache guard across an await.
        let cached = self
            .cache
            .guild(guild_id)
            .map(|guild| (guild.owner_id, guild.roles.clone()));

        match cached {
            Some(found) => Ok(found),
            None => {
                let guild = guild_id.to_partial_guild(&self.http).await?;
                Ok((guild.owner_id, guild.roles))
            }
        }
    }

    fn cache_http(&self) -> (&Arc<Cache>, &Http) {
        (&self.cache, &*self.http)
    }
}

fn to_member(
    guild_id: GuildId,
    member: &serenity::all::Member,
    owner_id: UserId,
    roles: &HashMap<RoleId, Role>,
) -> Member {
    let permissions = match member.permissions {
        Some(permissions) => permissions,
        None => permissions_from_roles(guild_id, member, owner_id, roles),
    };

    Member {
        user_id: member.user.id,
        username: member.user.name.clone(),
        tag: member.user.tag(),
        roles: member.roles.clone(),
        permissions,
    }
}

// Guild-level permissions: `@everyone` plus every held role, everything for the owner and for
// administrators.
fn permissions_from_roles(
    guild_id: GuildId,
    member: &serenity::all::Member,
    owner_id: UserId,
    roles: &HashMap<RoleId, Role>,
) -> Permissions {
    if member.user.id == owner_id {
        return Permissions::all();
    }

    // The `@everyone` role shares the guild's id.
    let everyone = RoleId::new(guild_id.get());
    let permissions = std::iter::once(&everyone)
        .chain(member.roles.iter())
        .filter_map(|role_id| roles.get(role_id))
        .fold(Permissions::empty(), |acc, role| acc | role.permissions);

    if permissions.administrator() {
        Permissions::all()
    } else {
        permissions
    }
}

fn to_channel_info(channel: &serenity::all::GuildChannel) -> ChannelInfo {
    let kind = match channel.kind {
        ChannelType::Text => ChannelKind::Text,
        ChannelType::PublicThread | ChannelType::PrivateThread | ChannelType::NewsThread => {
            ChannelKind::Thread
        }
        _ => ChannelKind::Other,
    };

    ChannelInfo {
        id: channel.id,
        name: channel.name.clone(),
        kind,
        archived: channel
            .thread_metadata
            .as_ref()
            .map(|metadata| metadata.archived)
            .unwrap_or(false),
    }
}

fn auto_archive(minutes: u16) -> AutoArchiveDuration {
    match minutes {
        0..=60 => AutoArchiveDuration::OneHour,
        61..=1440 => AutoArchiveDuration::OneDay,
        1441..=4320 => AutoArchiveDuration::ThreeDays,
        _ => AutoArchiveDuration::OneWeek,
    }
}

// Every `custom_id` anywhere inside a component tree
fn collect_custom_ids(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                match (key.as_str(), value) {
                    ("custom_id", serde_json::Value::String(id)) => out.push(id.clone()),
                    _ => collect_custom_ids(value, out),
                }
            }
        }
        serde_json::Value::Array(values) => {
            for value in values {
                collect_custom_ids(value, out);
            }
        }
        _ => {}
    }
}

#[serenity::async_trait]
impl Directory for SerenityDirectory {
    async fn member(&self, guild_id: GuildId, user_id: UserId) -> DirectoryResult<Member> {
        let member = guild_id.member(self.cache_http(), user_id).await?;
        let (owner_id, roles) = self.guild_roles(guild_id).await?;
        Ok(to_member(guild_id, &member, owner_id, &roles))
    }

    async fn role_positions(&self, guild_id: GuildId) -> DirectoryResult<HashMap<RoleId, u16>> {
        let (_, roles) = self.guild_roles(guild_id).await?;
        Ok(roles
            .into_iter()
            .map(|(role_id, role)| (role_id, role.position))
            .collect())
    }

    async fn role_members(
        &self,
        guild_id: GuildId,
        role_id: RoleId,
    ) -> DirectoryResult<Vec<Member>> {
        let (owner_id, roles) = self.guild_roles(guild_id).await?;
        if !roles.contains_key(&role_id) {
            return Err(DirectoryError::NotFound(format!("role {}", role_id)));
        }

        let cached: Option<Vec<serenity::all::Member>> = self.cache.guild(guild_id).map(|guild| {
            guild
                .members
                .values()
                .filter(|member| member.roles.contains(&role_id))
                .cloned()
                .collect()
        });

        let holders = match cached {
            Some(holders) if !holders.is_empty() => holders,
            _ => guild_id
                .members(&self.http, Some(1000), None)
                .await?
                .into_iter()
                .filter(|member| member.roles.contains(&role_id))
                .collect(),
        };

        Ok(holders
            .iter()
            .map(|member| to_member(guild_id, member, owner_id, &roles))
            .collect())
    }

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> DirectoryResult<()> {
        self.http
            .add_member_role(guild_id, user_id, role_id, Some(reason))
            .await
            .map_err(Into::into)
    }

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> DirectoryResult<()> {
        self.http
            .remove_member_role(guild_id, user_id, role_id, Some(reason))
            .await
            .map_err(Into::into)
    }

    async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> DirectoryResult<()> {
        guild_id
            .kick_with_reason(&self.http, user_id, reason)
            .await
            .map_err(Into::into)
    }

    async fn timeout(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        timeout: Timeout,
        reason: &str,
    ) -> DirectoryResult<()> {
        let millis = match timeout {
            Timeout::Millis(millis) => millis,
            Timeout::Indefinite => MAX_TIMEOUT_MS,
        };

        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |since| since.as_millis() as u64);
        let until_secs = now_ms.saturating_add(millis) / 1000;
        let until = Timestamp::from_unix_timestamp(until_secs as i64)
            .map_err(|_| DirectoryError::Rejected("timeout expiry out of range".to_owned()))?;

        guild_id
            .edit_member(
                &self.http,
                user_id,
                EditMember::new()
                    .disable_communication_until_datetime(until)
                    .audit_log_reason(reason),
            )
            .await
            .map(|_| ())
            .map_err(Into::into)
    }

    async fn channel(&self, channel_id: ChannelId) -> DirectoryResult<ChannelInfo> {
        match channel_id.to_channel(self.cache_http()).await? {
            Channel::Guild(channel) => Ok(to_channel_info(&channel)),
            _ => Err(DirectoryError::Rejected(format!(
                "channel {} is not a guild channel",
                channel_id
            ))),
        }
    }

    async fn active_threads(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> DirectoryResult<Vec<ChannelInfo>> {
        let active = guild_id.get_active_threads(&self.http).await?;
        Ok(active
            .threads
            .iter()
            .filter(|thread| thread.parent_id == Some(channel_id))
            .map(to_channel_info)
            .filter(|thread| !thread.archived)
            .collect())
    }

    async fn create_thread(
        &self,
        channel_id: ChannelId,
        thread: &NewThread,
    ) -> DirectoryResult<ChannelInfo> {
        let kind = match thread.visibility {
            ThreadVisibility::Private => ChannelType::PrivateThread,
            ThreadVisibility::Public => ChannelType::PublicThread,
        };

        let created = channel_id
            .create_thread(
                &self.http,
                CreateThread::new(thread.name.as_str())
                    .kind(kind)
                    .auto_archive_duration(auto_archive(thread.auto_archive_minutes))
                    .audit_log_reason(&thread.reason),
            )
            .await?;

        Ok(to_channel_info(&created))
    }

    async fn add_thread_member(
        &self,
        thread_id: ChannelId,
        user_id: UserId,
    ) -> DirectoryResult<()> {
        thread_id
            .add_thread_member(&self.http, user_id)
            .await
            .map_err(Into::into)
    }

    async fn archive_thread(&self, thread_id: ChannelId, reason: &str) -> DirectoryResult<()> {
        thread_id
            .edit_thread(
                &self.http,
                EditThread::new().archived(true).audit_log_reason(reason),
            )
            .await
            .map(|_| ())
            .map_err(Into::into)
    }

    async fn send_message(
        &self,
        channel_id: ChannelId,
        notice: &Notice,
    ) -> DirectoryResult<MessageId> {
        channel_id
            .send_message(&self.http, notice.to_create_message())
            .await
            .map(|msg| msg.id)
            .map_err(Into::into)
    }

    async fn direct_message(&self, user_id: UserId, notice: &Notice) -> DirectoryResult<()> {
        user_id
            .direct_message(&self.http, notice.to_create_message())
            .await
            .map(|_| ())
            .map_err(Into::into)
    }

    async fn recent_messages(
        &self,
        channel_id: ChannelId,
        limit: u8,
    ) -> DirectoryResult<Vec<PostedMessage>> {
        let messages = channel_id
            .messages(&self.http, GetMessages::new().limit(limit))
            .await?;

        Ok(messages
            .iter()
            .map(|msg| {
                let mut component_ids = Vec::new();
                if let Ok(rows) = serde_json::to_value(&msg.components) {
                    collect_custom_ids(&rows, &mut component_ids);
                }
                PostedMessage {
                    author_id: msg.author.id,
                    component_ids,
                    embed_titles: msg
                        .embeds
                        .iter()
                        .filter_map(|embed| embed.title.clone())
                        .collect(),
                }
            })
            .collect())
    }

    async fn register_commands(
        &self,
        guild_id: GuildId,
        commands: Vec<CreateCommand>,
    ) -> DirectoryResult<usize> {
        guild_id
            .set_commands(&self.http, commands)
            .await
            .map(|registered| registered.len())
            .map_err(Into::into)
    }

    async fn set_presence(&self, activity: &str) {
        self.shard
            .set_activity(Some(ActivityData::watching(activity)));
    }
}
