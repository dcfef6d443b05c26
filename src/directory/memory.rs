//! In-memory directory for tests.  Applies mutations to its own tables, records every call in
//! order, and fails whichever operations a test asks it to.

use super::*;
use std::collections::HashSet;
use std::sync::Mutex;

/// A call the directory received and completed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    AddRole(UserId, RoleId),
    RemoveRole(UserId, RoleId),
    Kick(UserId, String),
    Timeout(UserId, Timeout, String),
    FetchActiveThreads(ChannelId),
    CreateThread(ChannelId, NewThread),
    AddThreadMember(ChannelId, UserId),
    ArchiveThread(ChannelId),
    SendMessage(ChannelId, Notice),
    DirectMessage(UserId, Notice),
    RegisterCommands(usize),
    SetPresence(String),
}

impl Call {
    /// Whether the call changed guild state (as opposed to reading it)
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::FetchActiveThreads(_))
    }
}

/// An operation the directory should refuse
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Fail {
    Member(UserId),
    AddRole(RoleId),
    RemoveRole(RoleId),
    Kick,
    Timeout,
    CreateThread(ThreadVisibility),
    AddThreadMember(UserId),
    SendMessage(ChannelId),
    DirectMessage,
    RegisterCommands,
}

#[derive(Default)]
struct State {
    members: HashMap<UserId, Member>,
    positions: HashMap<RoleId, u16>,
    channels: HashMap<ChannelId, ChannelInfo>,
    thread_parents: HashMap<ChannelId, ChannelId>,
    history: HashMap<ChannelId, Vec<PostedMessage>>,
    failures: HashSet<Fail>,
    calls: Vec<Call>,
    next_id: u64,
}

pub struct MemoryDirectory {
    bot_id: UserId,
    state: Mutex<State>,
}

impl MemoryDirectory {
    pub fn new(bot_id: UserId) -> Self {
        Self {
            bot_id,
            state: Mutex::new(State {
                next_id: 9000,
                ..Default::default()
            }),
        }
    }

    pub fn with_member(self, member: Member) -> Self {
        self.state
            .lock()
            .unwrap()
            .members
            .insert(member.user_id, member);
        self
    }

    pub fn with_role(self, role_id: RoleId, position: u16) -> Self {
        self.state
            .lock()
            .unwrap()
            .positions
            .insert(role_id, position);
        self
    }

    pub fn with_channel(self, id: ChannelId, name: &str, kind: ChannelKind) -> Self {
        self.state.lock().unwrap().channels.insert(
            id,
            ChannelInfo {
                id,
                name: name.to_owned(),
                kind,
                archived: false,
            },
        );
        self
    }

    pub fn with_thread(self, parent: ChannelId, id: ChannelId, name: &str, archived: bool) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.channels.insert(
                id,
                ChannelInfo {
                    id,
                    name: name.to_owned(),
                    kind: ChannelKind::Thread,
                    archived,
                },
            );
            state.thread_parents.insert(id, parent);
        }
        self
    }

    pub fn with_posted(self, channel_id: ChannelId, message: PostedMessage) -> Self {
        self.state
            .lock()
            .unwrap()
            .history
            .entry(channel_id)
            .or_default()
            .push(message);
        self
    }

    pub fn fail(&self, fail: Fail) {
        self.state.lock().unwrap().failures.insert(fail);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(Call::is_mutation)
            .collect()
    }

    pub fn member_roles(&self, user_id: UserId) -> Vec<RoleId> {
        self.state
            .lock()
            .unwrap()
            .members
            .get(&user_id)
            .map(|member| member.roles.clone())
            .unwrap_or_default()
    }

    pub fn channel_info(&self, channel_id: ChannelId) -> Option<ChannelInfo> {
        self.state.lock().unwrap().channels.get(&channel_id).cloned()
    }

    /// Everything sent to a channel, oldest first
    pub fn sent_to(&self, channel_id: ChannelId) -> Vec<Notice> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SendMessage(id, notice) if id == channel_id => Some(notice),
                _ => None,
            })
            .collect()
    }

    fn check(&self, state: &State, fail: Fail) -> DirectoryResult<()> {
        if state.failures.contains(&fail) {
            Err(DirectoryError::Rejected(format!("{:?}", fail)))
        } else {
            Ok(())
        }
    }
}

#[serenity::async_trait]
impl Directory for MemoryDirectory {
    async fn member(&self, _guild_id: GuildId, user_id: UserId) -> DirectoryResult<Member> {
        let state = self.state.lock().unwrap();
        self.check(&state, Fail::Member(user_id))?;
        state
            .members
            .get(&user_id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(format!("member {}", user_id)))
    }

    async fn role_positions(&self, _guild_id: GuildId) -> DirectoryResult<HashMap<RoleId, u16>> {
        Ok(self.state.lock().unwrap().positions.clone())
    }

    async fn role_members(
        &self,
        _guild_id: GuildId,
        role_id: RoleId,
    ) -> DirectoryResult<Vec<Member>> {
        let state = self.state.lock().unwrap();
        let mut holders: Vec<Member> = state
            .members
            .values()
            .filter(|member| member.has_role(role_id))
            .cloned()
            .collect();
        holders.sort_by_key(|member| member.user_id);
        Ok(holders)
    }

    async fn add_role(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        _reason: &str,
    ) -> DirectoryResult<()> {
        let mut state = self.state.lock().unwrap();
        self.check(&state, Fail::AddRole(role_id))?;
        let member = state
            .members
            .get_mut(&user_id)
            .ok_or_else(|| DirectoryError::NotFound(format!("member {}", user_id)))?;
        if !member.roles.contains(&role_id) {
            member.roles.push(role_id);
        }
        state.calls.push(Call::AddRole(user_id, role_id));
        Ok(())
    }

    async fn remove_role(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        _reason: &str,
    ) -> DirectoryResult<()> {
        let mut state = self.state.lock().unwrap();
        self.check(&state, Fail::RemoveRole(role_id))?;
        let member = state
            .members
            .get_mut(&user_id)
            .ok_or_else(|| DirectoryError::NotFound(format!("member {}", user_id)))?;
        member.roles.retain(|held| *held != role_id);
        state.calls.push(Call::RemoveRole(user_id, role_id));
        Ok(())
    }

    async fn kick(&self, _guild_id: GuildId, user_id: UserId, reason: &str) -> DirectoryResult<()> {
        let mut state = self.state.lock().unwrap();
        self.check(&state, Fail::Kick)?;
        state.members.remove(&user_id);
        state.calls.push(Call::Kick(user_id, reason.to_owned()));
        Ok(())
    }

    async fn timeout(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        timeout: Timeout,
        reason: &str,
    ) -> DirectoryResult<()> {
        let mut state = self.state.lock().unwrap();
        self.check(&state, Fail::Timeout)?;
        state
            .calls
            .push(Call::Timeout(user_id, timeout, reason.to_owned()));
        Ok(())
    }

    async fn channel(&self, channel_id: ChannelId) -> DirectoryResult<ChannelInfo> {
        self.state
            .lock()
            .unwrap()
            .channels
            .get(&channel_id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(format!("channel {}", channel_id)))
    }

    async fn active_threads(
        &self,
        _guild_id: GuildId,
        channel_id: ChannelId,
    ) -> DirectoryResult<Vec<ChannelInfo>> {
        let mut threads: Vec<ChannelInfo> = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::FetchActiveThreads(channel_id));
            state
                .thread_parents
                .iter()
                .filter(|(_, parent)| **parent == channel_id)
                .filter_map(|(thread_id, _)| state.channels.get(thread_id))
                .filter(|thread| !thread.archived)
                .cloned()
                .collect()
        };
        threads.sort_by_key(|thread| thread.id);
        // The listing is a snapshot. Yield so a concurrent caller can act on the same one,
        // like a real HTTP round trip.
        tokio::task::yield_now().await;
        Ok(threads)
    }

    async fn create_thread(
        &self,
        channel_id: ChannelId,
        thread: &NewThread,
    ) -> DirectoryResult<ChannelInfo> {
        let mut state = self.state.lock().unwrap();
        self.check(&state, Fail::CreateThread(thread.visibility))?;
        state.next_id += 1;
        let info = ChannelInfo {
            id: ChannelId::new(state.next_id),
            name: thread.name.clone(),
            kind: ChannelKind::Thread,
            archived: false,
        };
        state.channels.insert(info.id, info.clone());
        state.thread_parents.insert(info.id, channel_id);
        state
            .calls
            .push(Call::CreateThread(channel_id, thread.clone()));
        Ok(info)
    }

    async fn add_thread_member(
        &self,
        thread_id: ChannelId,
        user_id: UserId,
    ) -> DirectoryResult<()> {
        let mut state = self.state.lock().unwrap();
        self.check(&state, Fail::AddThreadMember(user_id))?;
        state.calls.push(Call::AddThreadMember(thread_id, user_id));
        Ok(())
    }

    async fn archive_thread(&self, thread_id: ChannelId, _reason: &str) -> DirectoryResult<()> {
        let mut state = self.state.lock().unwrap();
        let thread = state
            .channels
            .get_mut(&thread_id)
            .ok_or_else(|| DirectoryError::NotFound(format!("thread {}", thread_id)))?;
        thread.archived = true;
        state.calls.push(Call::ArchiveThread(thread_id));
        Ok(())
    }

    async fn send_message(
        &self,
        channel_id: ChannelId,
        notice: &Notice,
    ) -> DirectoryResult<MessageId> {
        let mut state = self.state.lock().unwrap();
        self.check(&state, Fail::SendMessage(channel_id))?;
        state.next_id += 1;
        let id = MessageId::new(state.next_id);
        let posted = PostedMessage {
            author_id: self.bot_id,
            component_ids: notice
                .buttons
                .iter()
                .map(|button| button.custom_id.to_owned())
                .collect(),
            embed_titles: notice
                .embed
                .iter()
                .map(|embed| embed.title.clone())
                .collect(),
        };
        state.history.entry(channel_id).or_default().push(posted);
        state
            .calls
            .push(Call::SendMessage(channel_id, notice.clone()));
        Ok(id)
    }

    async fn direct_message(&self, user_id: UserId, notice: &Notice) -> DirectoryResult<()> {
        let mut state = self.state.lock().unwrap();
        self.check(&state, Fail::DirectMessage)?;
        state
            .calls
            .push(Call::DirectMessage(user_id, notice.clone()));
        Ok(())
    }

    async fn recent_messages(
        &self,
        channel_id: ChannelId,
        limit: u8,
    ) -> DirectoryResult<Vec<PostedMessage>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .history
            .get(&channel_id)
            .map(|messages| {
                messages
                    .iter()
                    .rev()
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn register_commands(
        &self,
        _guild_id: GuildId,
        commands: Vec<CreateCommand>,
    ) -> DirectoryResult<usize> {
        let mut state = self.state.lock().unwrap();
        self.check(&state, Fail::RegisterCommands)?;
        state.calls.push(Call::RegisterCommands(commands.len()));
        Ok(commands.len())
    }

    async fn set_presence(&self, activity: &str) {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::SetPresence(activity.to_owned()));
    }
}
