//! Inbound interactions and their single reply.
//!
//! Discord accepts exactly one response per interaction: either an immediate message, or a
//! deferral later filled in by an edit.  [`Responder`] tracks which of those has happened so a
//! handler can't answer twice.

use crate::directory::Member;
use serenity::all::{
    ChannelId, CommandInteraction, ComponentInteraction, CreateInteractionResponse,
    CreateInteractionResponseMessage, EditInteractionResponse, GuildId, Http, Permissions,
    ResolvedValue, UserId,
};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum ReplyError {
    #[error("interaction already replied to")]
    AlreadyReplied,

    #[error("failed to deliver interaction reply: {0}")]
    Transport(#[from] serenity::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionKind {
    Command,
    Component,
}

/// Who triggered an interaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub username: String,
    pub tag: String,
}

impl Actor {
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// Typed slash command options
#[derive(Clone, Debug, Default)]
pub struct CommandOptions {
    pub strings: HashMap<String, String>,
    pub users: HashMap<String, UserId>,
    pub integers: HashMap<String, i64>,
}

#[derive(Clone, Debug)]
pub struct InteractionRequest {
    pub kind: InteractionKind,
    /// Command name or button custom id
    pub identifier: String,
    pub actor: Actor,
    /// None when sent from a direct message
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    /// Member snapshot carried by the payload, if any
    pub member: Option<Member>,
    pub options: CommandOptions,
}

impl InteractionRequest {
    pub fn string(&self, name: &str) -> Option<&str> {
        self.options
            .strings
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn user(&self, name: &str) -> Option<UserId> {
        self.options.users.get(name).copied()
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.options.integers.get(name).copied()
    }

    pub fn from_command(command: &CommandInteraction) -> Self {
        let mut options = CommandOptions::default();
        for option in command.data.options() {
            match option.value {
                ResolvedValue::String(value) => {
                    options
                        .strings
                        .insert(option.name.to_owned(), value.to_owned());
                }
                ResolvedValue::Integer(value) => {
                    options.integers.insert(option.name.to_owned(), value);
                }
                ResolvedValue::User(user, _) => {
                    options.users.insert(option.name.to_owned(), user.id);
                }
                _ => {}
            }
        }

        Self {
            kind: InteractionKind::Command,
            identifier: command.data.name.clone(),
            actor: Actor::from(&command.user),
            guild_id: command.guild_id,
            channel_id: command.channel_id,
            member: command.member.as_deref().map(Member::from),
            options,
        }
    }

    pub fn from_component(component: &ComponentInteraction) -> Self {
        Self {
            kind: InteractionKind::Component,
            identifier: component.data.custom_id.clone(),
            actor: Actor::from(&component.user),
            guild_id: component.guild_id,
            channel_id: component.channel_id,
            member: component.member.as_ref().map(Member::from),
            options: CommandOptions::default(),
        }
    }
}

impl From<&serenity::all::User> for Actor {
    fn from(user: &serenity::all::User) -> Self {
        Self {
            id: user.id,
            username: user.name.clone(),
            tag: user.tag(),
        }
    }
}

// Interaction payloads include the member's computed permissions.  Elsewhere they are absent
// and come out empty.
impl From<&serenity::all::Member> for Member {
    fn from(member: &serenity::all::Member) -> Self {
        Member {
            user_id: member.user.id,
            username: member.user.name.clone(),
            tag: member.user.tag(),
            roles: member.roles.clone(),
            permissions: member.permissions.unwrap_or_else(Permissions::empty),
        }
    }
}

/// Low-level delivery of interaction responses
#[serenity::async_trait]
pub trait ReplySink: Send + Sync {
    async fn respond(&self, content: &str) -> Result<(), serenity::Error>;
    async fn defer(&self) -> Result<(), serenity::Error>;
    async fn edit(&self, content: &str) -> Result<(), serenity::Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyState {
    Pending,
    Deferred,
    Done,
}

/// Enforces one reply per interaction.  Every reply is visible to the actor only.
pub struct Responder {
    sink: Box<dyn ReplySink>,
    state: Mutex<ReplyState>,
}

impl Responder {
    pub fn new(sink: Box<dyn ReplySink>) -> Self {
        Self {
            sink,
            state: Mutex::new(ReplyState::Pending),
        }
    }

    #[cfg(test)]
    pub async fn state(&self) -> ReplyState {
        *self.state.lock().await
    }

    /// Acknowledge now, answer later with [`Responder::reply`].
    pub async fn defer(&self) -> Result<(), ReplyError> {
        let mut state = self.state.lock().await;
        match *state {
            ReplyState::Pending => {
                self.sink.defer().await?;
                *state = ReplyState::Deferred;
                Ok(())
            }
            ReplyState::Deferred | ReplyState::Done => Err(ReplyError::AlreadyReplied),
        }
    }

    /// Answer the interaction, editing the deferred response if there is one.
    pub async fn reply(&self, content: &str) -> Result<(), ReplyError> {
        let mut state = self.state.lock().await;
        match *state {
            ReplyState::Pending => self.sink.respond(content).await?,
            ReplyState::Deferred => self.sink.edit(content).await?,
            ReplyState::Done => return Err(ReplyError::AlreadyReplied),
        }
        *state = ReplyState::Done;
        Ok(())
    }
}

/// One interaction waiting for its answer
pub struct Interaction {
    pub request: InteractionRequest,
    pub responder: Responder,
}

impl Interaction {
    /// The guild the interaction came from.  Direct-message interactions are answered here and
    /// yield `None`.
    pub async fn require_guild(&self) -> Result<Option<GuildId>, ReplyError> {
        if let Some(guild_id) = self.request.guild_id {
            return Ok(Some(guild_id));
        }

        let refusal = match self.request.kind {
            InteractionKind::Command => "This command can only be used inside the server.",
            InteractionKind::Component => "Please use this button inside the server.",
        };
        self.responder.reply(refusal).await?;
        Ok(None)
    }
}

pub struct CommandSink {
    pub http: Arc<Http>,
    pub interaction: CommandInteraction,
}

pub struct ComponentSink {
    pub http: Arc<Http>,
    pub interaction: ComponentInteraction,
}

fn ephemeral_message(content: &str) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    )
}

fn ephemeral_defer() -> CreateInteractionResponse {
    CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new().ephemeral(true))
}

#[serenity::async_trait]
impl ReplySink for CommandSink {
    async fn respond(&self, content: &str) -> Result<(), serenity::Error> {
        self.interaction
            .create_response(&self.http, ephemeral_message(content))
            .await
    }

    async fn defer(&self) -> Result<(), serenity::Error> {
        self.interaction
            .create_response(&self.http, ephemeral_defer())
            .await
    }

    async fn edit(&self, content: &str) -> Result<(), serenity::Error> {
        self.interaction
            .edit_response(&self.http, EditInteractionResponse::new().content(content))
            .await
            .map(|_| ())
    }
}

#[serenity::async_trait]
impl ReplySink for ComponentSink {
    async fn respond(&self, content: &str) -> Result<(), serenity::Error> {
        self.interaction
            .create_response(&self.http, ephemeral_message(content))
            .await
    }

    async fn defer(&self) -> Result<(), serenity::Error> {
        self.interaction
            .create_response(&self.http, ephemeral_defer())
            .await
    }

    async fn edit(&self, content: &str) -> Result<(), serenity::Error> {
        self.interaction
            .edit_response(&self.http, EditInteractionResponse::new().content(content))
            .await
            .map(|_| ())
    }
}
