//! The Serenity crate we're using for the Discord API is designed around callbacks to handle
//! events.  However, this does not mesh well with our plugin framework here.  To resolve this,
//! the handler translates the callbacks into a distinct Event enum.

use crate::{
    context::Context,
    directory::Member,
    interaction::{Interaction, InteractionKind},
};
use serenity::all::GuildId;

/// A Discord event
pub enum Event {
    /// Gateway session established
    Ready { bot_tag: String, guild_count: usize },
    /// Someone joined the configured guild
    MemberJoin { guild_id: GuildId, member: Member },
    /// Slash command or button press
    Interaction(Interaction),
}

impl Event {
    // When an event occurs, iterate over all the plugins to see if any can/should handle it.
    pub async fn handle(self, ctx: Context<'_>) {
        for plugin in crate::plugin::plugins() {
            match plugin.handle(&ctx, &self).await {
                Ok(EventHandled::Yes) => return,
                Ok(EventHandled::No) => continue,
                Err(err) => tracing::error!("Error in plugin {}: {}", plugin.name(), err),
            }
        }
    }

    /// The interaction, if this is the slash command `name`
    pub fn is_command(&self, name: &str) -> Option<&Interaction> {
        self.is_interaction(InteractionKind::Command, name)
    }

    /// The interaction, if this is a press of the button `custom_id`
    pub fn is_component(&self, custom_id: &str) -> Option<&Interaction> {
        self.is_interaction(InteractionKind::Component, custom_id)
    }

    fn is_interaction(&self, kind: InteractionKind, identifier: &str) -> Option<&Interaction> {
        match self {
            Event::Interaction(interaction)
                if interaction.request.kind == kind
                    && interaction.request.identifier == identifier =>
            {
                Some(interaction)
            }
            _ => None,
        }
    }
}

pub enum EventHandled {
    Yes,
    No,
}
