use crate::{
    config::Config,
    context::Context,
    directory::{Member, SerenityDirectory},
    event::Event,
    interaction::{CommandSink, ComponentSink, Interaction, InteractionRequest, Responder},
    ticket::TicketLocks,
};
use serenity::all::Ready;

/// Discord event handler
pub struct Handler {
    cfg: Config,
    tickets: TicketLocks,
}

impl<'a> Handler {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            tickets: TicketLocks::default(),
        }
    }

    fn ctx(
        &'a self,
        discord_ctx: &serenity::all::Context,
        directory: &'a SerenityDirectory,
    ) -> Context<'a> {
        Context {
            cfg: &self.cfg,
            tickets: &self.tickets,
            directory,
            bot_id: discord_ctx.cache.current_user().id,
        }
    }
}

#[serenity::async_trait]
impl serenity::all::EventHandler for Handler {
    async fn ready(&self, discord_ctx: serenity::all::Context, ready: Ready) {
        let directory = SerenityDirectory::new(&discord_ctx);
        Event::Ready {
            bot_tag: ready.user.tag(),
            guild_count: ready.guilds.len(),
        }
        .handle(self.ctx(&discord_ctx, &directory))
        .await;
    }

    async fn guild_member_addition(
        &self,
        discord_ctx: serenity::all::Context,
        new_member: serenity::all::Member,
    ) {
        if new_member.guild_id != self.cfg.guild_id {
            return;
        }

        let directory = SerenityDirectory::new(&discord_ctx);
        Event::MemberJoin {
            guild_id: new_member.guild_id,
            member: Member::from(&new_member),
        }
        .handle(self.ctx(&discord_ctx, &directory))
        .await;
    }

    async fn interaction_create(
        &self,
        discord_ctx: serenity::all::Context,
        interaction: serenity::all::Interaction,
    ) {
        let http = discord_ctx.http.clone();
        let interaction = match interaction {
            serenity::all::Interaction::Command(command) => Interaction {
                request: InteractionRequest::from_command(&command),
                responder: Responder::new(Box::new(CommandSink {
                    http,
                    interaction: command,
                })),
            },
            serenity::all::Interaction::Component(component) => Interaction {
                request: InteractionRequest::from_component(&component),
                responder: Responder::new(Box::new(ComponentSink {
                    http,
                    interaction: component,
                })),
            },
            // Autocomplete, modals and pings are never requested
            _ => return,
        };

        let directory = SerenityDirectory::new(&discord_ctx);
        Event::Interaction(interaction)
            .handle(self.ctx(&discord_ctx, &directory))
            .await;
    }
}
