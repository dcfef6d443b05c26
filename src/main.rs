mod commands;
mod config;
mod context;
mod directory;
mod event;
mod handler;
mod interaction;
mod logging;
mod moderation;
mod notice;
mod plugin;
mod ticket;
mod verification;

use serenity::{all::GatewayIntents, Client};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cfg = crate::config::Config::from_env()?;
    let token = cfg.discord_token.clone();
    let application_id = cfg.application_id;
    let handler = handler::Handler::new(cfg);

    // Things we want discord to tell us about.  Member joins need the privileged
    // GUILD_MEMBERS intent enabled in the developer portal.
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS;

    Client::builder(&token, intents)
        .application_id(application_id)
        .event_handler(handler)
        .await?
        .start()
        .await
        .map_err(Into::into)
}
