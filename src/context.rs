use crate::{config::Config, directory::Directory, ticket::TicketLocks};
use serenity::all::UserId;

/// Collection of data that is shared across events
pub struct Context<'a> {
    // Vintra's own context types
    pub cfg: &'a Config,
    pub tickets: &'a TicketLocks,
    // Everything the bot reads from or changes in the guild goes through here
    pub directory: &'a dyn Directory,
    /// The bot's own user, used to recognize its earlier posts and its role position
    pub bot_id: UserId,
}
