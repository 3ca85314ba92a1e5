pub mod bot_events;
pub mod bots;
pub mod clients;
pub mod messages;
