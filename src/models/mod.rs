pub mod bot;
pub mod bot_event;
pub mod chat;
pub mod client;

pub use bot::{Bot, BotCreateRequest, BotStatus, BotType};
pub use bot_event::BotEvent;
pub use chat::{ChatRequest, ChatResponse, ConversationMessage};
pub use client::{Client, ClientCreateRequest, CreatedClient};
