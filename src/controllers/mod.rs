pub mod bots;
pub mod chat;
pub mod clients;
pub mod health;
