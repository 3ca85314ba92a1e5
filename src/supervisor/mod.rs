pub mod bot_types;
pub mod error;
pub mod events;
pub mod registry;
pub mod runner;

pub use error::SupervisorError;
pub use events::BotEventWriter;
pub use registry::BotRegistry;
pub use runner::BotRunner;
