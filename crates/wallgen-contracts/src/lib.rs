pub mod chat;
pub mod data_url;
pub mod events;
pub mod messages;
pub mod models;
pub mod prompt;
