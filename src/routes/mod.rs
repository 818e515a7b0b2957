pub mod chat;
pub mod health;
pub mod notifications;
pub mod preferences;
pub mod trends;
pub mod worker;
