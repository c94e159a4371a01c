pub mod agent;
pub mod auth;
pub mod envelope;
pub mod knowledge;
pub mod plugin;
