pub mod auth;
pub mod subscriptions;
