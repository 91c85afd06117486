pub mod auth;
pub mod mercadopago_webhook;
pub mod subscriptions;
pub mod users;
