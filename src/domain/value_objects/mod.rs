pub mod enums;
pub mod mercadopago_webhook;
pub mod subscriptions;
pub mod users;
