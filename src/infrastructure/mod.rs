pub mod axum_http;
pub mod email;
pub mod payments;
pub mod postgres;
