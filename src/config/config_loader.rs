use anyhow::{Ok, Result};

use super::config_model::{Auth, Database, DotEnvyConfig, Frontend, MercadoPago, Server};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let auth = Auth {
        jwt_secret: std::env::var("JWT_SECRET").expect("JWT_SECRET is invalid"),
    };

    let mercado_pago = MercadoPago {
        access_token: std::env::var("MERCADOPAGO_ACCESS_TOKEN")
            .expect("MERCADOPAGO_ACCESS_TOKEN is invalid"),
        base_url: std::env::var("MERCADOPAGO_BASE_URL")
            .unwrap_or_else(|_| "https://api.mercadopago.com".to_string()),
        reason: std::env::var("SUBSCRIPTION_REASON")
            .unwrap_or_else(|_| "Assinatura Mensal - Plataforma QuimITA".to_string()),
        amount: std::env::var("SUBSCRIPTION_AMOUNT")
            .unwrap_or_else(|_| "39.90".to_string())
            .parse()?,
        currency: std::env::var("SUBSCRIPTION_CURRENCY").unwrap_or_else(|_| "BRL".to_string()),
    };

    let frontend_url = std::env::var("FRONTEND_URL").expect("FRONTEND_URL is invalid");
    let allowed_origins = std::env::var("FRONTEND_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| frontend_url.clone())
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect();

    let frontend = Frontend {
        url: frontend_url,
        allowed_origins,
    };

    Ok(DotEnvyConfig {
        server,
        database,
        auth,
        mercado_pago,
        frontend,
    })
}
