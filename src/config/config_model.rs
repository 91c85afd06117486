#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub auth: Auth,
    pub mercado_pago: MercadoPago,
    pub frontend: Frontend,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Auth {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct MercadoPago {
    pub access_token: String,
    pub base_url: String,
    pub reason: String,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct Frontend {
    pub url: String,
    pub allowed_origins: Vec<String>,
}
