use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    /// Additional CORS origins (e.g. LAN access from another device).
    pub cors_extra_origins: Vec<String>,

    pub jwt_secret: String,

    /// Months a carry-forward lookup may reach back before the seed is
    /// treated as unknown.
    pub trend_max_lookback_months: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            cors_extra_origins: env::var("CORS_EXTRA_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or_default(),

            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),

            trend_max_lookback_months: env::var("TREND_MAX_LOOKBACK_MONTHS")
                .unwrap_or_else(|_| "24".into())
                .parse()
                .unwrap_or(24),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}
