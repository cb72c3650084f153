use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_path: String,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    pub password_pepper: String,
    pub admin_secret_key: Option<String>,
    pub public_base_url: String,
    pub session_idle_timeout_secs: u64,
    pub max_sessions: usize,
    pub password_hash_rounds: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/slaypoints.db".to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let password_pepper = env::var("PASSWORD_PEPPER")
            .map_err(|_| "PASSWORD_PEPPER must be set for password hashing")?;

        let admin_secret_key = env::var("ADMIN_SECRET_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", server_port))
            .trim_end_matches('/')
            .to_string();

        let session_idle_timeout_secs = env::var("SESSION_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "1800".to_string())
            .parse()
            .map_err(|_| "Invalid SESSION_IDLE_TIMEOUT_SECS")?;

        let max_sessions = env::var("MAX_SESSIONS")
            .unwrap_or_else(|_| "10000".to_string())
            .parse()
            .map_err(|_| "Invalid MAX_SESSIONS")?;

        let password_hash_rounds = env::var("PASSWORD_HASH_ROUNDS")
            .unwrap_or_else(|_| "600000".to_string())
            .parse::<u32>()
            .ok()
            .filter(|rounds| *rounds > 0)
            .ok_or("Invalid PASSWORD_HASH_ROUNDS")?;

        Ok(Config {
            server_host,
            server_port,
            database_path,
            allowed_origins,
            environment,
            password_pepper,
            admin_secret_key,
            public_base_url,
            session_idle_timeout_secs,
            max_sessions,
            password_hash_rounds,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Whether cookies should carry the `Secure` attribute
    pub fn secure_cookies(&self) -> bool {
        self.is_production()
    }
}

/// Configuration for unit tests
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        database_path: "".to_string(),
        allowed_origins: vec![],
        environment: "test".to_string(),
        password_pepper: "test-pepper".to_string(),
        admin_secret_key: None,
        public_base_url: "http://points.test".to_string(),
        session_idle_timeout_secs: 60,
        max_sessions: 100,
        password_hash_rounds: 1_000,
    }
}
