use std::env;

/// Runtime configuration, loaded once at startup and injected into the app
/// via `web::Data`.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    /// When enabled, a registration request may claim the admin role.
    /// Disabled by default; promotion then happens through the admin-only
    /// user update endpoint.
    pub open_admin_signup: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            open_admin_signup: env::var("OPEN_ADMIN_SIGNUP")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required environment variables
        env::set_var("DATABASE_URL", "postgres://test");

        let config = Config::from_env();

        assert_eq!(config.database_url, "postgres://test");
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.server_host, "127.0.0.1");
        assert!(!config.open_admin_signup);

        // Test custom values
        env::set_var("SERVER_PORT", "3000");
        env::set_var("SERVER_HOST", "0.0.0.0");
        env::set_var("OPEN_ADMIN_SIGNUP", "true");

        let config = Config::from_env();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.server_host, "0.0.0.0");
        assert!(config.open_admin_signup);

        env::remove_var("SERVER_PORT");
        env::remove_var("SERVER_HOST");
        env::remove_var("OPEN_ADMIN_SIGNUP");
    }
}
