use clap::Parser;
use database::Database;

pub mod auth;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:money_tracker.db")]
    pub database_url: String,

    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Only send the session cookie over HTTPS.
    #[arg(long, env = "SECURE_COOKIES", default_value_t = false)]
    pub secure_cookies: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::try_parse_from(["money-tracker"]).unwrap();
        assert_eq!(config.port, 3000);
        assert!(!config.secure_cookies);
    }

    #[test]
    fn test_config_flags() {
        let config = Config::try_parse_from([
            "money-tracker",
            "--database-url",
            "sqlite::memory:",
            "--port",
            "8080",
            "--secure-cookies",
        ])
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.port, 8080);
        assert!(config.secure_cookies);
    }
}
