use std::path::PathBuf;

use understanding_common::LogConfig;

pub const SERVICE_NAME: &str = "understanding-service";
pub const LISTEN_PORT: u16 = 8088;
pub const DATABASE_PATH: &str = "./understanding.db";
pub const LOG_DIR: &str = "./logs";

/// Compiled-in settings; the collector takes no flags or environment overrides.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub listen_port: u16,
    pub database_path: PathBuf,
    pub log: LogConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_port: LISTEN_PORT,
            database_path: PathBuf::from(DATABASE_PATH),
            log: LogConfig::new(SERVICE_NAME, LOG_DIR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment() {
        let config = ServiceConfig::default();
        assert_eq!(config.listen_port, 8088);
        assert_eq!(config.database_path, PathBuf::from("./understanding.db"));
        assert_eq!(config.log.service_name, "understanding-service");
    }
}
