use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, from flags with environment overrides.
///
/// Built once in `main` and passed explicitly to the components that
/// need it; there is no global configuration state.
#[derive(Debug, Clone, Parser)]
#[command(name = "snip", about = "URL shortening service", version)]
pub struct Config {
    /// Address to listen on.
    #[arg(short = 'a', long, env = "SERVER_ADDRESS", default_value = "127.0.0.1:8080")]
    pub listen_addr: String,

    /// Base URL used to render short links.
    #[arg(short = 'b', long, env = "BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Flat file used when no database is configured or reachable, and
    /// as the snapshot sink next to a database-backed store.
    #[arg(short = 'f', long, env = "FILE_STORAGE_PATH", default_value = "data.json")]
    pub file_storage_path: PathBuf,

    /// Postgres DSN. Unset means file storage.
    #[arg(short = 'd', long, env = "DATABASE_DSN")]
    pub database_dsn: Option<String>,

    /// Number of delete pipeline input channels.
    #[arg(short = 'w', long, env = "DELETE_WORKER_COUNT", default_value_t = 2)]
    pub delete_channels: usize,

    /// Capacity of each delete channel buffer.
    #[arg(short = 'c', long, env = "DELETE_CHANNEL_SIZE", default_value_t = 1000)]
    pub delete_channel_capacity: usize,

    /// Flush the delete buffer as soon as it holds this many intents.
    #[arg(long, env = "DELETE_FLUSH_SIZE", default_value_t = 100)]
    pub delete_flush_size: usize,

    /// Flush any buffered delete intents at least this often, in seconds.
    #[arg(long, env = "DELETE_FLUSH_INTERVAL_SECS", default_value_t = 10)]
    pub delete_flush_interval_secs: u64,

    /// Database connection attempt budget at boot, in seconds.
    #[arg(long, env = "STORE_CONNECT_TIMEOUT_SECS", default_value_t = 5)]
    pub store_connect_timeout_secs: u64,
}

impl Config {
    pub fn delete_flush_interval(&self) -> Duration {
        Duration::from_secs(self.delete_flush_interval_secs)
    }

    pub fn store_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.store_connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["snip"]).unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.file_storage_path, PathBuf::from("data.json"));
        assert_eq!(config.delete_channels, 2);
        assert_eq!(config.delete_channel_capacity, 1000);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "snip", "-a", "0.0.0.0:9090", "-w", "4", "-f", "/tmp/links.json",
        ])
        .unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:9090");
        assert_eq!(config.delete_channels, 4);
        assert_eq!(config.file_storage_path, PathBuf::from("/tmp/links.json"));
    }
}
