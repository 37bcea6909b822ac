use std::env;
use std::time::Duration;

use clap::Parser;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "lan_presence_tracker", about = "Tracks which named people are present on the LAN via DHCP leases")]
pub struct Args {
    /// Address to bind the web server to
    #[arg(long, default_value = "0.0.0.0")]
    pub bind_addr: String,

    /// Port for the web server
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// SQLite database file
    #[arg(long, default_value = "presence.db")]
    pub database: String,

    /// Endpoint serving the DHCP lease listing
    #[arg(long, default_value = "http://192.168.1.1/leases")]
    pub lease_endpoint: String,

    /// Seconds between lease polls
    #[arg(long, default_value_t = 15)]
    pub poll_interval: u64,

    /// Total budget for one lease fetch, in seconds
    #[arg(long, default_value_t = 10)]
    pub fetch_timeout: u64,

    /// Budget for establishing the lease fetch connection, in seconds
    #[arg(long, default_value_t = 5)]
    pub connect_timeout: u64,

    /// Run without the background lease poller
    #[arg(long)]
    pub no_poller: bool,

    /// Endpoint to push the present-names list to (disabled when unset)
    #[arg(long)]
    pub notify_url: Option<String>,
}

/// Validated runtime configuration. Behavior toggles are named, typed fields
/// checked once at construction, never patched at runtime.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub database_path: String,
    pub lease_endpoint: String,
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    pub connect_timeout: Duration,
    pub enable_poller: bool,
    pub notify_url: Option<String>,
    pub notify_api_key: Option<String>,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Config, String> {
        let config = Config {
            bind_addr: args.bind_addr,
            port: args.port,
            database_path: args.database,
            lease_endpoint: args.lease_endpoint,
            poll_interval: Duration::from_secs(args.poll_interval),
            fetch_timeout: Duration::from_secs(args.fetch_timeout),
            connect_timeout: Duration::from_secs(args.connect_timeout),
            enable_poller: !args.no_poller,
            notify_url: args.notify_url,
            notify_api_key: env::var("NOTIFY_API_KEY").ok(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.bind_addr.is_empty() {
            return Err("bind address must not be empty".to_string());
        }
        if self.database_path.is_empty() {
            return Err("database path must not be empty".to_string());
        }
        if self.lease_endpoint.is_empty() {
            return Err("lease endpoint must not be empty".to_string());
        }
        if self.poll_interval.is_zero() {
            return Err("poll interval must be positive".to_string());
        }
        if self.fetch_timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err("fetch budgets must be positive".to_string());
        }
        if self.connect_timeout > self.fetch_timeout {
            return Err("connect budget cannot exceed the total fetch budget".to_string());
        }
        Ok(())
    }
}
