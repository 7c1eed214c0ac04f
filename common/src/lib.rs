use tracing_subscriber::EnvFilter;

pub mod server;

pub use server::{get_tcp_listener, run};

pub const BUFFER_SIZE: usize = 4096;
pub const DEFAULT_PORT: u16 = 8096;

/// Install a `fmt` subscriber. `RUST_LOG` wins over `default_level` when set.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
