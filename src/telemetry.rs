use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "storefront=info,tower_http=info";

/// `RUST_LOG` wins; otherwise `DEFAULT_FILTER`. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
