use tracing_subscriber::EnvFilter;

/// Log to stderr so stdout stays free for the exported table.
pub fn init_tracing() {
    // RUST_LOG wins; otherwise the crate logs at info.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("target_operasi=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
