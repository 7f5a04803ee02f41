/// Initializes structured logging for hosts and demos.
///
/// Filtering comes from the `RUST_LOG` environment variable:
/// - `RUST_LOG=info` shows saves, deletes and reloads
/// - `RUST_LOG=debug` adds every transport call and relationship decision
/// - `RUST_LOG=resource_mapper=debug` limits debug output to this crate
///
/// Calling it again after a subscriber is installed is a no-op, so tests can
/// call it freely.
///
/// # Example
///
/// ```ignore
/// setup_tracing();
/// tracing::info!("Mapper ready");
/// ```
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
