//! Logger setup for hosts that don't install their own

/// Install `env_logger`, filtered by `RUST_LOG` or else `default_level`.
///
/// Uses `try_init`: when the host process (or a test) already installed a
/// `log` backend, that one keeps receiving the bridge's diagnostics.
pub fn init(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already installed, leaving it in place");
    }
}
