use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Environment variable holding the log filter, e.g. `SIDEDIFF_LOG=sidediff=debug`.
pub const LOG_ENV: &str = "SIDEDIFF_LOG";

/// Install the stderr subscriber. Stdout stays free for rendered output.
pub fn init() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}
