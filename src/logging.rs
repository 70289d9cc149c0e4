use tracing::Level;

/// Sends diagnostics to stderr: warnings and errors always, every git
/// invocation as well with `--debug`.
pub fn init(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::WARN };
    // a second call (tests) leaves the first subscriber in place
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_ansi(false)
        .try_init();
}
