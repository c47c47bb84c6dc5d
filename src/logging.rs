use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins when set; otherwise `info`, or
/// `debug` for this crate when `verbose` is on.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info,inpband=debug")
        } else {
            EnvFilter::new("info")
        }
    });

    // try_init so tests or embedding programs that already installed one keep theirs
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
