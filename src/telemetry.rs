use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,sqlx=warn";

fn subscriber() -> impl SubscriberInitExt {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().json())
}

/// Install a JSON formatter filtered by `RUST_LOG`, falling back to
/// `info,sqlx=warn`. Panics if a global subscriber is already set.
pub fn init_tracing() {
    subscriber().init();
}

/// Like [`init_tracing`], but returns `false` instead of panicking when a
/// subscriber is already installed.
pub fn try_init_tracing() -> bool {
    subscriber().try_init().is_ok()
}
