use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Directives used when `RUST_LOG` is not set.
pub const DEFAULT_DIRECTIVES: &str = "ollama_session=debug,tool=info";

/// Installs a global subscriber that prints spans and events to stderr.
///
/// `RUST_LOG` overrides [`DEFAULT_DIRECTIVES`]. Calling this twice, or after
/// another subscriber was installed, does nothing.
pub fn init_default_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter());

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_span_events(fmt::format::FmtSpan::CLOSE);

    let _ = Registry::default().with(filter).with(fmt_layer).try_init();
}

/// Same as [`init_default_tracing`] but emits one JSON object per line.
pub fn init_json_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter());

    let fmt_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_events(fmt::format::FmtSpan::CLOSE);

    let _ = Registry::default().with(filter).with(fmt_layer).try_init();
}

fn default_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .parse_lossy(DEFAULT_DIRECTIVES)
}
