use std::str::FromStr;

use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    Layer, filter::FilterFn, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

#[macro_export]
macro_rules! log {
    ($level:expr, $span:expr, $($msg:expr),*) => {{
        let span = $crate::tracing::span!($level, $span);
        let _enter = span.enter();

        $crate::tracing::event!($level, $($msg),*)
    }};
}

/// Lifecycle messages about the dispatcher itself (start-up, shutdown, resets)
#[macro_export]
macro_rules! internal {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "internal", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::internal!(level = TRACE, $($msg),*)
    };
}

/// Messages about campaign processing
#[macro_export]
macro_rules! campaign {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "campaign", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::campaign!(level = DEBUG, $($msg),*)
    };
}

/// Parse `name` as a level filter, warning on stderr when it is not one
fn parse_level(source: &str, name: &str) -> Option<LevelFilter> {
    LevelFilter::from_str(name)
        .inspect_err(|_| eprintln!("Invalid log level {name:?} from {source}, ignoring it"))
        .ok()
}

/// `LOG_LEVEL` overrides the configured level; both fall back to `default`
fn resolve_level(env: Option<&str>, configured: Option<&str>, default: LevelFilter) -> LevelFilter {
    env.and_then(|name| parse_level("LOG_LEVEL", name))
        .or_else(|| configured.and_then(|name| parse_level("configuration", name)))
        .unwrap_or(default)
}

/// Install the global subscriber for `herald*` targets
///
/// `configured` is the host configuration's `log_level`, if any.
pub fn init(configured: Option<&str>) {
    let default = if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    let env = std::env::var("LOG_LEVEL").ok();
    let level = resolve_level(env.as_deref(), configured, default);

    tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_ansi(true)
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_filter(level)
                .with_filter(FilterFn::new(|metadata| {
                    metadata.target().starts_with("herald")
                })),
        )
        .init();
}
