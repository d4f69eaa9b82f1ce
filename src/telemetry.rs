//! Tracing setup.
//!
//! LOG_LEVEL takes EnvFilter directives, e.g.
//! "info,session=debug,generation=debug,tower_http=info".
//! LOG_FORMAT=json switches to one JSON object per line.
//! LOG_SPAN_TIMING=1 emits a close event per span, which carries `time.busy`
//! for every instrumented generation call and session action.
//!
//! Targets in use: `careersim_backend` (process/transport), `session`
//! (controller transitions), `generation` (model calls).

use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

const DEFAULT_FILTER: &str = "info,session=debug,generation=info,careersim_backend=debug,tower_http=info,axum=info";

fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

fn flag(name: &str) -> bool {
    matches!(std::env::var(name).as_deref(), Ok("1") | Ok("true"))
}

pub fn init_tracing() {
    let directives = std::env::var("LOG_LEVEL").ok();
    let spans = if flag("LOG_SPAN_TIMING") { FmtSpan::CLOSE } else { FmtSpan::NONE };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter_from(directives.as_deref()))
        .with_span_events(spans)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // The two formats are different subscriber types.
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_directives_fall_back_to_default() {
        assert!(filter_from(Some("session=notalevel")).to_string().contains("session=debug"));
        assert!(filter_from(None).to_string().contains("generation=info"));
        assert!(filter_from(Some("generation=trace")).to_string().contains("generation=trace"));
    }
}
