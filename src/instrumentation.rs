use std::{io::IsTerminal, time::Duration};

use axum::{
    http::{Request, Response},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::Span;
use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::utilities::friendly_id;

pub fn setup(directives: &[String]) -> anyhow::Result<()> {
    let mut filter = EnvFilter::default();
    for directive in directives {
        filter = filter.add_directive(directive.parse()?);
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default())
        .with(
            fmt::Layer::new()
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr)
                .compact()
                .with_target(false),
        )
        .init();

    Ok(())
}

/// Per-request span: a short request id, the client (as reported by the
/// reverse proxy, or whoever dialed us directly), and the method/path of
/// the fetched or uploaded file. Status and latency fill in on response.
pub fn add_layer(router: Router) -> Router {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request<_>| {
                let client = req
                    .headers()
                    .get("x-forwarded-for")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-")
                    .to_string();
                tracing::span!(
                    tracing::Level::INFO,
                    "request",
                    id = %friendly_id(8),
                    client = %client,
                    method = %req.method(),
                    path = %req.uri().path(),
                    status = tracing::field::Empty,
                    latency = tracing::field::Empty,
                )
            })
            .on_response(|res: &Response<_>, latency: Duration, span: &Span| {
                span.record(
                    "latency",
                    tracing::field::display(format!("{}ms", latency.as_millis())),
                );
                span.record("status", tracing::field::display(res.status()));
                tracing::debug!("request finished");
            }),
    )
}
