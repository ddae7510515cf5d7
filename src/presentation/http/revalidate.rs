use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use futures_util::stream::{self, Stream, StreamExt};
use serde_json::json;

use crate::bootstrap::app_context::AppContext;
use crate::presentation::http::auth::{Bearer, session_from_bearer};

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/revalidate/stream", get(revalidation_stream))
        .with_state(ctx)
}

/// Server-sent `revalidate` events carrying the path whose data changed.
#[utoipa::path(
    get,
    path = "/api/revalidate/stream",
    tag = "Files",
    responses(
        (status = 200, description = "text/event-stream of revalidation signals"),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn revalidation_stream(
    State(ctx): State<AppContext>,
    bearer: Bearer,
) -> Result<Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>>, StatusCode> {
    let session = session_from_bearer(&ctx.cfg, bearer)?;
    tracing::debug!(account_id = %session.account_id, "revalidation_stream_opened");

    let initial = stream::iter(vec![Ok(Event::default().event("ready").data("{}"))]);
    let updates = ctx.subscribe_revalidation().map(|signal| {
        let payload = json!({ "path": signal.path, "at": signal.at });
        Ok(Event::default()
            .event("revalidate")
            .data(payload.to_string()))
    });
    let keepalive = KeepAlive::new()
        .interval(Duration::from_secs(25))
        .text(":\n");
    Ok(Sse::new(initial.chain(updates)).keep_alive(keepalive))
}
