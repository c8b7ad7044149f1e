use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::feed::FeedItem;
use crate::state::{AppState, ConnectionGuard};

/// GET /api/v1/feed/stream — SSE endpoint for the live game feed.
pub async fn feed_stream(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, StatusCode> {
    let max_sse = state.config.limits.max_sse_subscribers;
    let current = state.sse_subscriber_count.load(Ordering::Relaxed);
    if current >= max_sse {
        tracing::warn!(current, max = max_sse, "SSE subscriber limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let guard = ConnectionGuard::new(Arc::clone(&state.sse_subscriber_count));

    let feed = state.feed.read().await;
    let rx = feed.subscribe();
    drop(feed);

    let stream = BroadcastStream::new(rx).filter_map(move |result: Result<FeedItem, _>| {
        let _guard = &guard;
        match result {
            Ok(item) => {
                let json = serde_json::to_string(&item).unwrap_or_default();
                Some(Ok(SseEvent::default()
                    .event("game")
                    .data(json)
                    .id(item.seq.to_string())))
            },
            Err(e) => {
                tracing::warn!("SSE broadcast receive error: {e}");
                None
            },
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
