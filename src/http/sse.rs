use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::{
    article::BufferStatus,
    http::AppState,
    hub::{ClientHub, HubMessage},
    poller::FeedPoller,
};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = client_stream(state.poller, state.hub)
        .map(|payload| Ok(Event::default().data(payload.to_string())));

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

/// Unregisters the client when its stream is dropped.
struct ClientGuard {
    id: String,
    hub: Arc<ClientHub>,
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.hub.unregister(&self.id);
    }
}

/// Payloads for one connected client: the initial articles first, then
/// every hub message, each tagged with the buffer status at send time.
pub fn client_stream(
    poller: Arc<FeedPoller>,
    hub: Arc<ClientHub>,
) -> impl Stream<Item = Value> + Send + 'static {
    let (id, rx) = hub.register();
    info!(
        "Client {} initialized - Buffer has {}/{} articles",
        id,
        poller.buffer_len(),
        poller.capacity()
    );

    let initial = poller.initial_articles();
    let status = BufferStatus::new(poller.capacity(), initial.articles.len());
    let first = with_buffer_status(&initial, status);

    let guard = ClientGuard { id, hub };
    let updates = stream::unfold(
        (rx, guard, poller),
        |(mut rx, guard, poller): (UnboundedReceiver<HubMessage>, ClientGuard, Arc<FeedPoller>)| async move {
            let message = rx.recv().await?;
            let payload = with_buffer_status(&message, poller.buffer_status());
            Some((payload, (rx, guard, poller)))
        },
    );

    stream::once(async move { first }).chain(updates)
}

fn with_buffer_status<T: Serialize>(payload: &T, status: BufferStatus) -> Value {
    let mut value = serde_json::to_value(payload).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut value {
        map.insert("buffer_status".to_string(), json!(status));
    }
    value
}
