use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use serde::Deserialize;
use std::{convert::Infallible, time::Duration};
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tracing::{debug, warn};

use marquee_core::{
    pipeline::EventEmitter,
    types::{ListReference, PipelineEvent},
};

use crate::infra::{app_state::AppState, errors::AppResult};

/// Events buffered between the run and a slow client.
const EVENT_BUFFER: usize = 64;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamListRequest {
    #[serde(default)]
    pub list_url: String,
}

pub(crate) fn default_keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(15))
        .text("keep-alive")
}

/// Starts a list run and streams its events. The run lives in its own task
/// and stops at its next emit once the client goes away.
pub async fn stream_list_handler(
    State(state): State<AppState>,
    Json(request): Json<StreamListRequest>,
) -> AppResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    let list = ListReference::parse(&request.list_url, state.list_host())?;
    let pipeline = state.enrichment()?.pipeline.clone();

    let (emitter, receiver) = EventEmitter::channel(EVENT_BUFFER);
    tokio::spawn(async move {
        let outcome = pipeline.run(list, emitter).await;
        debug!(?outcome, "list run finished");
    });

    let stream = ReceiverStream::new(receiver)
        .filter_map(|event| to_sse_event(&event).map(Ok::<_, Infallible>));
    Ok(Sse::new(stream).keep_alive(default_keep_alive()))
}

fn to_sse_event(event: &PipelineEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().data(json)),
        Err(err) => {
            warn!(event = event.event_name(), error = %err, "dropping unserializable event");
            None
        }
    }
}
