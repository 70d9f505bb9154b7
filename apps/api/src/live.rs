//! Server-sent status updates for the browser.
//!
//! Each connection holds its own bus subscription. When the client goes
//! away axum drops the stream, which drops the subscription with it.

use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{future, Stream, StreamExt};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::state::AppState;
use crate::status_bus::StatusEvent;

const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Logs when the owning stream is dropped.
struct Connection {
    user_id: Uuid,
}

impl Drop for Connection {
    fn drop(&mut self) {
        info!(user_id = %self.user_id, "Status stream closed");
    }
}

/// Only the events that belong to `user_id`.
fn events_for_user<S>(events: S, user_id: Uuid) -> impl Stream<Item = StatusEvent>
where
    S: Stream<Item = StatusEvent>,
{
    events.filter(move |event| future::ready(event.user_id() == user_id))
}

/// GET /api/resume/status-updates
pub async fn handle_status_updates(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let events = state.bus.subscribe().await?;
    let connection = Connection {
        user_id: auth.user_id,
    };
    info!(user_id = %auth.user_id, "Status stream opened");

    let stream = events_for_user(events, auth.user_id).map(move |event| {
        let _ = &connection;
        Event::default().json_data(&event)
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE)))
}
