//! Notification ingestion.
//!
//! `POST /v1/push` takes a newline-delimited stream of JSON notifications.
//! Each line is decoded and handed to its own dispatch task as soon as it is
//! read, so delivery starts before the upload finishes.

use axum::{Router, body::Body, extract::State, http::StatusCode, routing::post};
use futures::TryStreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

use crate::api::server::AppState;
use crate::relay::Notification;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/push", post(push))
}

/// Decode the body line by line and dispatch every notification.
///
/// Always answers `202 Accepted` once the body is consumed. Delivery results
/// are only visible in the logs.
async fn push(State(state): State<AppState>, body: Body) -> StatusCode {
    let stream = body.into_data_stream().map_err(std::io::Error::other);
    let reader = StreamReader::new(stream);

    let dispatcher = &state.dispatcher;
    match ingest(reader, |notification| {
        dispatcher.spawn(notification);
    })
    .await
    {
        Ok(stats) => debug!(
            accepted = stats.accepted,
            rejected = stats.rejected,
            "Ingested notification batch"
        ),
        Err(e) => warn!(
            error = %e,
            "Failed to read notification stream, ingestion stopped"
        ),
    }

    StatusCode::ACCEPTED
}

/// Line counts from one ingestion body.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: usize,
    pub rejected: usize,
}

/// Read newline-delimited notifications from `reader`, passing each decoded
/// one to `submit`.
///
/// Blank lines are skipped. Lines that fail to decode are logged and skipped
/// without affecting the lines after them. A read error stops ingestion; what
/// was already submitted stays submitted.
pub async fn ingest<R, F>(mut reader: R, mut submit: F) -> std::io::Result<IngestStats>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(Notification),
{
    let mut stats = IngestStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let line = trim_line(&buf);
        if line.is_empty() {
            continue;
        }

        match Notification::decode(line) {
            Ok(notification) => {
                stats.accepted += 1;
                submit(notification);
            }
            Err(e) => {
                stats.rejected += 1;
                warn!(
                    error = %e,
                    line = %String::from_utf8_lossy(line),
                    "Failed to decode notification"
                );
            }
        }
    }

    Ok(stats)
}

/// Strip the line terminator (`\n` or `\r\n`) and surrounding whitespace.
fn trim_line(line: &[u8]) -> &[u8] {
    line.trim_ascii()
}
