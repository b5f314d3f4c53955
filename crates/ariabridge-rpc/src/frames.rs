//! Push frame decoding.
//!
//! The engine pushes notifications on the socket as JSON-RPC requests with
//! no id:
//!
//! ```json
//! {"jsonrpc":"2.0","method":"aria2.onDownloadStart","params":[{"gid":"2089b05ecca3d829"}]}
//! ```

use ariabridge_core::{ClientError, ClientResult, Gid, Notification, NotificationMethod};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

#[derive(Deserialize)]
struct PushFrame {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Vec<PushParam>,
}

#[derive(Deserialize)]
struct PushParam {
    gid: Gid,
}

/// What a text frame turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A download notification.
    Notification(Notification),
    /// A reply to a command sent over the socket; not ours to route.
    Response,
    /// A notification method this client does not know.
    UnknownMethod(String),
}

/// Decode one text frame.
pub fn decode_frame(text: &str) -> ClientResult<FrameOutcome> {
    let frame: PushFrame = serde_json::from_str(text)
        .map_err(|e| ClientError::invalid_response(format!("malformed push frame: {e}")))?;

    let Some(method) = frame.method else {
        return Ok(FrameOutcome::Response);
    };
    let Some(parsed) = NotificationMethod::parse(&method) else {
        return Ok(FrameOutcome::UnknownMethod(method));
    };
    let gid = frame
        .params
        .into_iter()
        .next()
        .map(|param| param.gid)
        .ok_or_else(|| ClientError::invalid_response(format!("{method} frame without a gid")))?;

    Ok(FrameOutcome::Notification(Notification::new(parsed, gid)))
}

/// Decode frames from `frames` and forward notifications to `sender`.
///
/// Malformed frames are logged and skipped. Returns the number of
/// notifications forwarded once the stream ends, the receiver is dropped, or
/// `cancel_token` fires.
pub async fn forward_frames<S>(
    frames: S,
    sender: &mpsc::Sender<Notification>,
    cancel_token: &CancellationToken,
) -> usize
where
    S: Stream<Item = String>,
{
    let mut frames = std::pin::pin!(frames);
    let mut forwarded = 0;

    loop {
        let text = tokio::select! {
            next = frames.next() => match next {
                Some(text) => text,
                None => {
                    debug!(target: "ariabridge.rpc", forwarded, "Push stream ended");
                    break;
                }
            },
            () = cancel_token.cancelled() => {
                debug!(target: "ariabridge.rpc", forwarded, "Push forwarding cancelled");
                break;
            }
        };

        match decode_frame(&text) {
            Ok(FrameOutcome::Notification(notification)) => {
                trace!(
                    target: "ariabridge.rpc",
                    method = %notification.method,
                    gid = %notification.gid,
                    "Push notification"
                );
                if sender.send(notification).await.is_err() {
                    debug!(target: "ariabridge.rpc", "Notification receiver dropped");
                    break;
                }
                forwarded += 1;
            }
            Ok(FrameOutcome::Response) => {}
            Ok(FrameOutcome::UnknownMethod(method)) => {
                debug!(target: "ariabridge.rpc", %method, "Ignoring unknown push method");
            }
            Err(e) => warn!(target: "ariabridge.rpc", error = %e, "Skipping push frame"),
        }
    }

    forwarded
}
