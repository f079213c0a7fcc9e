//! Typed request/response channel between the page and background contexts.
//!
//! Each request travels in an [`Envelope`] carrying its own `oneshot` reply
//! sender, so the requester's future stays pending until exactly that
//! request has been answered.

use std::fmt;

use tokio::sync::{mpsc, oneshot};
use tracing::trace;
use uuid::Uuid;

use fieldfill_shared::{FieldFillError, Result};

/// Correlation id attached to every request on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One outstanding request and the means to answer it.
pub struct Envelope<Req, Resp> {
    pub id: RequestId,
    pub request: Req,
    reply: oneshot::Sender<Resp>,
}

impl<Req, Resp> Envelope<Req, Resp> {
    /// Split into the request payload and a detached [`Responder`].
    pub fn into_parts(self) -> (RequestId, Req, Responder<Resp>) {
        let responder = Responder {
            id: self.id,
            reply: self.reply,
        };
        (self.id, self.request, responder)
    }
}

/// Completion signal for a single request.
pub struct Responder<Resp> {
    id: RequestId,
    reply: oneshot::Sender<Resp>,
}

impl<Resp> Responder<Resp> {
    /// True once the requester has stopped waiting.
    pub fn is_closed(&self) -> bool {
        self.reply.is_closed()
    }

    /// Deliver the response. Fails with [`FieldFillError::Bus`] when the
    /// requester is gone.
    pub fn respond(self, response: Resp) -> Result<()> {
        self.reply
            .send(response)
            .map_err(|_| FieldFillError::Bus(format!("requester for {} has gone away", self.id)))
    }
}

/// Sending half of the bus, cheap to clone.
pub struct BusClient<Req, Resp> {
    tx: mpsc::Sender<Envelope<Req, Resp>>,
}

impl<Req, Resp> Clone for BusClient<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<Req, Resp> BusClient<Req, Resp> {
    /// Send `request` and wait for its response.
    pub async fn request(&self, request: Req) -> Result<Resp> {
        let id = RequestId::new();
        let (reply, rx) = oneshot::channel();
        trace!(%id, "sending bus request");

        self.tx
            .send(Envelope { id, request, reply })
            .await
            .map_err(|_| FieldFillError::Bus("message bus is closed".into()))?;

        rx.await
            .map_err(|_| FieldFillError::Bus(format!("request {id} was dropped without a response")))
    }
}

/// Receiving half of the bus.
pub type BusReceiver<Req, Resp> = mpsc::Receiver<Envelope<Req, Resp>>;

/// Create a bus with room for `capacity` queued requests.
pub fn channel<Req, Resp>(capacity: usize) -> (BusClient<Req, Resp>, BusReceiver<Req, Resp>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (BusClient { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_waits_for_its_reply() {
        let (client, mut rx) = channel::<u32, String>(4);

        let server = tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let (_, n, responder) = envelope.into_parts();
                responder.respond(format!("got {n}")).unwrap();
            }
        });

        assert_eq!(client.request(7).await.unwrap(), "got 7");
        assert_eq!(client.request(8).await.unwrap(), "got 8");
        drop(client);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn dropped_envelope_is_bus_error() {
        let (client, mut rx) = channel::<(), ()>(1);
        tokio::spawn(async move {
            let envelope = rx.recv().await.unwrap();
            drop(envelope);
        });

        let err = client.request(()).await.unwrap_err();
        assert!(matches!(err, FieldFillError::Bus(_)));
    }

    #[tokio::test]
    async fn closed_bus_is_bus_error() {
        let (client, rx) = channel::<(), ()>(1);
        drop(rx);
        let err = client.request(()).await.unwrap_err();
        assert_eq!(err.to_string(), "message bus error: message bus is closed");
    }

    #[tokio::test]
    async fn respond_after_requester_left() {
        let (client, mut rx) = channel::<(), ()>(1);
        let pending = tokio::spawn(async move { client.request(()).await });
        let envelope = rx.recv().await.unwrap();
        pending.abort();
        let _ = pending.await;

        let (_, _, responder) = envelope.into_parts();
        assert!(responder.is_closed());
        assert!(responder.respond(()).is_err());
    }

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }
}
