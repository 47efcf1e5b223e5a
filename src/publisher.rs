//! Publishes order events to NATS. Publishing is best effort: a missing or
//! failing broker never fails the request that produced the event.

use tracing::{debug, warn};

use crate::domain::events::OrderEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    /// Events are only logged.
    pub fn disabled() -> Self { Self::default() }

    pub async fn publish(&self, event: &OrderEvent) {
        let subject = event.subject();
        let Some(client) = &self.nats else {
            debug!(subject, order_id = %event.order_id(), "no broker configured, event not published");
            return;
        };
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(subject, error = %e, "failed to encode event");
                return;
            }
        };
        if let Err(e) = client.publish(subject.to_string(), payload.into()).await {
            warn!(subject, order_id = %event.order_id(), error = %e, "failed to publish event");
        }
    }
}
