//! Facts published back to the host event layer.
use std::collections::HashMap;

use derive_more::From;
use serde::Serialize;

use crate::{cache::MboxJson, Result};

/// Identity facts shared with the host after every reconciled round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityState {
    /// Server-assigned visitor id.
    #[serde(rename = "tntid", skip_serializing_if = "Option::is_none")]
    pub tnt_id: Option<String>,
    /// Host-assigned custom visitor id.
    #[serde(rename = "thirdpartyid", skip_serializing_if = "Option::is_none")]
    pub third_party_id: Option<String>,
}

/// Mboxes returned by a prefetch or execute call, keyed by mbox name.
#[derive(Debug, Clone, Default, PartialEq, From, Serialize)]
#[serde(transparent)]
pub struct ContentDelta(pub HashMap<String, MboxJson>);

impl ContentDelta {
    /// Return `true` if the response carried no mboxes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mbox names in the delta.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Cached JSON for mbox `name`.
    pub fn get(&self, name: &str) -> Option<&MboxJson> {
        self.0.get(name)
    }
}

/// Kind of network-bound request a [`TargetEvent::Response`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Content fetched ahead of display.
    Prefetch,
    /// Content fetched for immediate use.
    Execute,
    /// Display notifications.
    LocationsDisplayed,
    /// Click notification.
    LocationClicked,
}

/// Events the client publishes to the host.
#[derive(Debug, Clone)]
pub enum TargetEvent {
    /// Outcome of a network-bound request.
    ///
    /// Carries either the mboxes returned by the service (empty for notification calls) or the
    /// reason the call failed.
    Response {
        /// Request this event answers.
        kind: RequestKind,
        /// Returned content or failure.
        result: Result<ContentDelta>,
    },
    /// New identity state after a round trip or an identity mutation.
    SharedState(IdentityState),
    /// Answer to an identifiers query.
    IdentityResponse(IdentityState),
}

/// A trait for receiving events from the client. This is where the host hooks its event bus.
pub trait EventSink {
    /// Publish the event.
    ///
    /// This method is called from the thread that processes requests, so it should not block.
    fn publish(&self, event: TargetEvent);
}

pub(crate) struct NoopEventSink;
impl EventSink for NoopEventSink {
    fn publish(&self, _event: TargetEvent) {}
}

impl<T: Fn(TargetEvent)> EventSink for T {
    fn publish(&self, event: TargetEvent) {
        self(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{EventSink, IdentityState, TargetEvent};

    #[test]
    fn closures_are_sinks() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let received = received.clone();
            move |event: TargetEvent| received.lock().unwrap().push(event)
        };

        sink.publish(TargetEvent::SharedState(IdentityState::default()));

        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[test]
    fn identity_state_serializes_present_fields_only() {
        let state = IdentityState {
            tnt_id: Some("DE03D4AD-1FFE-421F-B2F2-303BF26822C1.35_0".to_owned()),
            third_party_id: None,
        };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            serde_json::json!({"tntid": "DE03D4AD-1FFE-421F-B2F2-303BF26822C1.35_0"})
        );
    }
}
