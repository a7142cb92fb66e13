//! Parsing of delivery responses and reconciliation into session and cache state.
use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::{
    cache::{ContentCache, MboxJson, NAME},
    events::{ContentDelta, RequestKind},
    session::SessionStore,
    transport::HttpResponse,
    Error, Result,
};

const STATUS_OK: u16 = 200;
const UNKNOWN_ERROR_MESSAGE: &str = "unknown error";

/// A parsed delivery response. Every accessor tolerates missing or mistyped fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryResponse {
    status: u16,
    body: Map<String, Value>,
}

impl DeliveryResponse {
    /// Parse the raw response. A body that is not a JSON object is a [`Error::ResponseParse`].
    pub fn parse(response: &HttpResponse) -> Result<DeliveryResponse> {
        let body = serde_json::from_slice(&response.body)?;
        Ok(DeliveryResponse {
            status: response.status,
            body,
        })
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Visitor id assigned by the service (`id.tntId`).
    pub fn tnt_id(&self) -> Option<&str> {
        self.body.get("id")?.get("tntId")?.as_str()
    }

    /// Edge host the service pinned this visitor to.
    pub fn edge_host(&self) -> Option<&str> {
        self.body.get("edgeHost")?.as_str()
    }

    /// Error message reported by the service.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("message")?.as_str()
    }

    /// Mboxes under `prefetch` or `execute`, keyed by name. Entries without a name are skipped.
    pub fn mboxes(&self, section: &str) -> HashMap<String, MboxJson> {
        self.body
            .get(section)
            .and_then(|section| section.get("mboxes"))
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|mbox| {
                let mbox = mbox.as_object()?;
                let name = mbox.get(NAME)?.as_str()?;
                Some((name.to_owned(), mbox.clone()))
            })
            .collect()
    }
}

/// Reconcile a completed round trip into `session` and `cache`.
///
/// On a parse failure nothing is mutated. Otherwise the session timestamp is refreshed, and the tnt
/// id and edge host are updated when present, even if the service reported an error. Content is
/// cached only for successful prefetch and execute responses.
pub fn reconcile(
    response: &HttpResponse,
    kind: RequestKind,
    session: &mut SessionStore,
    cache: &mut ContentCache,
) -> Result<ContentDelta> {
    let response = DeliveryResponse::parse(response).map_err(|err| {
        log::warn!(target: "target_delivery", status = response.status;
                   "response parser initialization failed: {}", err);
        err
    })?;

    session.refresh_session_timestamp();
    if let Some(tnt_id) = response.tnt_id() {
        session.update_tnt_id(Some(tnt_id));
    }
    if let Some(edge_host) = response.edge_host() {
        session.update_edge_host(Some(edge_host));
    }

    if response.status() != STATUS_OK || response.error_message().is_some() {
        let message = response.error_message().unwrap_or(UNKNOWN_ERROR_MESSAGE);
        log::warn!(target: "target_delivery", status = response.status(), message;
                   "errors returned in response");
        return Err(Error::Application {
            status: response.status(),
            message: message.to_owned(),
        });
    }

    let delta = match kind {
        RequestKind::Prefetch => {
            let mboxes = response.mboxes("prefetch");
            cache.merge_prefetched(&mboxes);
            mboxes
        }
        RequestKind::Execute => {
            let mboxes = response.mboxes("execute");
            cache.save_loaded(&mboxes);
            mboxes
        }
        RequestKind::LocationsDisplayed | RequestKind::LocationClicked => HashMap::new(),
    };

    log::debug!(target: "target_delivery", kind:serde = kind, mboxes = delta.len();
                "reconciled delivery response");

    Ok(ContentDelta(delta))
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use serde_json::json;

    use super::{reconcile, DeliveryResponse};
    use crate::{
        cache::ContentCache,
        events::RequestKind,
        session::SessionStore,
        store::{InMemoryStore, KeyValueStore},
        transport::HttpResponse,
        Error,
    };

    fn fixture(path: &str) -> HttpResponse {
        let value: serde_json::Value = serde_json::from_reader(File::open(path).unwrap()).unwrap();
        HttpResponse {
            status: 200,
            body: serde_json::to_vec(&value).unwrap(),
        }
    }

    fn state() -> (SessionStore, ContentCache, InMemoryStore) {
        let store = InMemoryStore::new();
        (
            SessionStore::new(Box::new(store.clone())),
            ContentCache::new(),
            store,
        )
    }

    #[test]
    fn accessors_tolerate_missing_fields() {
        let response = DeliveryResponse::parse(&HttpResponse {
            status: 200,
            body: br#"{"id": "not-an-object", "prefetch": {"mboxes": [1, {"state": "s"}]}}"#.to_vec(),
        })
        .unwrap();

        assert_eq!(response.tnt_id(), None);
        assert_eq!(response.edge_host(), None);
        assert_eq!(response.error_message(), None);
        assert!(response.mboxes("prefetch").is_empty());
        assert!(response.mboxes("execute").is_empty());
    }

    #[test]
    fn prefetch_response_updates_state_and_cache() {
        let (mut session, mut cache, store) = state();

        let delta = reconcile(
            &fixture("tests/data/prefetch_response.json"),
            RequestKind::Prefetch,
            &mut session,
            &mut cache,
        )
        .unwrap();

        assert_eq!(session.tnt_id(), Some("DE03D4AD-1FFE-421F-B2F2-303BF26822C1.35_0"));
        assert_eq!(session.edge_host(), Some("mboxedge35.tt.omtrdc.net"));
        assert_eq!(
            store.get_string("edge.host").as_deref(),
            Some("mboxedge35.tt.omtrdc.net")
        );
        assert!(session.session_started_at().is_some());
        assert!(cache.prefetched_mbox("t_test_01").is_some());
        assert!(delta.get("t_test_01").is_some());
        assert!(cache.loaded().is_empty());
    }

    #[test]
    fn execute_response_skips_prefetched_names() {
        let (mut session, mut cache, _store) = state();

        reconcile(
            &fixture("tests/data/prefetch_response.json"),
            RequestKind::Prefetch,
            &mut session,
            &mut cache,
        )
        .unwrap();
        let delta = reconcile(
            &fixture("tests/data/execute_response.json"),
            RequestKind::Execute,
            &mut session,
            &mut cache,
        )
        .unwrap();

        // Full content is returned to the host even though it is not cached.
        assert!(delta.get("t_test_01").is_some());
        assert!(cache.loaded_mbox("t_test_01").is_none());
        assert!(cache.loaded_mbox("t_test_02").is_some());
    }

    #[test]
    fn application_error_still_updates_state() {
        let (mut session, mut cache, _store) = state();
        let response = HttpResponse {
            status: 400,
            body: serde_json::to_vec(&json!({
                "status": 400,
                "id": {"tntId": "tnt_from_error"},
                "edgeHost": "mboxedge28.tt.omtrdc.net",
                "message": "verify_error_message",
                "prefetch": {"mboxes": [{"name": "mbox1", "state": "s"}]},
            }))
            .unwrap(),
        };

        let result = reconcile(&response, RequestKind::Prefetch, &mut session, &mut cache);

        match result {
            Err(Error::Application { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "verify_error_message");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(session.tnt_id(), Some("tnt_from_error"));
        assert_eq!(session.edge_host(), Some("mboxedge28.tt.omtrdc.net"));
        assert!(session.session_started_at().is_some());
        assert!(cache.prefetched().is_empty());
    }

    #[test]
    fn parse_failure_mutates_nothing() {
        let (mut session, mut cache, store) = state();
        let response = HttpResponse {
            status: 200,
            body: b"<html>gateway timeout</html>".to_vec(),
        };

        let result = reconcile(&response, RequestKind::Prefetch, &mut session, &mut cache);

        assert!(matches!(result, Err(Error::ResponseParse(_))));
        assert_eq!(session.session_started_at(), None);
        assert_eq!(session.tnt_id(), None);
        assert!(!store.contains("session.timestamp"));
    }

    #[test]
    fn notification_response_returns_empty_delta() {
        let (mut session, mut cache, _store) = state();
        let response = HttpResponse {
            status: 200,
            body: br#"{"id": {"tntId": "tnt"}, "edgeHost": "mboxedge35.tt.omtrdc.net"}"#.to_vec(),
        };

        let delta = reconcile(
            &response,
            RequestKind::LocationsDisplayed,
            &mut session,
            &mut cache,
        )
        .unwrap();

        assert!(delta.is_empty());
        assert_eq!(session.tnt_id(), Some("tnt"));
    }
}
