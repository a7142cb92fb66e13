//! Session and identity state, persisted through a [`KeyValueStore`].
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    events::IdentityState,
    store::{self, KeyValueStore},
};

/// Session and identity state of the client.
///
/// Every mutation is written through to the backing store. Reads of [`SessionStore::session_id`]
/// and [`SessionStore::edge_host`] are side-effecting: they enforce the session expiry policy.
pub struct SessionStore {
    store: Box<dyn KeyValueStore>,
    tnt_id: Option<String>,
    third_party_id: Option<String>,
    edge_host: Option<String>,
    /// Empty means "regenerate on next read".
    session_id: String,
    /// Unix timestamp in seconds of the last session activity.
    session_started_at: Option<i64>,
    session_timeout: Duration,
}

impl SessionStore {
    /// Default session timeout.
    pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

    /// Load session state from `store`.
    pub fn new(store: Box<dyn KeyValueStore>) -> SessionStore {
        let tnt_id = store.get_string(store::TNT_ID);
        let third_party_id = store.get_string(store::THIRD_PARTY_ID);
        let edge_host = store.get_string(store::EDGE_HOST);
        let session_id = store.get_string(store::SESSION_ID).unwrap_or_default();
        let session_started_at = store.get_i64(store::SESSION_TIMESTAMP);

        log::debug!(target: "target_delivery",
                    has_tnt_id = tnt_id.is_some(),
                    has_edge_host = edge_host.is_some(),
                    has_session = !session_id.is_empty();
                    "loaded session state");

        SessionStore {
            store,
            tnt_id,
            third_party_id,
            edge_host,
            session_id,
            session_started_at,
            session_timeout: SessionStore::DEFAULT_SESSION_TIMEOUT,
        }
    }

    /// Current tnt id.
    pub fn tnt_id(&self) -> Option<&str> {
        self.tnt_id.as_deref()
    }

    /// Current third-party id.
    pub fn third_party_id(&self) -> Option<&str> {
        self.third_party_id.as_deref()
    }

    /// Timestamp (unix seconds) of the last session activity, if any was recorded.
    pub fn session_started_at(&self) -> Option<i64> {
        self.session_started_at
    }

    /// Session timeout currently in effect.
    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    pub(crate) fn set_session_timeout(&mut self, timeout: Duration) {
        self.session_timeout = timeout;
    }

    /// Return the current session id.
    ///
    /// If there is no session id or the session has expired, a new id is generated and persisted,
    /// and the session timestamp is refreshed.
    pub fn session_id(&mut self) -> &str {
        if self.session_id.is_empty() || self.is_expired() {
            self.session_id = Uuid::new_v4().to_string();
            self.store.set_string(store::SESSION_ID, &self.session_id);
            self.refresh_session_timestamp();
            log::debug!(target: "target_delivery",
                        session_id:display = self.session_id;
                        "started a new session");
        }
        &self.session_id
    }

    /// Return the cached edge host. An expired session clears the edge host first.
    pub fn edge_host(&mut self) -> Option<&str> {
        if self.is_expired() {
            self.update_edge_host(None);
        }
        self.edge_host.as_deref()
    }

    /// Replace the edge host. Empty values are treated as absent.
    pub fn update_edge_host(&mut self, edge_host: Option<&str>) {
        let edge_host = edge_host.filter(|host| !host.is_empty());
        if edge_host == self.edge_host.as_deref() {
            log::debug!(target: "target_delivery",
                        edge_host;
                        "new edge host is the same as the existing one");
            return;
        }

        match edge_host {
            Some(host) => self.store.set_string(store::EDGE_HOST, host),
            None => self.store.remove(store::EDGE_HOST),
        }
        self.edge_host = edge_host.map(str::to_owned);
    }

    /// Replace the tnt id. Empty values are treated as absent.
    pub fn update_tnt_id(&mut self, tnt_id: Option<&str>) {
        self.tnt_id = persist_identifier(&*self.store, store::TNT_ID, tnt_id);
    }

    /// Replace the third-party id. Empty values are treated as absent.
    pub fn update_third_party_id(&mut self, third_party_id: Option<&str>) {
        self.third_party_id =
            persist_identifier(&*self.store, store::THIRD_PARTY_ID, third_party_id);
    }

    /// Record session activity now.
    pub fn refresh_session_timestamp(&mut self) {
        let now = Utc::now().timestamp();
        self.session_started_at = Some(now);
        self.store.set_i64(store::SESSION_TIMESTAMP, now);
    }

    /// End the current session. The next [`SessionStore::session_id`] read starts a new one.
    pub fn reset_session(&mut self) {
        self.session_started_at = Some(0);
        self.store.remove(store::SESSION_TIMESTAMP);
        self.session_id.clear();
        self.store.remove(store::SESSION_ID);
    }

    /// Clear all identifiers and end the session.
    pub fn reset_identities(&mut self) {
        self.update_tnt_id(None);
        self.update_third_party_id(None);
        self.update_edge_host(None);
        self.reset_session();
    }

    /// Return `true` if more than the session timeout has elapsed since the last session
    /// activity. Returns `false` if no activity has been recorded.
    pub fn is_expired(&self) -> bool {
        let Some(started_at) = self.session_started_at else {
            return false;
        };
        let timeout = i64::try_from(self.session_timeout.as_secs()).unwrap_or(i64::MAX);
        Utc::now().timestamp().saturating_sub(started_at) > timeout
    }

    /// Identity facts to publish to the host.
    pub fn identity_state(&self) -> IdentityState {
        IdentityState {
            tnt_id: self.tnt_id.clone(),
            third_party_id: self.third_party_id.clone(),
        }
    }
}

fn persist_identifier(store: &dyn KeyValueStore, key: &str, value: Option<&str>) -> Option<String> {
    match value.filter(|v| !v.is_empty()) {
        Some(value) => {
            store.set_string(key, value);
            Some(value.to_owned())
        }
        None => {
            store.remove(key);
            None
        }
    }
}
