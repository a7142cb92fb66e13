use std::collections::HashSet;

use chrono::Utc;

use crate::{
    cache::ContentCache,
    config::ClientConfig,
    configuration::{ConfigurationSnapshot, PrivacyStatus},
    context::DeviceContextProvider,
    events::{ContentDelta, EventSink, IdentityState, RequestKind, TargetEvent},
    notifications::NotificationBuffer,
    params::TargetParameters,
    request_builder::{check_configuration, delivery_url, MboxRequest, MboxSelection, RequestContext},
    response::reconcile,
    session::SessionStore,
    transport::{HttpRequest, ReqwestTransport, Transport},
    Error, Result,
};

/// A request from the host event layer.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetRequest {
    /// Fetch content ahead of display.
    Prefetch {
        /// Mboxes to prefetch.
        mboxes: Vec<MboxRequest>,
        /// Parameters applied to every mbox.
        parameters: Option<TargetParameters>,
    },
    /// Fetch content for immediate use.
    Execute {
        /// Mboxes to execute.
        mboxes: Vec<MboxRequest>,
        /// Parameters applied to every mbox.
        parameters: Option<TargetParameters>,
    },
    /// Report that prefetched mboxes were displayed.
    LocationsDisplayed {
        /// Displayed mbox names.
        names: Vec<String>,
        /// Parameters attached to the notifications.
        parameters: Option<TargetParameters>,
    },
    /// Report a click on a cached mbox.
    LocationClicked {
        /// Clicked mbox name.
        name: String,
        /// Parameters attached to the notification.
        parameters: Option<TargetParameters>,
    },
    /// Forget the visitor: identifiers, session, cached content.
    ResetExperience,
    /// Set or clear the third-party id.
    SetThirdPartyId(Option<String>),
    /// Publish the current identifiers.
    GetIdentifiers,
    /// A new configuration snapshot is in effect.
    ConfigurationChanged(ConfigurationSnapshot),
}

/// The delivery client.
///
/// Owns session state, cached content and buffered notifications. All methods take `&mut self`:
/// requests are processed one at a time, and a network-bound request blocks until its response
/// has been reconciled. Use [`IntakeThread`](crate::IntakeThread) to drive a client from a
/// background thread.
///
/// # Examples
/// ```
/// # use target_delivery::{ClientConfig, ConfigurationSnapshot, PrivacyStatus, TargetClient};
/// let mut client = TargetClient::new(ClientConfig::new());
/// client.configuration_changed(
///     ConfigurationSnapshot::new("code_123").with_privacy(PrivacyStatus::OptedIn),
/// );
/// ```
pub struct TargetClient {
    session: SessionStore,
    cache: ContentCache,
    notifications: NotificationBuffer,
    configuration: Option<ConfigurationSnapshot>,
    transport: Box<dyn Transport>,
    device_context: Box<dyn DeviceContextProvider>,
    event_sink: Box<dyn EventSink + Send>,
}

impl TargetClient {
    /// Create a new `TargetClient`, loading persisted session state from the configured store.
    pub fn new(config: ClientConfig) -> Self {
        let mut client = TargetClient {
            session: SessionStore::new(config.store),
            cache: ContentCache::new(),
            notifications: NotificationBuffer::new(),
            configuration: None,
            transport: config
                .transport
                .unwrap_or_else(|| Box::new(ReqwestTransport::new())),
            device_context: config.device_context,
            event_sink: config.event_sink,
        };
        if let Some(configuration) = config.configuration {
            client.configuration_changed(configuration);
        }
        client
    }

    /// Process a single request and publish its outcome.
    ///
    /// Network-bound requests publish a [`TargetEvent::Response`] carrying the same result that is
    /// returned here.
    pub fn handle(&mut self, request: TargetRequest) -> Result<()> {
        let (kind, result) = match request {
            TargetRequest::Prefetch { mboxes, parameters } => (
                RequestKind::Prefetch,
                self.prefetch(&mboxes, parameters.as_ref()),
            ),
            TargetRequest::Execute { mboxes, parameters } => (
                RequestKind::Execute,
                self.execute(&mboxes, parameters.as_ref()),
            ),
            TargetRequest::LocationsDisplayed { names, parameters } => (
                RequestKind::LocationsDisplayed,
                self.locations_displayed(&names, parameters.as_ref()),
            ),
            TargetRequest::LocationClicked { name, parameters } => (
                RequestKind::LocationClicked,
                self.location_clicked(&name, parameters.as_ref()),
            ),
            TargetRequest::ResetExperience => {
                self.reset_experience();
                return Ok(());
            }
            TargetRequest::SetThirdPartyId(third_party_id) => {
                self.set_third_party_id(third_party_id.as_deref());
                return Ok(());
            }
            TargetRequest::GetIdentifiers => {
                self.event_sink
                    .publish(TargetEvent::IdentityResponse(self.identifiers()));
                return Ok(());
            }
            TargetRequest::ConfigurationChanged(configuration) => {
                self.configuration_changed(configuration);
                return Ok(());
            }
        };

        self.event_sink.publish(TargetEvent::Response {
            kind,
            result: result.clone(),
        });
        result.map(|_| ())
    }

    /// Prefetch `mboxes` and cache the returned content.
    ///
    /// Buffered notifications are sent along. An empty list with an empty buffer is rejected with
    /// [`Error::EmptyRequest`].
    pub fn prefetch(
        &mut self,
        mboxes: &[MboxRequest],
        parameters: Option<&TargetParameters>,
    ) -> Result<ContentDelta> {
        self.send(RequestKind::Prefetch, MboxSelection::Prefetch(mboxes), parameters)
    }

    /// Execute `mboxes`. Returned content is kept for click tracking only.
    pub fn execute(
        &mut self,
        mboxes: &[MboxRequest],
        parameters: Option<&TargetParameters>,
    ) -> Result<ContentDelta> {
        self.send(RequestKind::Execute, MboxSelection::Execute(mboxes), parameters)
    }

    /// Send display notifications for prefetched mboxes.
    ///
    /// Empty names, names that were loaded by an execute call, names that were never prefetched and
    /// repeated names are skipped. If nothing is left to send, no request is made.
    pub fn locations_displayed(
        &mut self,
        names: &[String],
        parameters: Option<&TargetParameters>,
    ) -> Result<ContentDelta> {
        check_configuration(self.configuration.as_ref())?;

        let context = RequestContext::capture(&*self.device_context);
        let notification_parameters = context.notification_parameters(parameters);
        let timestamp = Utc::now().timestamp_millis();

        let mut seen = HashSet::new();
        for name in names {
            if name.is_empty() || !seen.insert(name.as_str()) {
                continue;
            }
            if self.cache.loaded_mbox(name).is_some() {
                continue;
            }
            let Some(cached) = self.cache.prefetched_mbox(name) else {
                log::warn!(target: "target_delivery", mbox_name = name.as_str();
                           "no cached mbox found, display notification not sent");
                continue;
            };
            self.notifications
                .add_display(name, cached, notification_parameters.clone(), timestamp);
        }

        if self.notifications.is_empty() {
            log::debug!(target: "target_delivery", "no display notifications to send");
            return Err(Error::EmptyRequest);
        }

        self.send(RequestKind::LocationsDisplayed, MboxSelection::None, parameters)
    }

    /// Send a click notification for a prefetched or loaded mbox.
    pub fn location_clicked(
        &mut self,
        name: &str,
        parameters: Option<&TargetParameters>,
    ) -> Result<ContentDelta> {
        check_configuration(self.configuration.as_ref())?;

        let Some(cached) = self
            .cache
            .prefetched_mbox(name)
            .or_else(|| self.cache.loaded_mbox(name))
        else {
            log::warn!(target: "target_delivery", mbox_name = name;
                       "no cached mbox found, click notification not sent");
            return Err(Error::MboxNotCached(name.to_owned()));
        };

        let context = RequestContext::capture(&*self.device_context);
        let added = self.notifications.add_click(
            name,
            cached,
            context.notification_parameters(parameters),
            Utc::now().timestamp_millis(),
        );
        if added.is_none() {
            return Err(Error::EmptyRequest);
        }

        self.send(RequestKind::LocationClicked, MboxSelection::None, parameters)
    }

    /// Clear identifiers, session, cached content and buffered notifications.
    pub fn reset_experience(&mut self) {
        log::debug!(target: "target_delivery", "resetting experience");
        self.reset_visitor();
        self.publish_shared_state();
    }

    /// Set the third-party id. `None` or an empty value clears it.
    pub fn set_third_party_id(&mut self, third_party_id: Option<&str>) {
        if self.configuration.as_ref().map(|c| c.privacy) == Some(PrivacyStatus::OptedOut) {
            log::debug!(target: "target_delivery", "privacy is opted out, third-party id not set");
            return;
        }
        self.session.update_third_party_id(third_party_id);
        self.publish_shared_state();
    }

    /// Current identifiers.
    pub fn identifiers(&self) -> IdentityState {
        self.session.identity_state()
    }

    /// Apply a new configuration snapshot.
    ///
    /// The first snapshot and any later change of client code clear the edge host. Opting out
    /// clears every identifier, cached content and buffered notifications.
    pub fn configuration_changed(&mut self, configuration: ConfigurationSnapshot) {
        // The edge host is not persisted with its client code, so the first snapshot counts as a
        // change too.
        let client_code_changed = self
            .configuration
            .as_ref()
            .map_or(true, |previous| previous.client_code != configuration.client_code);
        if client_code_changed {
            log::debug!(target: "target_delivery",
                        client_code:display = configuration.client_code;
                        "client code changed, clearing edge host");
            self.session.update_edge_host(None);
        }

        self.session.set_session_timeout(
            configuration
                .session_timeout
                .unwrap_or(SessionStore::DEFAULT_SESSION_TIMEOUT),
        );

        let opted_out = configuration.privacy == PrivacyStatus::OptedOut;
        self.configuration = Some(configuration);

        if opted_out {
            log::debug!(target: "target_delivery", "privacy opted out, clearing identities");
            self.reset_visitor();
            self.publish_shared_state();
        }
    }

    /// Configuration currently in effect.
    pub fn configuration(&self) -> Option<&ConfigurationSnapshot> {
        self.configuration.as_ref()
    }

    /// Session and identity state.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Cached content.
    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Number of notifications waiting for the next request.
    pub fn pending_notifications(&self) -> usize {
        self.notifications.len()
    }

    fn reset_visitor(&mut self) {
        self.session.reset_identities();
        self.cache.clear();
        self.notifications.clear();
    }

    fn publish_shared_state(&self) {
        self.event_sink
            .publish(TargetEvent::SharedState(self.session.identity_state()));
    }

    fn send(
        &mut self,
        kind: RequestKind,
        selection: MboxSelection,
        parameters: Option<&TargetParameters>,
    ) -> Result<ContentDelta> {
        let configuration = check_configuration(self.configuration.as_ref())?.clone();

        let has_mboxes = match selection {
            MboxSelection::Prefetch(mboxes) | MboxSelection::Execute(mboxes) => !mboxes.is_empty(),
            MboxSelection::None => false,
        };
        if !has_mboxes && self.notifications.is_empty() {
            return Err(Error::EmptyRequest);
        }

        let context = RequestContext::capture(&*self.device_context);
        let ids = context.target_ids(self.session.tnt_id(), self.session.third_party_id());
        // Edge host first: reading the session id refreshes the session timestamp.
        let edge_host = self.session.edge_host().map(str::to_owned);
        let session_id = self.session.session_id().to_owned();
        let url = delivery_url(&configuration, edge_host.as_deref(), &session_id)?;

        let notifications = self.notifications.drain();
        let payload = context.build(&configuration, ids, selection, parameters, notifications)?;

        let request = HttpRequest {
            url,
            payload,
            timeout: configuration.network_timeout,
        };

        let response = self.transport.send(&request).map_err(|err| {
            log::warn!(target: "target_delivery", kind:serde = kind;
                       "delivery request failed: {}", err);
            err
        })?;

        let result = reconcile(&response, kind, &mut self.session, &mut self.cache);
        if !matches!(result, Err(Error::ResponseParse(_))) {
            self.publish_shared_state();
        }
        result
    }
}
