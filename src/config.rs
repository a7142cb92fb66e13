use crate::{
    context::{DeviceContextProvider, StaticDeviceContext},
    events::{EventSink, NoopEventSink},
    store::{InMemoryStore, KeyValueStore},
    transport::Transport,
    ConfigurationSnapshot, TargetClient,
};

/// Collaborators and initial configuration for [`TargetClient`].
pub struct ClientConfig {
    pub(crate) store: Box<dyn KeyValueStore>,
    pub(crate) transport: Option<Box<dyn Transport>>,
    pub(crate) device_context: Box<dyn DeviceContextProvider>,
    pub(crate) event_sink: Box<dyn EventSink + Send>,
    pub(crate) configuration: Option<ConfigurationSnapshot>,
}

impl ClientConfig {
    /// Create a default configuration: in-memory store, empty device context, no event sink and no
    /// configuration snapshot. Unless a transport is set, the client builds a
    /// [`ReqwestTransport`](crate::ReqwestTransport) when it is created.
    ///
    /// ```
    /// # use target_delivery::ClientConfig;
    /// ClientConfig::new();
    /// ```
    pub fn new() -> Self {
        ClientConfig {
            store: Box::new(InMemoryStore::new()),
            transport: None,
            device_context: Box::new(StaticDeviceContext::default()),
            event_sink: Box::new(NoopEventSink),
            configuration: None,
        }
    }

    /// Set the store used to persist session and identity state.
    pub fn store(mut self, store: impl KeyValueStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    /// Set the HTTP transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Set the provider of device, lifecycle and identity facts.
    pub fn device_context(mut self, provider: impl DeviceContextProvider + 'static) -> Self {
        self.device_context = Box::new(provider);
        self
    }

    /// Set the sink receiving responses and shared state.
    ///
    /// ```
    /// # use target_delivery::{ClientConfig, TargetEvent};
    /// let config = ClientConfig::new().event_sink(|event: TargetEvent| {
    ///   println!("{:?}", event);
    /// });
    /// ```
    pub fn event_sink(mut self, event_sink: impl EventSink + Send + 'static) -> Self {
        self.event_sink = Box::new(event_sink);
        self
    }

    /// Start with `configuration` already applied.
    pub fn configuration(mut self, configuration: ConfigurationSnapshot) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Create a new [`TargetClient`] using the specified configuration.
    ///
    /// ```
    /// # use target_delivery::{ClientConfig, TargetClient};
    /// let client: TargetClient = ClientConfig::new().to_client();
    /// ```
    pub fn to_client(self) -> TargetClient {
        TargetClient::new(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig::new()
    }
}
