use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Privacy status of the host application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivacyStatus {
    /// Requests are allowed.
    #[serde(rename = "optedin")]
    OptedIn,
    /// Requests are rejected and identities are cleared.
    #[serde(rename = "optedout")]
    OptedOut,
    /// Requests are rejected until the status is known.
    #[default]
    #[serde(rename = "optunknown")]
    Unknown,
}

/// Configuration in effect for a call. Supplied by the host whenever it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSnapshot {
    /// Client code of the account.
    pub client_code: String,
    /// Environment id. `0` selects the default environment.
    #[serde(default)]
    pub environment_id: i64,
    /// Property token sent with every request.
    #[serde(default)]
    pub property_token: Option<String>,
    /// Host overriding both the cached edge host and the default host.
    #[serde(default)]
    pub target_server: Option<String>,
    /// Privacy status.
    #[serde(default)]
    pub privacy: PrivacyStatus,
    /// Connect/read timeout for delivery requests.
    #[serde(default = "default_network_timeout", with = "duration_secs")]
    pub network_timeout: Duration,
    /// Session timeout. `None` keeps the default.
    #[serde(default, with = "opt_duration_secs")]
    pub session_timeout: Option<Duration>,
}

fn default_network_timeout() -> Duration {
    ConfigurationSnapshot::DEFAULT_NETWORK_TIMEOUT
}

impl ConfigurationSnapshot {
    /// Default value for [`ConfigurationSnapshot::network_timeout`].
    pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(2);

    /// Create a configuration for `client_code` with default settings. Privacy status starts as
    /// [`PrivacyStatus::Unknown`].
    ///
    /// ```
    /// # use target_delivery::{ConfigurationSnapshot, PrivacyStatus};
    /// let configuration = ConfigurationSnapshot::new("code_123").with_privacy(PrivacyStatus::OptedIn);
    /// ```
    pub fn new(client_code: impl Into<String>) -> ConfigurationSnapshot {
        ConfigurationSnapshot {
            client_code: client_code.into(),
            environment_id: 0,
            property_token: None,
            target_server: None,
            privacy: PrivacyStatus::default(),
            network_timeout: ConfigurationSnapshot::DEFAULT_NETWORK_TIMEOUT,
            session_timeout: None,
        }
    }

    /// Set privacy status.
    pub fn with_privacy(mut self, privacy: PrivacyStatus) -> Self {
        self.privacy = privacy;
        self
    }

    /// Set environment id.
    pub fn with_environment_id(mut self, environment_id: i64) -> Self {
        self.environment_id = environment_id;
        self
    }

    /// Set property token.
    pub fn with_property_token(mut self, token: impl Into<String>) -> Self {
        self.property_token = Some(token.into());
        self
    }

    /// Override the delivery host.
    pub fn with_target_server(mut self, server: impl Into<String>) -> Self {
        self.target_server = Some(server.into());
        self
    }

    /// Override the network timeout.
    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = timeout;
        self
    }

    /// Override the session timeout.
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = Some(timeout);
        self
    }

    /// Property token if one is configured and non-empty.
    pub fn property_token(&self) -> Option<&str> {
        self.property_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Target server override if one is configured and non-empty.
    pub fn target_server(&self) -> Option<&str> {
        self.target_server.as_deref().filter(|s| !s.is_empty())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

mod opt_duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}
