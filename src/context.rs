//! Read-only facts about the device, the app, and the visitor, supplied by the host.
use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Device form factor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Phone.
    #[default]
    Phone,
    /// Tablet.
    Tablet,
}

/// Screen orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Portrait.
    #[default]
    Portrait,
    /// Landscape.
    Landscape,
}

/// Mobile platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    /// iOS.
    #[default]
    Ios,
    /// Android.
    Android,
}

/// Facts about the device and app for a single call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceContext {
    /// Device name.
    pub device_name: Option<String>,
    /// Device form factor.
    pub device_type: DeviceType,
    /// Mobile platform.
    pub platform_type: PlatformType,
    /// Screen orientation.
    pub orientation: Orientation,
    /// Screen width in pixels.
    pub screen_width: u32,
    /// Screen height in pixels.
    pub screen_height: u32,
    /// Application id (bundle id).
    pub app_id: Option<String>,
    /// Application name.
    pub app_name: Option<String>,
    /// Application version.
    pub app_version: Option<String>,
    /// HTTP user agent.
    pub user_agent: Option<String>,
}

/// Authentication state of a visitor id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticatedState {
    /// Unknown.
    #[default]
    Unknown,
    /// Authenticated.
    Authenticated,
    /// Logged out.
    LoggedOut,
}

impl AuthenticatedState {
    /// Convert the integer representation used by identity services. Unrecognised values are
    /// [`AuthenticatedState::Unknown`].
    pub fn from_code(code: i64) -> AuthenticatedState {
        match code {
            1 => AuthenticatedState::Authenticated,
            2 => AuthenticatedState::LoggedOut,
            _ => AuthenticatedState::Unknown,
        }
    }
}

fn authenticated_state_code<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<AuthenticatedState, D::Error> {
    i64::deserialize(deserializer).map(AuthenticatedState::from_code)
}

/// A customer id synced with the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VisitorId {
    /// Id value.
    pub id: String,
    /// Id type, used as the integration code.
    #[serde(rename = "id.type")]
    pub id_type: String,
    /// Authentication state, reported by the identity service as an integer code.
    #[serde(
        rename = "authentication.state",
        default,
        deserialize_with = "authenticated_state_code"
    )]
    pub authenticated_state: AuthenticatedState,
}

/// Facts provided by the identity service.
///
/// Deserializes from the identity service's shared state:
///
/// ```
/// # use target_delivery::{AuthenticatedState, IdentitySnapshot};
/// let identity: IdentitySnapshot = serde_json::from_str(
///     r#"{"mid": "1234", "visitorids": [{"id": "u1", "id.type": "crm", "authentication.state": 1}]}"#,
/// )?;
/// assert_eq!(identity.visitor_ids[0].authenticated_state, AuthenticatedState::Authenticated);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IdentitySnapshot {
    /// Marketing cloud visitor id.
    #[serde(rename = "mid")]
    pub marketing_cloud_visitor_id: Option<String>,
    /// Audience manager blob.
    pub blob: Option<String>,
    /// Audience manager location hint.
    #[serde(rename = "locationhint")]
    pub location_hint: Option<String>,
    /// Synced customer ids.
    #[serde(rename = "visitorids")]
    pub visitor_ids: Vec<VisitorId>,
}

/// Source of per-call context. Implemented by the host.
pub trait DeviceContextProvider: Send {
    /// Device and app facts.
    fn device_context(&self) -> DeviceContext;

    /// Raw lifecycle context data (e.g. `osversion`, `appid`), if lifecycle metrics are
    /// available.
    fn lifecycle_data(&self) -> Option<HashMap<String, String>> {
        None
    }

    /// Identity service facts, if available.
    fn identity(&self) -> Option<IdentitySnapshot> {
        None
    }
}

/// A [`DeviceContextProvider`] returning fixed values.
#[derive(Debug, Clone, Default)]
pub struct StaticDeviceContext {
    /// Device and app facts.
    pub device: DeviceContext,
    /// Raw lifecycle context data.
    pub lifecycle: Option<HashMap<String, String>>,
    /// Identity service facts.
    pub identity: Option<IdentitySnapshot>,
}

impl DeviceContextProvider for StaticDeviceContext {
    fn device_context(&self) -> DeviceContext {
        self.device.clone()
    }

    fn lifecycle_data(&self) -> Option<HashMap<String, String>> {
        self.lifecycle.clone()
    }

    fn identity(&self) -> Option<IdentitySnapshot> {
        self.identity.clone()
    }
}

/// Lifecycle keys and the context-data keys they are reported as.
const LIFECYCLE_CONTEXT_KEYS: &[(&str, &str)] = &[
    ("advertisingidentifier", "a.adid"),
    ("appid", "a.AppID"),
    ("carriername", "a.CarrierName"),
    ("crashevent", "a.CrashEvent"),
    ("dailyenguserevent", "a.DailyEngUserEvent"),
    ("dayofweek", "a.DayOfWeek"),
    ("dayssincefirstuse", "a.DaysSinceFirstUse"),
    ("dayssincelastuse", "a.DaysSinceLastUse"),
    ("dayssincelastupgrade", "a.DaysSinceLastUpgrade"),
    ("devicename", "a.DeviceName"),
    ("resolution", "a.Resolution"),
    ("hourofday", "a.HourOfDay"),
    ("ignoredsessionlength", "a.ignoredSessionLength"),
    ("installdate", "a.InstallDate"),
    ("installevent", "a.InstallEvent"),
    ("launchevent", "a.LaunchEvent"),
    ("launches", "a.Launches"),
    ("launchessinceupgrade", "a.LaunchesSinceUpgrade"),
    ("locale", "a.locale"),
    ("monthlyenguserevent", "a.MonthlyEngUserEvent"),
    ("osversion", "a.OSVersion"),
    ("prevsessionlength", "a.PrevSessionLength"),
    ("runmode", "a.RunMode"),
    ("upgradeevent", "a.UpgradeEvent"),
];

/// Convert raw lifecycle data into the context-data map sent as mbox parameters.
///
/// Known keys are renamed and dropped if empty. Unknown keys pass through unchanged.
pub fn lifecycle_context_data(lifecycle: &HashMap<String, String>) -> HashMap<String, String> {
    let mut context_data = HashMap::with_capacity(lifecycle.len());
    for (key, value) in lifecycle {
        match LIFECYCLE_CONTEXT_KEYS.iter().find(|(raw, _)| *raw == key.as_str()) {
            Some((_, mapped)) => {
                if !value.is_empty() {
                    context_data.insert((*mapped).to_owned(), value.clone());
                }
            }
            None => {
                context_data.insert(key.clone(), value.clone());
            }
        }
    }
    context_data
}
