//! Wire format of the delivery API request.
//!
//! Only keys relevant to the current call are serialized: absent optional blocks, empty
//! notification lists and empty parameter maps are skipped.
use serde::Serialize;

use crate::{
    context::{AuthenticatedState, DeviceType, Orientation, PlatformType},
    params::TargetParameters,
};

/// Request body sent to the delivery endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequest {
    /// Visitor identifiers.
    pub id: TargetIds,
    /// Device and app context.
    pub context: TargetContext,
    /// Experience cloud integration.
    pub experience_cloud: ExperienceCloud,
    /// Mboxes to prefetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefetch: Option<Mboxes>,
    /// Mboxes to execute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execute: Option<Mboxes>,
    /// Buffered display/click notifications.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<Notification>,
    /// Environment id. `0` selects the default environment.
    pub environment_id: i64,
    /// At.js property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<Property>,
}

/// Visitor identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetIds {
    /// Target visitor id returned by the edge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tnt_id: Option<String>,
    /// Caller-supplied third-party id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub third_party_id: Option<String>,
    /// Experience Cloud id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketing_cloud_visitor_id: Option<String>,
    /// Synced customer ids.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub customer_ids: Vec<CustomerId>,
}

/// A synced customer id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerId {
    /// The id value.
    pub id: String,
    /// Integration code, the id type the value was synced under.
    pub integration_code: String,
    /// Authentication state of the visitor for this id.
    pub authenticated_state: AuthenticatedState,
}

/// Experience Cloud integration block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceCloud {
    /// Audience Manager data, present when the identity service provided any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience_manager: Option<AudienceManager>,
    /// Analytics integration mode.
    pub analytics: Analytics,
}

/// Audience Manager data from the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudienceManager {
    /// Audience Manager blob.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
    /// Location hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_hint: Option<String>,
}

/// Analytics for Target integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    /// Logging mode.
    pub logging: AnalyticsLogging,
}

/// Where analytics hits for Target activities are sent from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsLogging {
    /// The client forwards the analytics payload itself.
    ClientSide,
}

/// Request channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Mobile app.
    Mobile,
}

/// Device and app context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetContext {
    /// Always [`Channel::Mobile`].
    pub channel: Channel,
    /// Device facts.
    pub mobile_platform: MobilePlatform,
    /// Host application.
    pub application: AppInfo,
    /// Screen geometry.
    pub screen: Screen,
    /// Device user agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Local offset from UTC.
    pub time_offset_in_minutes: i32,
}

/// Device facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MobilePlatform {
    /// Device model name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    /// Phone or tablet.
    pub device_type: DeviceType,
    /// Operating system family.
    pub platform_type: PlatformType,
}

/// Host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    /// Bundle or package id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Version string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Screen geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Screen {
    /// Bits per pixel.
    pub color_depth: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Current orientation.
    pub orientation: Orientation,
}

/// A list of mboxes to prefetch or execute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mboxes {
    /// Items in submission order.
    pub mboxes: Vec<Mbox>,
}

/// A single prefetch or execute item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mbox {
    /// Position of the item in the submitted sequence.
    pub index: usize,
    /// Mbox name.
    pub name: String,
    /// Merged parameters.
    #[serde(flatten)]
    pub parameters: TargetParameters,
}

/// Kind of notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    /// Prefetched content was shown.
    Display,
    /// Content was clicked.
    Click,
}

/// Mbox reference inside a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationMbox {
    /// Mbox name.
    pub name: String,
    /// Opaque state from the prefetch response. Display notifications only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Display or click telemetry for previously fetched content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Fresh UUID per notification.
    pub id: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Display or click.
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    /// The mbox this notification is about.
    pub mbox: NotificationMbox,
    /// Event tokens taken from the cached mbox. Never empty.
    pub tokens: Vec<String>,
    /// Merged parameters.
    #[serde(flatten)]
    pub parameters: TargetParameters,
}

/// At.js property the request is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    /// Property token from the configuration.
    pub token: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Mbox, Notification, NotificationMbox, NotificationType};
    use crate::params::TargetParameters;

    #[test]
    fn mbox_flattens_parameters() {
        let mbox = Mbox {
            index: 1,
            name: "Drink_2".to_owned(),
            parameters: TargetParameters::new().with_profile_parameter("name", "Smith"),
        };

        assert_eq!(
            serde_json::to_value(&mbox).unwrap(),
            json!({
                "index": 1,
                "name": "Drink_2",
                "profileParameters": {"name": "Smith"},
            })
        );
    }

    #[test]
    fn notification_wire_shape() {
        let notification = Notification {
            id: "4BA0B2EF-9A20-4BDC-9F97-0B955BC5FF84".to_owned(),
            timestamp: 1_615_436_587_000,
            notification_type: NotificationType::Display,
            mbox: NotificationMbox {
                name: "mbox1".to_owned(),
                state: Some("state1".to_owned()),
            },
            tokens: vec!["sometoken".to_owned()],
            parameters: TargetParameters::new().with_parameter("a.OSVersion", "iOS 14.4"),
        };

        assert_eq!(
            serde_json::to_value(&notification).unwrap(),
            json!({
                "id": "4BA0B2EF-9A20-4BDC-9F97-0B955BC5FF84",
                "timestamp": 1_615_436_587_000_i64,
                "type": "display",
                "mbox": {"name": "mbox1", "state": "state1"},
                "tokens": ["sometoken"],
                "parameters": {"a.OSVersion": "iOS 14.4"},
            })
        );
    }
}
