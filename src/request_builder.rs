//! Assembles delivery requests from session state, configuration, device context and caller
//! parameters.
use std::collections::HashMap;

use chrono::{Local, Offset};
use url::Url;

use crate::{
    configuration::{ConfigurationSnapshot, PrivacyStatus},
    context::{lifecycle_context_data, DeviceContext, DeviceContextProvider, IdentitySnapshot},
    delivery::{
        Analytics, AnalyticsLogging, AppInfo, AudienceManager, Channel, CustomerId,
        DeliveryRequest, ExperienceCloud, Mbox, Mboxes, MobilePlatform, Notification, Property,
        Screen, TargetContext, TargetIds,
    },
    params::{merge_parameters, TargetParameters},
    Error, Result,
};

const DELIVERY_API_PATH: &str = "rest/v1/delivery/";
const DEFAULT_HOST_SUFFIX: &str = "tt.omtrdc.net";
const COLOR_DEPTH_32: u32 = 32;

/// An mbox requested by the caller, with its own parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MboxRequest {
    /// Mbox name.
    pub name: String,
    /// Parameters for this mbox only.
    pub parameters: Option<TargetParameters>,
}

impl MboxRequest {
    /// Request mbox `name` without parameters.
    pub fn new(name: impl Into<String>) -> MboxRequest {
        MboxRequest {
            name: name.into(),
            parameters: None,
        }
    }

    /// Attach parameters for this mbox.
    pub fn with_parameters(mut self, parameters: TargetParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// Which list of mboxes a request carries.
#[derive(Debug, Clone, Copy)]
pub enum MboxSelection<'a> {
    /// Prefetch the mboxes.
    Prefetch(&'a [MboxRequest]),
    /// Execute the mboxes.
    Execute(&'a [MboxRequest]),
    /// Notifications only.
    None,
}

impl MboxSelection<'_> {
    fn is_empty(&self) -> bool {
        match self {
            MboxSelection::Prefetch(mboxes) | MboxSelection::Execute(mboxes) => mboxes.is_empty(),
            MboxSelection::None => true,
        }
    }
}

/// Check that a request may be sent with `configuration`. Nothing is mutated on failure.
pub fn check_configuration(
    configuration: Option<&ConfigurationSnapshot>,
) -> Result<&ConfigurationSnapshot> {
    let configuration = configuration.ok_or(Error::ConfigurationMissing)?;
    if configuration.client_code.is_empty() {
        return Err(Error::ClientCodeEmpty);
    }
    if configuration.privacy != PrivacyStatus::OptedIn {
        return Err(Error::OptedOut);
    }
    Ok(configuration)
}

/// Build the delivery endpoint URL.
///
/// Host precedence: configured target server, then the cached edge host, then the default host
/// derived from the client code.
pub fn delivery_url(
    configuration: &ConfigurationSnapshot,
    edge_host: Option<&str>,
    session_id: &str,
) -> Result<Url> {
    let host = match (configuration.target_server(), edge_host.filter(|h| !h.is_empty())) {
        (Some(server), _) => server.to_owned(),
        (None, Some(edge_host)) => edge_host.to_owned(),
        (None, None) => format!("{}.{}", configuration.client_code, DEFAULT_HOST_SUFFIX),
    };

    Url::parse_with_params(
        &format!("https://{}/{}", host, DELIVERY_API_PATH),
        &[
            ("client", configuration.client_code.as_str()),
            ("sessionId", session_id),
        ],
    )
    .map_err(Error::InvalidUrl)
}

/// Per-call context captured once from the [`DeviceContextProvider`].
pub struct RequestContext {
    device: DeviceContext,
    identity: Option<IdentitySnapshot>,
    context_data: HashMap<String, String>,
}

impl RequestContext {
    /// Capture device, identity and lifecycle facts for one call.
    pub fn capture(provider: &dyn DeviceContextProvider) -> RequestContext {
        RequestContext {
            device: provider.device_context(),
            identity: provider.identity(),
            context_data: provider
                .lifecycle_data()
                .map(|lifecycle| lifecycle_context_data(&lifecycle))
                .unwrap_or_default(),
        }
    }

    /// Merge call-wide parameters with the derived context. Used for notifications.
    pub fn notification_parameters(&self, global: Option<&TargetParameters>) -> TargetParameters {
        merge_parameters(Some(&self.context_data), None, global)
    }

    /// Visitor identifiers.
    pub fn target_ids(&self, tnt_id: Option<&str>, third_party_id: Option<&str>) -> TargetIds {
        let identity = self.identity.as_ref();
        TargetIds {
            tnt_id: tnt_id.map(str::to_owned),
            third_party_id: third_party_id.map(str::to_owned),
            marketing_cloud_visitor_id: identity
                .and_then(|identity| identity.marketing_cloud_visitor_id.clone()),
            customer_ids: identity
                .map(|identity| {
                    identity
                        .visitor_ids
                        .iter()
                        .map(|visitor_id| CustomerId {
                            id: visitor_id.id.clone(),
                            integration_code: visitor_id.id_type.clone(),
                            authenticated_state: visitor_id.authenticated_state,
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Experience cloud block. Audience manager info is present only with identity data.
    pub fn experience_cloud(&self) -> ExperienceCloud {
        ExperienceCloud {
            audience_manager: self.identity.as_ref().map(|identity| AudienceManager {
                blob: identity.blob.clone(),
                location_hint: identity.location_hint.clone(),
            }),
            analytics: Analytics {
                logging: AnalyticsLogging::ClientSide,
            },
        }
    }

    /// Device and app context block.
    pub fn target_context(&self) -> TargetContext {
        let device = &self.device;
        TargetContext {
            channel: Channel::Mobile,
            mobile_platform: MobilePlatform {
                device_name: device.device_name.clone(),
                device_type: device.device_type,
                platform_type: device.platform_type,
            },
            application: AppInfo {
                id: device.app_id.clone(),
                name: device.app_name.clone(),
                version: device.app_version.clone(),
            },
            screen: Screen {
                color_depth: COLOR_DEPTH_32,
                width: device.screen_width,
                height: device.screen_height,
                orientation: device.orientation,
            },
            user_agent: device.user_agent.clone(),
            time_offset_in_minutes: Local::now().offset().fix().local_minus_utc() / 60,
        }
    }

    /// Build prefetch or execute items. Each item's index is its position in `mboxes`.
    pub fn mboxes(&self, mboxes: &[MboxRequest], global: Option<&TargetParameters>) -> Mboxes {
        Mboxes {
            mboxes: mboxes
                .iter()
                .enumerate()
                .map(|(index, request)| Mbox {
                    index,
                    name: request.name.clone(),
                    parameters: merge_parameters(
                        Some(&self.context_data),
                        request.parameters.as_ref(),
                        global,
                    ),
                })
                .collect(),
        }
    }

    /// Assemble the full request.
    ///
    /// Fails with [`Error::EmptyRequest`] when there are neither mboxes nor notifications.
    pub fn build(
        &self,
        configuration: &ConfigurationSnapshot,
        ids: TargetIds,
        selection: MboxSelection,
        global: Option<&TargetParameters>,
        notifications: Vec<Notification>,
    ) -> Result<DeliveryRequest> {
        if selection.is_empty() && notifications.is_empty() {
            return Err(Error::EmptyRequest);
        }

        let (prefetch, execute) = match selection {
            MboxSelection::Prefetch(mboxes) if !mboxes.is_empty() => {
                (Some(self.mboxes(mboxes, global)), None)
            }
            MboxSelection::Execute(mboxes) if !mboxes.is_empty() => {
                (None, Some(self.mboxes(mboxes, global)))
            }
            _ => (None, None),
        };

        Ok(DeliveryRequest {
            id: ids,
            context: self.target_context(),
            experience_cloud: self.experience_cloud(),
            prefetch,
            execute,
            notifications,
            environment_id: configuration.environment_id,
            property: configuration.property_token().map(|token| Property {
                token: token.to_owned(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::context::{AuthenticatedState, StaticDeviceContext, VisitorId};

    fn opted_in() -> ConfigurationSnapshot {
        ConfigurationSnapshot::new("code_123").with_privacy(PrivacyStatus::OptedIn)
    }

    fn provider() -> StaticDeviceContext {
        StaticDeviceContext {
            device: DeviceContext {
                device_name: Some("iPhone".to_owned()),
                screen_width: 1125,
                screen_height: 2436,
                app_id: Some("com.example.app".to_owned()),
                user_agent: Some("Mozilla/5.0 (iPhone)".to_owned()),
                ..Default::default()
            },
            lifecycle: Some(HashMap::from([
                ("appid".to_owned(), "appid_1".to_owned()),
                ("osversion".to_owned(), "iOS 14.4".to_owned()),
            ])),
            identity: Some(IdentitySnapshot {
                marketing_cloud_visitor_id: Some("38209274908399841237725561727471528301".to_owned()),
                blob: Some("blob".to_owned()),
                location_hint: Some("9".to_owned()),
                visitor_ids: vec![VisitorId {
                    id: "vid_id_1".to_owned(),
                    id_type: "vid_type_1".to_owned(),
                    authenticated_state: AuthenticatedState::Unknown,
                }],
            }),
        }
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(matches!(check_configuration(None), Err(Error::ConfigurationMissing)));
        assert!(matches!(
            check_configuration(Some(&ConfigurationSnapshot::new("").with_privacy(PrivacyStatus::OptedIn))),
            Err(Error::ClientCodeEmpty)
        ));
        assert!(matches!(
            check_configuration(Some(&ConfigurationSnapshot::new("code_123"))),
            Err(Error::OptedOut)
        ));
        assert!(matches!(
            check_configuration(Some(
                &ConfigurationSnapshot::new("code_123").with_privacy(PrivacyStatus::OptedOut)
            )),
            Err(Error::OptedOut)
        ));
        assert!(check_configuration(Some(&opted_in())).is_ok());
    }

    #[test]
    fn url_host_precedence() {
        let configuration = opted_in();

        let url = delivery_url(&configuration, None, "sid").unwrap();
        assert_eq!(
            url.as_str(),
            "https://code_123.tt.omtrdc.net/rest/v1/delivery/?client=code_123&sessionId=sid"
        );

        let url = delivery_url(&configuration, Some("mboxedge35.tt.omtrdc.net"), "sid").unwrap();
        assert_eq!(url.host_str(), Some("mboxedge35.tt.omtrdc.net"));

        let url = delivery_url(&configuration, Some(""), "sid").unwrap();
        assert_eq!(url.host_str(), Some("code_123.tt.omtrdc.net"));

        let configuration = configuration.with_target_server("amsdk.tt.omtrdc.net");
        let url = delivery_url(&configuration, Some("mboxedge35.tt.omtrdc.net"), "sid").unwrap();
        assert_eq!(url.host_str(), Some("amsdk.tt.omtrdc.net"));
    }

    #[test]
    fn prefetch_items_are_indexed_in_order() {
        let context = RequestContext::capture(&provider());
        let global = TargetParameters::new().with_profile_parameter("name", "Smith");
        let mboxes = [
            MboxRequest::new("Drink_1").with_parameters(
                TargetParameters::new()
                    .with_profile_parameter("mbox-parameter-key1", "mbox-parameter-value1"),
            ),
            MboxRequest::new("Drink_2"),
        ];

        let request = context
            .build(
                &opted_in(),
                context.target_ids(None, None),
                MboxSelection::Prefetch(&mboxes),
                Some(&global),
                vec![],
            )
            .unwrap();
        let payload = serde_json::to_value(&request).unwrap();

        let items = payload["prefetch"]["mboxes"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["index"], 0);
        assert_eq!(items[0]["name"], "Drink_1");
        assert_eq!(items[1]["index"], 1);
        assert_eq!(items[1]["name"], "Drink_2");
        for item in items {
            assert_eq!(item["profileParameters"]["name"], "Smith");
            assert_eq!(item["parameters"]["a.OSVersion"], "iOS 14.4");
            assert_eq!(item["parameters"]["a.AppID"], "appid_1");
        }
        assert_eq!(
            items[0]["profileParameters"]["mbox-parameter-key1"],
            "mbox-parameter-value1"
        );
    }

    #[test]
    fn payload_contains_only_relevant_keys() {
        let context = RequestContext::capture(&provider());
        let mboxes = [MboxRequest::new("t_test_01")];

        let request = context
            .build(
                &opted_in(),
                context.target_ids(Some("tnt"), None),
                MboxSelection::Execute(&mboxes),
                None,
                vec![],
            )
            .unwrap();
        let payload = serde_json::to_value(&request).unwrap();

        let mut keys: Vec<&str> = payload.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["context", "environmentId", "execute", "experienceCloud", "id"]
        );

        let mut context_keys: Vec<&str> = payload["context"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        context_keys.sort();
        assert_eq!(
            context_keys,
            vec![
                "application",
                "channel",
                "mobilePlatform",
                "screen",
                "timeOffsetInMinutes",
                "userAgent"
            ]
        );
        assert_eq!(payload["context"]["channel"], "mobile");
        assert_eq!(payload["context"]["screen"]["colorDepth"], 32);
    }

    #[test]
    fn identity_block() {
        let context = RequestContext::capture(&provider());
        let ids = context.target_ids(Some("tnt"), Some("3p"));

        assert_eq!(
            serde_json::to_value(&ids).unwrap(),
            json!({
                "tntId": "tnt",
                "thirdPartyId": "3p",
                "marketingCloudVisitorId": "38209274908399841237725561727471528301",
                "customerIds": [{
                    "id": "vid_id_1",
                    "integrationCode": "vid_type_1",
                    "authenticatedState": "unknown",
                }],
            })
        );
        assert_eq!(
            serde_json::to_value(context.experience_cloud()).unwrap(),
            json!({
                "audienceManager": {"blob": "blob", "locationHint": "9"},
                "analytics": {"logging": "client_side"},
            })
        );
    }

    #[test]
    fn property_token_is_sent_when_configured() {
        let context = RequestContext::capture(&StaticDeviceContext::default());
        let configuration = opted_in()
            .with_property_token("prop-token")
            .with_environment_id(4455);
        let mboxes = [MboxRequest::new("mbox")];

        let request = context
            .build(
                &configuration,
                TargetIds::default(),
                MboxSelection::Prefetch(&mboxes),
                None,
                vec![],
            )
            .unwrap();
        let payload = serde_json::to_value(&request).unwrap();

        assert_eq!(payload["property"], json!({"token": "prop-token"}));
        assert_eq!(payload["environmentId"], 4455);
        // No identity data: no audience manager, no customer ids.
        assert_eq!(payload["experienceCloud"], json!({"analytics": {"logging": "client_side"}}));
        assert_eq!(payload["id"], json!({}));
    }

    #[test]
    fn empty_request_is_rejected() {
        let context = RequestContext::capture(&StaticDeviceContext::default());
        let result = context.build(
            &opted_in(),
            TargetIds::default(),
            MboxSelection::Prefetch(&[]),
            None,
            vec![],
        );
        assert!(matches!(result, Err(Error::EmptyRequest)));

        let result = context.build(&opted_in(), TargetIds::default(), MboxSelection::None, None, vec![]);
        assert!(matches!(result, Err(Error::EmptyRequest)));
    }
}
