//! Client-side core of a Target delivery SDK.
//!
//! # Overview
//!
//! A [`TargetClient`] keeps the visitor's session and identity state (tnt id, third-party id, edge
//! host, session id), builds delivery API requests from configuration, device context and caller
//! parameters, sends them through a [`Transport`], and reconciles responses back into its state and
//! its local [`ContentCache`].
//!
//! Requests from the host are expressed as [`TargetRequest`]s. Outcomes and identity changes are
//! published as [`TargetEvent`]s to an [`EventSink`]. The client processes one request at a time;
//! [`IntakeThread`] runs it on a background thread fed by a bounded queue.
//!
//! Mboxes returned by prefetch calls are cached and can later be reported as displayed. Mboxes
//! returned by execute calls are kept only for click tracking.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum, and [`Error::kind`] classifies them. None of them
//! are fatal: the client remains usable after any error. Application errors reported by the service
//! still update the tnt id and edge host; transport and parse failures leave state untouched.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages, under
//! the `target_delivery` target. Consider integrating a `log`-compatible logger implementation for
//! better visibility into SDK operations.
//!
//! # Examples
//!
//! ```no_run
//! # use target_delivery::{
//! #     ClientConfig, ConfigurationSnapshot, MboxRequest, PrivacyStatus, TargetEvent, TargetParameters,
//! # };
//! let mut client = ClientConfig::new()
//!     .configuration(ConfigurationSnapshot::new("code_123").with_privacy(PrivacyStatus::OptedIn))
//!     .event_sink(|event: TargetEvent| println!("{:?}", event))
//!     .to_client();
//!
//! client.prefetch(
//!     &[MboxRequest::new("Drink_1"), MboxRequest::new("Drink_2")],
//!     Some(&TargetParameters::new().with_profile_parameter("name", "Smith")),
//! )?;
//! client.locations_displayed(&["Drink_1".to_owned()], None)?;
//! # Ok::<(), target_delivery::Error>(())
//! ```

#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod cache;
mod client;
mod config;
mod configuration;
mod context;
pub mod delivery;
mod error;
mod events;
mod intake;
mod notifications;
mod params;
mod request_builder;
mod response;
mod session;
mod store;
mod transport;

pub use cache::{ContentCache, MboxJson};
pub use client::{TargetClient, TargetRequest};
pub use config::ClientConfig;
pub use configuration::{ConfigurationSnapshot, PrivacyStatus};
pub use context::{
    lifecycle_context_data, AuthenticatedState, DeviceContext, DeviceContextProvider, DeviceType,
    IdentitySnapshot, Orientation, PlatformType, StaticDeviceContext, VisitorId,
};
pub use error::{Error, ErrorKind, Result};
pub use events::{ContentDelta, EventSink, IdentityState, RequestKind, TargetEvent};
pub use intake::IntakeThread;
pub use notifications::NotificationBuffer;
pub use params::{
    merge_maps, merge_order, merge_parameters, merge_product, TargetOrder, TargetParameters,
    TargetProduct,
};
pub use request_builder::{delivery_url, MboxRequest};
pub use response::DeliveryResponse;
pub use session::SessionStore;
pub use store::{InMemoryStore, KeyValueStore};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
