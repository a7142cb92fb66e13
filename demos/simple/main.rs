use std::collections::HashMap;

use target_delivery::{
    ClientConfig, ConfigurationSnapshot, DeviceContext, IntakeThread, MboxRequest, PrivacyStatus,
    StaticDeviceContext, TargetEvent, TargetParameters, TargetRequest,
};

pub fn main() -> target_delivery::Result<()> {
    // Configure env_logger to see SDK logs.
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("target_delivery"))
        .init();

    let client_code = std::env::var("TARGET_CLIENT_CODE")
        .expect("TARGET_CLIENT_CODE env variable should contain the client code");

    let client = ClientConfig::new()
        .configuration(ConfigurationSnapshot::new(client_code).with_privacy(PrivacyStatus::OptedIn))
        .device_context(StaticDeviceContext {
            device: DeviceContext {
                device_name: Some("demo".to_owned()),
                app_id: Some("com.example.demo".to_owned()),
                app_version: Some(env!("CARGO_PKG_VERSION").to_owned()),
                screen_width: 1125,
                screen_height: 2436,
                ..Default::default()
            },
            lifecycle: Some(HashMap::from([("locale".to_owned(), "en-US".to_owned())])),
            identity: None,
        })
        .event_sink(|event: TargetEvent| match event {
            TargetEvent::Response { kind, result } => match result {
                Ok(delta) => println!("{:?}: {}", kind, serde_json::to_string_pretty(&delta).unwrap()),
                Err(err) => println!("{:?} failed: {}", kind, err),
            },
            other => println!("{:?}", other),
        })
        .to_client();

    // Requests are processed one at a time on a background thread.
    let intake = IntakeThread::start(client)?;

    intake.submit(TargetRequest::Prefetch {
        mboxes: vec![MboxRequest::new("Drink_1"), MboxRequest::new("Drink_2")],
        parameters: Some(TargetParameters::new().with_profile_parameter("name", "Smith")),
    })?;
    intake.submit(TargetRequest::LocationsDisplayed {
        names: vec!["Drink_1".to_owned()],
        parameters: None,
    })?;
    intake.submit(TargetRequest::GetIdentifiers)?;

    // Wait for queued requests to finish.
    intake.shutdown()
}
