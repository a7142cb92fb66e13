//! Buffer of display and click notifications waiting for the next outbound request.
use serde_json::Value;
use uuid::Uuid;

use crate::{
    cache::{MboxJson, EVENT_TOKEN, METRICS, OPTIONS, STATE, TYPE},
    delivery::{Notification, NotificationMbox, NotificationType},
    params::TargetParameters,
};

const CLICK_METRIC_TYPE: &str = "click";

/// Notifications accumulated since the last dispatch.
#[derive(Debug, Default)]
pub struct NotificationBuffer {
    notifications: Vec<Notification>,
}

impl NotificationBuffer {
    /// Create an empty buffer.
    pub fn new() -> NotificationBuffer {
        NotificationBuffer::default()
    }

    /// Build and buffer a display notification for the prefetched mbox `name`.
    ///
    /// Returns `None` and buffers nothing if the cached mbox has no state or no option event
    /// tokens.
    pub fn add_display(
        &mut self,
        name: &str,
        cached: &MboxJson,
        parameters: TargetParameters,
        timestamp: i64,
    ) -> Option<&Notification> {
        let Some(state) = cached.get(STATE).and_then(Value::as_str).filter(|s| !s.is_empty()) else {
            log::debug!(target: "target_delivery", mbox_name = name;
                        "unable to create display notification, mbox state is invalid");
            return None;
        };

        let tokens = display_tokens(cached);
        if tokens.is_empty() {
            log::debug!(target: "target_delivery", mbox_name = name;
                        "unable to create display notification, no event tokens");
            return None;
        }

        self.push(Notification {
            id: Uuid::new_v4().to_string(),
            timestamp,
            notification_type: NotificationType::Display,
            mbox: NotificationMbox {
                name: name.to_owned(),
                state: Some(state.to_owned()),
            },
            tokens,
            parameters,
        })
    }

    /// Build and buffer a click notification for the cached mbox `name`.
    ///
    /// Returns `None` and buffers nothing if the cached mbox has no click metric with an event
    /// token.
    pub fn add_click(
        &mut self,
        name: &str,
        cached: &MboxJson,
        parameters: TargetParameters,
        timestamp: i64,
    ) -> Option<&Notification> {
        let tokens = click_tokens(cached);
        if tokens.is_empty() {
            log::warn!(target: "target_delivery", mbox_name = name;
                       "unable to create click notification, no click metric tokens");
            return None;
        }

        self.push(Notification {
            id: Uuid::new_v4().to_string(),
            timestamp,
            notification_type: NotificationType::Click,
            mbox: NotificationMbox {
                name: name.to_owned(),
                state: None,
            },
            tokens,
            parameters,
        })
    }

    /// Take all buffered notifications, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Return `true` if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    /// Number of buffered notifications.
    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    /// Drop all buffered notifications.
    pub(crate) fn clear(&mut self) {
        self.notifications.clear();
    }

    fn push(&mut self, notification: Notification) -> Option<&Notification> {
        self.notifications.push(notification);
        self.notifications.last()
    }
}

fn display_tokens(cached: &MboxJson) -> Vec<String> {
    cached
        .get(OPTIONS)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|option| option.get(EVENT_TOKEN)?.as_str())
        .map(str::to_owned)
        .collect()
}

fn click_tokens(cached: &MboxJson) -> Vec<String> {
    cached
        .get(METRICS)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|metric| metric.get(TYPE).and_then(Value::as_str) == Some(CLICK_METRIC_TYPE))
        .filter_map(|metric| metric.get(EVENT_TOKEN)?.as_str())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::NotificationBuffer;
    use crate::{cache::MboxJson, delivery::NotificationType, params::TargetParameters};

    fn mbox(value: serde_json::Value) -> MboxJson {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn display_notification_uses_option_tokens() {
        let mut buffer = NotificationBuffer::new();
        let cached = mbox(json!({
            "name": "mbox1",
            "state": "state1",
            "options": [{"content": "content1", "type": "html", "eventToken": "tok1"}],
        }));

        let notification = buffer
            .add_display("mbox1", &cached, TargetParameters::new(), 1_615_436_587_000)
            .unwrap();

        assert_eq!(notification.notification_type, NotificationType::Display);
        assert_eq!(notification.tokens, vec!["tok1".to_owned()]);
        assert_eq!(notification.mbox.name, "mbox1");
        assert_eq!(notification.mbox.state.as_deref(), Some("state1"));
        assert_eq!(notification.timestamp, 1_615_436_587_000);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn display_without_tokens_is_dropped() {
        let mut buffer = NotificationBuffer::new();
        let cached = mbox(json!({
            "name": "mbox1",
            "state": "state1",
            "options": [{"content": "content1", "type": "html"}],
        }));

        assert!(buffer
            .add_display("mbox1", &cached, TargetParameters::new(), 0)
            .is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn display_without_state_is_dropped() {
        let mut buffer = NotificationBuffer::new();
        let cached = mbox(json!({
            "name": "mbox1",
            "options": [{"eventToken": "tok1"}],
        }));

        assert!(buffer
            .add_display("mbox1", &cached, TargetParameters::new(), 0)
            .is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn click_notification_uses_click_metrics_only() {
        let mut buffer = NotificationBuffer::new();
        let cached = mbox(json!({
            "name": "mbox1",
            "metrics": [
                {"type": "click", "eventToken": "click-tok"},
                {"type": "display", "eventToken": "display-tok"},
                {"type": "click", "eventToken": ""},
            ],
        }));

        let notification = buffer
            .add_click("mbox1", &cached, TargetParameters::new(), 0)
            .unwrap();

        assert_eq!(notification.notification_type, NotificationType::Click);
        assert_eq!(notification.tokens, vec!["click-tok".to_owned()]);
        assert_eq!(notification.mbox.state, None);
    }

    #[test]
    fn click_without_metrics_is_dropped() {
        let mut buffer = NotificationBuffer::new();
        let cached = mbox(json!({"name": "mbox1"}));

        assert!(buffer
            .add_click("mbox1", &cached, TargetParameters::new(), 0)
            .is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn drain_empties_buffer() {
        let mut buffer = NotificationBuffer::new();
        let cached = mbox(json!({"state": "s", "options": [{"eventToken": "a"}, {"eventToken": "b"}]}));
        buffer.add_display("m1", &cached, TargetParameters::new(), 0);
        buffer.add_display("m2", &cached, TargetParameters::new(), 0);

        let drained = buffer.drain();

        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].tokens, vec!["a".to_owned(), "b".to_owned()]);
        assert_ne!(drained[0].id, drained[1].id);
        assert!(buffer.is_empty());
    }
}
