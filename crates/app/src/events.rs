//! Band events and fan registrations.
//!
//! Registration is a check-and-insert under the registry's writer lock, so
//! concurrent sign-ups never push an event past its capacity.

use std::collections::BTreeSet;
use std::sync::Arc;

use bandconnect_messaging::{Clock, Signal, Subscription};
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, Snafu, ensure};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    #[default]
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub starts_at_unix_millis: u64,
    pub location: String,
    pub band_id: String,
    pub max_capacity: u32,
    pub image_url: Option<String>,
    pub status: EventStatus,
    pub registered_users: BTreeSet<String>,
    pub created_at_unix_millis: u64,
}

impl Event {
    pub fn current_registrations(&self) -> u32 {
        u32::try_from(self.registered_users.len()).unwrap_or(u32::MAX)
    }

    pub fn is_full(&self) -> bool {
        self.current_registrations() >= self.max_capacity
    }

    pub fn is_registered(&self, user_id: &str) -> bool {
        self.registered_users.contains(user_id)
    }
}

/// Input for [`EventRegistry::create_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub starts_at_unix_millis: u64,
    pub location: String,
    pub band_id: String,
    pub max_capacity: u32,
    pub image_url: Option<String>,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EventError {
    #[snafu(display("invalid event input on `{stage}`: {field} must not be blank"))]
    InvalidEvent {
        stage: &'static str,
        field: &'static str,
    },
    #[snafu(display("unknown event `{event_id}` on `{stage}`"))]
    UnknownEvent {
        stage: &'static str,
        event_id: String,
    },
    #[snafu(display("event `{event_id}` is full ({max_capacity} places)"))]
    EventFull { event_id: String, max_capacity: u32 },
}

pub struct EventRegistry {
    events: Signal<Vec<Event>>,
    writer: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl EventRegistry {
    pub fn new(clock: Arc<dyn Clock>, events: Vec<Event>) -> Self {
        Self {
            events: Signal::new(events),
            writer: Mutex::new(()),
            clock,
        }
    }

    pub fn events(&self) -> Arc<Vec<Event>> {
        self.events.get()
    }

    pub fn subscribe_events(&self) -> Subscription<Vec<Event>> {
        self.events.subscribe()
    }

    pub fn event_by_id(&self, event_id: &str) -> Option<Event> {
        self.events
            .get()
            .iter()
            .find(|event| event.id == event_id)
            .cloned()
    }

    /// Events hosted by one band member, soonest first.
    pub fn events_for_band(&self, band_id: &str) -> Vec<Event> {
        let mut hosted = self
            .events
            .get()
            .iter()
            .filter(|event| event.band_id == band_id)
            .cloned()
            .collect::<Vec<_>>();
        hosted.sort_by_key(|event| event.starts_at_unix_millis);
        hosted
    }

    pub async fn create_event(&self, input: NewEvent) -> Result<Event, EventError> {
        ensure!(
            !input.title.trim().is_empty(),
            InvalidEventSnafu {
                stage: "create-event",
                field: "title",
            }
        );
        ensure!(
            !input.band_id.trim().is_empty(),
            InvalidEventSnafu {
                stage: "create-event",
                field: "band_id",
            }
        );

        let _writer = self.writer.lock().await;

        let event = Event {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title.trim().to_string(),
            description: input.description,
            starts_at_unix_millis: input.starts_at_unix_millis,
            location: input.location,
            band_id: input.band_id,
            max_capacity: input.max_capacity,
            image_url: input.image_url,
            status: EventStatus::Upcoming,
            registered_users: BTreeSet::new(),
            created_at_unix_millis: self.clock.now_unix_millis(),
        };
        self.events.update(|events| events.push(event.clone()));

        tracing::debug!(event_id = %event.id, band_id = %event.band_id, "event created");
        Ok(event)
    }

    /// Registers `user_id` for an event. Registering again returns the event
    /// unchanged; a full event rejects new users.
    pub async fn register_for_event(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<Event, EventError> {
        ensure!(
            !user_id.trim().is_empty(),
            InvalidEventSnafu {
                stage: "register-for-event",
                field: "user_id",
            }
        );

        let _writer = self.writer.lock().await;

        let event = self.event_by_id(event_id).context(UnknownEventSnafu {
            stage: "register-for-event",
            event_id,
        })?;
        if event.is_registered(user_id) {
            return Ok(event);
        }
        ensure!(
            !event.is_full(),
            EventFullSnafu {
                event_id,
                max_capacity: event.max_capacity,
            }
        );

        let events = self.events.update(|events| {
            if let Some(event) = events.iter_mut().find(|event| event.id == event_id) {
                event.registered_users.insert(user_id.to_string());
            }
        });

        tracing::debug!(event_id, user_id, "registered for event");
        events
            .iter()
            .find(|event| event.id == event_id)
            .cloned()
            .context(UnknownEventSnafu {
                stage: "register-for-event",
                event_id,
            })
    }

    pub async fn update_event_status(
        &self,
        event_id: &str,
        status: EventStatus,
    ) -> Result<Event, EventError> {
        let _writer = self.writer.lock().await;

        let event = self.event_by_id(event_id).context(UnknownEventSnafu {
            stage: "update-event-status",
            event_id,
        })?;
        if event.status == status {
            return Ok(event);
        }

        self.events.update(|events| {
            if let Some(event) = events.iter_mut().find(|event| event.id == event_id) {
                event.status = status;
            }
        });

        tracing::debug!(event_id, ?status, "event status changed");
        Ok(Event { status, ..event })
    }
}

#[cfg(test)]
mod tests {
    use bandconnect_messaging::ManualClock;

    use super::*;

    fn registry() -> EventRegistry {
        EventRegistry::new(Arc::new(ManualClock::starting_at(5_000)), Vec::new())
    }

    fn gig(max_capacity: u32) -> NewEvent {
        NewEvent {
            title: "Basement show".to_string(),
            description: "Acoustic set".to_string(),
            starts_at_unix_millis: 9_000,
            location: "The Cavern".to_string(),
            band_id: "user1".to_string(),
            max_capacity,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn registration_stops_at_capacity() {
        let registry = registry();
        let event = registry.create_event(gig(2)).await.expect("event");
        assert_eq!(event.created_at_unix_millis, 5_000);
        assert_eq!(event.status, EventStatus::Upcoming);

        registry
            .register_for_event(&event.id, "fan1")
            .await
            .expect("first seat");
        let full = registry
            .register_for_event(&event.id, "fan2")
            .await
            .expect("second seat");
        assert_eq!(full.current_registrations(), 2);
        assert!(full.is_full());

        let error = registry
            .register_for_event(&event.id, "fan3")
            .await
            .expect_err("no seats left");
        assert!(matches!(error, EventError::EventFull { max_capacity: 2, .. }));
        assert!(
            !registry
                .event_by_id(&event.id)
                .is_some_and(|event| event.is_registered("fan3"))
        );
    }

    #[tokio::test]
    async fn repeat_registration_is_a_no_op() {
        let registry = registry();
        let event = registry.create_event(gig(1)).await.expect("event");
        registry
            .register_for_event(&event.id, "fan1")
            .await
            .expect("seat");

        let mut updates = registry.subscribe_events();
        let _ = updates.recv().await;
        let again = registry
            .register_for_event(&event.id, "fan1")
            .await
            .expect("already registered on a full event");
        assert_eq!(again.current_registrations(), 1);
        assert!(updates.try_recv().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_never_overbook() {
        let registry = Arc::new(registry());
        let event = registry.create_event(gig(5)).await.expect("event");

        let mut handles = Vec::new();
        for index in 0..20 {
            let registry = Arc::clone(&registry);
            let event_id = event.id.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .register_for_event(&event_id, &format!("fan{index}"))
                    .await
                    .is_ok()
            }));
        }
        let mut accepted = 0;
        for handle in handles {
            if handle.await.expect("task joins") {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 5);
        assert_eq!(
            registry
                .event_by_id(&event.id)
                .map(|event| event.current_registrations()),
            Some(5)
        );
    }

    #[tokio::test]
    async fn unknown_and_blank_inputs_are_rejected() {
        let registry = registry();
        let error = registry
            .register_for_event("missing", "fan1")
            .await
            .expect_err("unknown event");
        assert!(matches!(error, EventError::UnknownEvent { .. }));

        let mut untitled = gig(10);
        untitled.title = "  ".to_string();
        let error = registry
            .create_event(untitled)
            .await
            .expect_err("blank title");
        assert!(matches!(error, EventError::InvalidEvent { field: "title", .. }));

        let error = registry
            .update_event_status("missing", EventStatus::Cancelled)
            .await
            .expect_err("unknown event");
        assert!(matches!(error, EventError::UnknownEvent { .. }));
        assert!(registry.events().is_empty());
    }

    #[tokio::test]
    async fn status_changes_and_band_listing() {
        let registry = registry();
        let later = registry.create_event(gig(10)).await.expect("event");
        let mut earlier_input = gig(10);
        earlier_input.starts_at_unix_millis = 7_000;
        let earlier = registry.create_event(earlier_input).await.expect("event");
        let mut elsewhere = gig(10);
        elsewhere.band_id = "user2".to_string();
        registry.create_event(elsewhere).await.expect("event");

        let ids = registry
            .events_for_band("user1")
            .into_iter()
            .map(|event| event.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![earlier.id.clone(), later.id.clone()]);

        let cancelled = registry
            .update_event_status(&later.id, EventStatus::Cancelled)
            .await
            .expect("status update");
        assert_eq!(cancelled.status, EventStatus::Cancelled);
        assert_eq!(
            registry.event_by_id(&later.id).map(|event| event.status),
            Some(EventStatus::Cancelled)
        );
    }
}
