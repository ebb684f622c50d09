//! Demo accounts and canned replies used when `seed_sample_data` is on.

use std::collections::BTreeSet;

use bandconnect_messaging::QuickResponse;

use crate::events::{Event, EventStatus};
use crate::users::{User, UserRole};

const DAY_MILLIS: u64 = 24 * 60 * 60 * 1000;

pub fn sample_users(now_unix_millis: u64) -> Vec<User> {
    let band_member = |id: &str, username: &str, email: &str, name: &str, band_name: &str| User {
        id: id.to_string(),
        username: username.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        role: UserRole::BandMember,
        band_name: Some(band_name.to_string()),
        last_active_unix_millis: now_unix_millis,
        following: Vec::new(),
        followers: Vec::new(),
    };

    vec![
        band_member(
            "user1",
            "johnlennon",
            "john@example.com",
            "John Lennon",
            "The Beatles",
        ),
        band_member(
            "user2",
            "paulmccartney",
            "paul@example.com",
            "Paul McCartney",
            "The Beatles",
        ),
        band_member(
            "user3",
            "davegrohl",
            "dave@example.com",
            "Dave Grohl",
            "Foo Fighters",
        ),
        band_member(
            "user4",
            "taylorswift",
            "taylor@example.com",
            "Taylor Swift",
            "Taylor Swift",
        ),
        band_member(
            "user5",
            "billie",
            "billie@example.com",
            "Billie Eilish",
            "Billie Eilish",
        ),
        User {
            id: "fan1".to_string(),
            username: "riley".to_string(),
            email: "riley@example.com".to_string(),
            name: "Riley Fan".to_string(),
            role: UserRole::Fan,
            band_name: None,
            last_active_unix_millis: now_unix_millis,
            following: Vec::new(),
            followers: Vec::new(),
        },
    ]
}

pub fn sample_quick_responses() -> Vec<QuickResponse> {
    vec![
        QuickResponse::new(
            "user1",
            "Thanks for reaching out! I appreciate your support.",
            "General",
        ),
        QuickResponse::new(
            "user1",
            "We'll be in your city soon! Keep an eye on our tour dates.",
            "Events",
        ),
        QuickResponse::new("user2", "I'm glad you enjoyed our latest album!", "Music"),
        QuickResponse::new("user3", "That's awesome to hear! Rock on!", "Feedback"),
        QuickResponse::new(
            "user4",
            "I'm working on new music right now - can't wait to share it!",
            "Updates",
        ),
    ]
}

pub fn sample_events(now_unix_millis: u64) -> Vec<Event> {
    let show = |id: &str, title: &str, band_id: &str, days_out: u64, max_capacity: u32| Event {
        id: id.to_string(),
        title: title.to_string(),
        description: String::new(),
        starts_at_unix_millis: now_unix_millis + days_out * DAY_MILLIS,
        location: "Liverpool".to_string(),
        band_id: band_id.to_string(),
        max_capacity,
        image_url: None,
        status: EventStatus::Upcoming,
        registered_users: BTreeSet::new(),
        created_at_unix_millis: now_unix_millis,
    };

    vec![
        show("event1", "Cavern Club reunion night", "user1", 14, 150),
        show("event2", "Acoustic meet and greet", "user1", 30, 20),
        show("event3", "Studio listening session", "user3", 7, 12),
    ]
}
