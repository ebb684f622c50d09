use serde::{Deserialize, Serialize};

use super::ids::{ConversationId, MessageId, QuickResponseId};

/// Delivery status. Variants are ordered so a status can only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    /// Returns the later of the two statuses.
    pub fn advance_to(self, next: MessageStatus) -> MessageStatus {
        self.max(next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessagePriority {
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
    pub captured_at_unix_millis: u64,
}

impl Location {
    pub fn new(
        latitude: f64,
        longitude: f64,
        location_name: impl Into<String>,
        captured_at_unix_millis: u64,
    ) -> Self {
        Self {
            latitude,
            longitude,
            location_name: location_name.into(),
            captured_at_unix_millis,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub sent_at_unix_millis: u64,
    pub status: MessageStatus,
    pub attached_location: Option<Location>,
    pub image_url: Option<String>,
    pub priority: MessagePriority,
    pub is_quick_response: bool,
}

impl Message {
    /// True when the message travels between `user_id` and `other_user_id`, in either direction.
    pub fn is_between(&self, user_id: &str, other_user_id: &str) -> bool {
        (self.sender_id == user_id && self.receiver_id == other_user_id)
            || (self.sender_id == other_user_id && self.receiver_id == user_id)
    }
}

/// Input for [`crate::MessageRepository::send_message`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub location: Option<Location>,
    pub image_url: Option<String>,
    pub priority: MessagePriority,
    pub is_quick_response: bool,
}

impl NewMessage {
    pub fn new(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            content: content.into(),
            location: None,
            image_url: None,
            priority: MessagePriority::Normal,
            is_quick_response: false,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn as_quick_response(mut self) -> Self {
        self.is_quick_response = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    /// Canonical (sorted) participant pair.
    pub participants: [String; 2],
    pub last_message: Option<Message>,
    pub last_updated_unix_millis: u64,
    pub unread_count: u32,
    pub is_pinned: bool,
}

impl Conversation {
    pub fn includes(&self, user_id: &str) -> bool {
        self.participants.iter().any(|participant| participant == user_id)
    }

    /// True when `message` was exchanged between this conversation's participants.
    pub fn contains_message(&self, message: &Message) -> bool {
        self.includes(&message.sender_id) && self.includes(&message.receiver_id)
    }

    /// The participant other than `user_id`, if `user_id` takes part at all.
    pub fn counterpart_of(&self, user_id: &str) -> Option<&str> {
        match &self.participants {
            [first, second] if first == user_id => Some(second.as_str()),
            [first, second] if second == user_id => Some(first.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickResponse {
    pub id: QuickResponseId,
    pub band_member_id: String,
    pub content: String,
    pub category: String,
}

impl QuickResponse {
    pub fn new(
        band_member_id: impl Into<String>,
        content: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: QuickResponseId::random(),
            band_member_id: band_member_id.into(),
            content: content.into(),
            category: category.into(),
        }
    }
}
