use std::cmp::Ordering;

use crate::ids::ConversationId;
use crate::types::{Conversation, Message};

/// Sorted participant pair used as the conversation identity key.
pub fn canonical_pair(sender_id: &str, receiver_id: &str) -> [String; 2] {
    let mut pair = [sender_id.to_string(), receiver_id.to_string()];
    pair.sort();
    pair
}

/// Folds a freshly sent message into the conversation index.
///
/// Returns the index of the touched conversation. The unread counter only tracks the
/// first canonical participant: it is bumped when that participant is the receiver,
/// and left alone for messages addressed to the second participant.
pub fn apply_message(conversations: &mut Vec<Conversation>, message: &Message) -> usize {
    let pair = canonical_pair(&message.sender_id, &message.receiver_id);
    let first_is_receiver = pair[0] == message.receiver_id;

    if let Some(index) = conversations
        .iter()
        .position(|conversation| same_participants(&conversation.participants, &pair))
    {
        let conversation = &mut conversations[index];
        if conversation.participants[0] == message.receiver_id {
            conversation.unread_count = conversation.unread_count.saturating_add(1);
        }
        conversation.last_message = Some(message.clone());
        conversation.last_updated_unix_millis = message.sent_at_unix_millis;
        return index;
    }

    conversations.push(Conversation {
        id: ConversationId::random(),
        participants: pair,
        last_message: Some(message.clone()),
        last_updated_unix_millis: message.sent_at_unix_millis,
        unread_count: u32::from(first_is_receiver),
        is_pinned: false,
    });
    conversations.len() - 1
}

fn same_participants(existing: &[String; 2], pair: &[String; 2]) -> bool {
    let mut existing = existing.clone();
    existing.sort();
    existing == *pair
}

/// Pinned first, then most recent activity first.
pub fn sort_for_listing(left: &Conversation, right: &Conversation) -> Ordering {
    right
        .is_pinned
        .cmp(&left.is_pinned)
        .then_with(|| {
            right
                .last_updated_unix_millis
                .cmp(&left.last_updated_unix_millis)
        })
}

/// Oldest first. Callers rely on a stable sort so equal timestamps keep send order.
pub fn sort_chronologically(left: &Message, right: &Message) -> Ordering {
    left.sent_at_unix_millis.cmp(&right.sent_at_unix_millis)
}
