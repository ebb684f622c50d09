use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;

use super::MessageRepository;
use super::conversation::{sort_chronologically, sort_for_listing};
use crate::ids::ConversationId;
use crate::types::{Conversation, Message};

/// Live view over repository state: the current projection first, then one item per
/// committed mutation of the underlying collection.
pub type Projection<T> = BoxStream<'static, Vec<T>>;

impl MessageRepository {
    pub fn conversations_for_user(&self, user_id: impl Into<String>) -> Projection<Conversation> {
        let user_id = user_id.into();
        self.conversations
            .subscribe()
            .map(move |snapshot| project_conversations_for_user(&snapshot, &user_id))
            .boxed()
    }

    pub fn conversations_for_user_snapshot(&self, user_id: &str) -> Vec<Conversation> {
        project_conversations_for_user(&self.conversations.get(), user_id)
    }

    /// Messages of one conversation. The participant pair is resolved against the
    /// conversation index each time the message list changes.
    pub fn messages_for_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Projection<Message> {
        let conversations = Arc::clone(&self.conversations);
        self.messages
            .subscribe()
            .map(move |snapshot| {
                project_messages_for_conversation(&snapshot, &conversations.get(), conversation_id)
            })
            .boxed()
    }

    pub fn messages_for_conversation_snapshot(
        &self,
        conversation_id: ConversationId,
    ) -> Vec<Message> {
        project_messages_for_conversation(
            &self.messages.get(),
            &self.conversations.get(),
            conversation_id,
        )
    }

    pub fn messages_with_user(
        &self,
        user_id: impl Into<String>,
        other_user_id: impl Into<String>,
    ) -> Projection<Message> {
        let user_id = user_id.into();
        let other_user_id = other_user_id.into();
        self.messages
            .subscribe()
            .map(move |snapshot| project_messages_between(&snapshot, &user_id, &other_user_id))
            .boxed()
    }

    pub fn messages_with_user_snapshot(&self, user_id: &str, other_user_id: &str) -> Vec<Message> {
        project_messages_between(&self.messages.get(), user_id, other_user_id)
    }
}

fn project_conversations_for_user(
    conversations: &[Conversation],
    user_id: &str,
) -> Vec<Conversation> {
    let mut visible = conversations
        .iter()
        .filter(|conversation| conversation.includes(user_id))
        .cloned()
        .collect::<Vec<_>>();
    visible.sort_by(sort_for_listing);
    visible
}

fn project_messages_for_conversation(
    messages: &[Message],
    conversations: &[Conversation],
    conversation_id: ConversationId,
) -> Vec<Message> {
    let Some(conversation) = conversations
        .iter()
        .find(|conversation| conversation.id == conversation_id)
    else {
        return Vec::new();
    };

    let mut matching = messages
        .iter()
        .filter(|message| conversation.contains_message(message))
        .cloned()
        .collect::<Vec<_>>();
    matching.sort_by(sort_chronologically);
    matching
}

fn project_messages_between(
    messages: &[Message],
    user_id: &str,
    other_user_id: &str,
) -> Vec<Message> {
    let mut matching = messages
        .iter()
        .filter(|message| message.is_between(user_id, other_user_id))
        .cloned()
        .collect::<Vec<_>>();
    matching.sort_by(sort_chronologically);
    matching
}
