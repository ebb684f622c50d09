mod conversation;
mod query;
mod quick_response;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use conversation::{canonical_pair, sort_chronologically, sort_for_listing};
pub use query::Projection;

use crate::clock::{Clock, SystemClock};
use crate::error::{MessagingResult, ensure_present};
use crate::ids::{ConversationId, MessageId};
use crate::signal::Signal;
use crate::types::{Conversation, Message, MessageStatus, NewMessage, QuickResponse};

/// Single source of truth for messages, conversations and quick responses.
///
/// Every mutation runs under one writer lock and replaces the whole affected
/// collection. Readers only ever see committed snapshots.
///
/// Message timestamps come from a logical clock: the injected [`Clock`] reading,
/// raised to the last issued timestamp when the clock steps backwards.
pub struct MessageRepository {
    messages: Arc<Signal<Vec<Message>>>,
    conversations: Arc<Signal<Vec<Conversation>>>,
    quick_responses: Arc<Signal<Vec<QuickResponse>>>,
    /// Writer lock. Holds the last issued message timestamp.
    writer: Mutex<u64>,
    clock: Arc<dyn Clock>,
}

impl Default for MessageRepository {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MessageRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_quick_responses(clock, Vec::new())
    }

    pub fn with_quick_responses(
        clock: Arc<dyn Clock>,
        quick_responses: Vec<QuickResponse>,
    ) -> Self {
        Self {
            messages: Arc::new(Signal::new(Vec::new())),
            conversations: Arc::new(Signal::new(Vec::new())),
            quick_responses: Arc::new(Signal::new(quick_responses)),
            writer: Mutex::new(0),
            clock,
        }
    }

    pub fn messages(&self) -> Arc<Vec<Message>> {
        self.messages.get()
    }

    pub fn conversations(&self) -> Arc<Vec<Conversation>> {
        self.conversations.get()
    }

    pub fn quick_responses(&self) -> Arc<Vec<QuickResponse>> {
        self.quick_responses.get()
    }

    pub fn find_message(&self, message_id: MessageId) -> Option<Message> {
        self.messages
            .get()
            .iter()
            .find(|message| message.id == message_id)
            .cloned()
    }

    pub fn find_conversation(&self, conversation_id: ConversationId) -> Option<Conversation> {
        self.conversations
            .get()
            .iter()
            .find(|conversation| conversation.id == conversation_id)
            .cloned()
    }

    pub async fn send_message(&self, input: NewMessage) -> MessagingResult<Message> {
        ensure_present(&input.sender_id, "send-message", "sender_id")?;
        ensure_present(&input.receiver_id, "send-message", "receiver_id")?;

        let mut last_issued = self.writer.lock().await;
        let sent_at_unix_millis = self.clock.now_unix_millis().max(*last_issued);
        *last_issued = sent_at_unix_millis;

        let message = Message {
            id: MessageId::random(),
            sender_id: input.sender_id,
            receiver_id: input.receiver_id,
            content: input.content,
            sent_at_unix_millis,
            status: MessageStatus::Sent,
            attached_location: input.location,
            image_url: input.image_url,
            priority: input.priority,
            is_quick_response: input.is_quick_response,
        };

        let mut messages = self.messages.get().as_ref().clone();
        messages.push(message.clone());
        self.messages.replace(messages);

        let mut conversations = self.conversations.get().as_ref().clone();
        let index = conversation::apply_message(&mut conversations, &message);
        let conversation_id = conversations[index].id;
        self.conversations.replace(conversations);

        tracing::debug!(
            message_id = %message.id,
            %conversation_id,
            sender = %message.sender_id,
            receiver = %message.receiver_id,
            "message sent"
        );
        Ok(message)
    }

    pub async fn mark_message_as_read(&self, message_id: MessageId) {
        self.advance_message_status(message_id, MessageStatus::Read)
            .await;
    }

    pub async fn mark_message_as_delivered(&self, message_id: MessageId) {
        self.advance_message_status(message_id, MessageStatus::Delivered)
            .await;
    }

    async fn advance_message_status(&self, message_id: MessageId, next: MessageStatus) {
        let _writer = self.writer.lock().await;

        let current = self.messages.get();
        let Some(index) = current.iter().position(|message| message.id == message_id) else {
            tracing::debug!(%message_id, ?next, "status update for unknown message ignored");
            return;
        };

        let advanced = current[index].status.advance_to(next);
        if advanced == current[index].status {
            return;
        }

        let mut messages = current.as_ref().clone();
        messages[index].status = advanced;
        self.messages.replace(messages);
    }

    /// Marks every message addressed to `user_id` as read, then zeroes the unread
    /// counter of `conversation_id`. Subscribers see the two commits in that order.
    ///
    /// The message update is not limited to `conversation_id`.
    pub async fn mark_all_messages_as_read(
        &self,
        conversation_id: ConversationId,
        user_id: &str,
    ) {
        let _writer = self.writer.lock().await;

        let current = self.messages.get();
        if current
            .iter()
            .any(|message| message.receiver_id == user_id && message.status != MessageStatus::Read)
        {
            let messages = current
                .iter()
                .map(|message| {
                    if message.receiver_id == user_id {
                        Message {
                            status: MessageStatus::Read,
                            ..message.clone()
                        }
                    } else {
                        message.clone()
                    }
                })
                .collect();
            self.messages.replace(messages);
        }

        let mut conversations = self.conversations.get().as_ref().clone();
        match conversations
            .iter_mut()
            .find(|conversation| conversation.id == conversation_id)
        {
            Some(conversation) => {
                conversation.unread_count = 0;
                self.conversations.replace(conversations);
            }
            None => {
                tracing::debug!(%conversation_id, "mark-all-read for unknown conversation");
            }
        }
    }

    pub async fn pin_conversation(&self, conversation_id: ConversationId, is_pinned: bool) {
        let _writer = self.writer.lock().await;

        let mut conversations = self.conversations.get().as_ref().clone();
        let Some(conversation) = conversations
            .iter_mut()
            .find(|conversation| conversation.id == conversation_id)
        else {
            tracing::debug!(%conversation_id, "pin for unknown conversation ignored");
            return;
        };

        conversation.is_pinned = is_pinned;
        self.conversations.replace(conversations);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::MessagingError;

    fn repository() -> (Arc<ManualClock>, MessageRepository) {
        let clock = Arc::new(ManualClock::starting_at(1_000));
        let repository = MessageRepository::new(clock.clone());
        (clock, repository)
    }

    #[tokio::test]
    async fn send_appends_one_message_and_one_conversation() {
        let (_, repository) = repository();

        let sent = repository
            .send_message(NewMessage::new("A", "B", "hi"))
            .await
            .expect("send succeeds");

        assert_eq!(repository.messages().len(), 1);
        assert_eq!(sent.status, MessageStatus::Sent);
        assert_eq!(sent.sent_at_unix_millis, 1_000);

        let conversations = repository.conversations();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].participants, ["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn reply_in_other_direction_reuses_conversation() {
        let (clock, repository) = repository();

        repository
            .send_message(NewMessage::new("A", "B", "hi"))
            .await
            .expect("first send");
        clock.advance(5);
        repository
            .send_message(NewMessage::new("B", "A", "hello"))
            .await
            .expect("reply");

        let conversations = repository.conversations();
        assert_eq!(conversations.len(), 1);
        let last = conversations[0].last_message.as_ref().expect("last message");
        assert_eq!(last.content, "hello");
        assert_eq!(conversations[0].last_updated_unix_millis, 1_005);
        assert_eq!(repository.messages().len(), 2);
    }

    #[tokio::test]
    async fn blank_participants_are_rejected() {
        let (_, repository) = repository();

        let error = repository
            .send_message(NewMessage::new(" ", "B", "hi"))
            .await
            .expect_err("blank sender");
        assert!(matches!(
            error,
            MessagingError::InvalidInput {
                field: "sender_id",
                ..
            }
        ));

        let error = repository
            .send_message(NewMessage::new("A", "", "hi"))
            .await
            .expect_err("blank receiver");
        assert!(matches!(
            error,
            MessagingError::InvalidInput {
                field: "receiver_id",
                ..
            }
        ));
        assert!(repository.messages().is_empty());
        assert!(repository.conversations().is_empty());
    }

    #[tokio::test]
    async fn mark_as_read_is_idempotent() {
        let (_, repository) = repository();
        let sent = repository
            .send_message(NewMessage::new("A", "B", "hi"))
            .await
            .expect("send");
        let mut updates = repository.messages.subscribe();
        let _initial = updates.recv().await;

        repository.mark_message_as_read(sent.id).await;
        assert_eq!(
            repository.find_message(sent.id).map(|message| message.status),
            Some(MessageStatus::Read)
        );
        assert!(updates.try_recv().is_some());

        repository.mark_message_as_read(sent.id).await;
        assert_eq!(
            repository.find_message(sent.id).map(|message| message.status),
            Some(MessageStatus::Read)
        );
        assert!(updates.try_recv().is_none(), "second mark must not republish");

        repository.mark_message_as_read(MessageId::random()).await;
        assert_eq!(repository.messages().len(), 1);
    }

    #[tokio::test]
    async fn delivered_never_downgrades_read() {
        let (_, repository) = repository();
        let sent = repository
            .send_message(NewMessage::new("A", "B", "hi"))
            .await
            .expect("send");

        repository.mark_message_as_delivered(sent.id).await;
        assert_eq!(
            repository.find_message(sent.id).map(|message| message.status),
            Some(MessageStatus::Delivered)
        );

        repository.mark_message_as_read(sent.id).await;
        repository.mark_message_as_delivered(sent.id).await;
        assert_eq!(
            repository.find_message(sent.id).map(|message| message.status),
            Some(MessageStatus::Read)
        );
    }

    #[tokio::test]
    async fn clock_stepping_back_keeps_timestamps_and_last_message_in_order() {
        let (clock, repository) = repository();
        clock.set(1_030);
        let newer = repository
            .send_message(NewMessage::new("A", "B", "newer"))
            .await
            .expect("first send");
        clock.set(1_010);
        let older = repository
            .send_message(NewMessage::new("B", "A", "older"))
            .await
            .expect("second send");

        assert_eq!(newer.sent_at_unix_millis, 1_030);
        assert_eq!(older.sent_at_unix_millis, 1_030);

        let conversation = repository.conversations()[0].clone();
        let newest = repository
            .messages()
            .iter()
            .max_by_key(|message| message.sent_at_unix_millis)
            .map(|message| message.sent_at_unix_millis);
        assert_eq!(Some(conversation.last_updated_unix_millis), newest);
        assert_eq!(
            conversation.last_message.map(|message| message.id),
            Some(older.id)
        );

        clock.set(1_050);
        let later = repository
            .send_message(NewMessage::new("A", "B", "later"))
            .await
            .expect("third send");
        assert_eq!(later.sent_at_unix_millis, 1_050);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn mark_all_read_publishes_messages_before_counter() {
        let (clock, repository) = repository();
        let repository = Arc::new(repository);
        for content in ["one", "two", "three"] {
            clock.advance(1);
            repository
                .send_message(NewMessage::new("B", "A", content))
                .await
                .expect("send");
        }
        let conversation_id = repository.conversations()[0].id;
        assert_eq!(repository.conversations()[0].unread_count, 3);

        let mut message_updates = repository.messages.subscribe();
        let _ = message_updates.recv().await;
        let watcher = {
            let repository = Arc::clone(&repository);
            let mut conversation_updates = repository.conversations.subscribe();
            tokio::spawn(async move {
                while let Some(snapshot) = conversation_updates.recv().await {
                    let cleared = snapshot
                        .iter()
                        .any(|entry| entry.id == conversation_id && entry.unread_count == 0);
                    if cleared {
                        return repository
                            .messages()
                            .iter()
                            .filter(|message| message.receiver_id == "A")
                            .all(|message| message.status == MessageStatus::Read);
                    }
                }
                false
            })
        };

        repository
            .mark_all_messages_as_read(conversation_id, "A")
            .await;

        let messages_were_read = tokio::time::timeout(std::time::Duration::from_secs(2), watcher)
            .await
            .expect("counter reset observed")
            .expect("watcher joins");
        assert!(messages_were_read);

        let published = message_updates.try_recv().expect("one message commit");
        assert!(
            published
                .iter()
                .all(|message| message.status == MessageStatus::Read)
        );
        assert!(message_updates.try_recv().is_none());
    }

    #[tokio::test]
    async fn mark_all_read_covers_every_thread_but_resets_one_counter() {
        let (clock, repository) = repository();
        for (sender, receiver) in [("B", "A"), ("C", "A"), ("B", "A"), ("A", "B")] {
            clock.advance(1);
            repository
                .send_message(NewMessage::new(sender, receiver, "hey"))
                .await
                .expect("send");
        }
        let with_b = repository
            .conversations()
            .iter()
            .find(|conversation| conversation.includes("B"))
            .cloned()
            .expect("A/B conversation");
        let with_c = repository
            .conversations()
            .iter()
            .find(|conversation| conversation.includes("C"))
            .cloned()
            .expect("A/C conversation");
        assert_eq!((with_b.unread_count, with_c.unread_count), (2, 1));

        repository.mark_all_messages_as_read(with_b.id, "A").await;

        for message in repository.messages().iter() {
            let expected = if message.receiver_id == "A" {
                MessageStatus::Read
            } else {
                MessageStatus::Sent
            };
            assert_eq!(
                message.status, expected,
                "{} -> {}",
                message.sender_id, message.receiver_id
            );
        }
        let counters = |id| {
            repository
                .find_conversation(id)
                .map(|conversation| conversation.unread_count)
        };
        assert_eq!(counters(with_b.id), Some(0));
        assert_eq!(counters(with_c.id), Some(1));
    }

    #[tokio::test]
    async fn pin_updates_flag_and_ignores_unknown_ids() {
        let (_, repository) = repository();
        repository
            .send_message(NewMessage::new("A", "B", "hi"))
            .await
            .expect("send");
        let conversation_id = repository.conversations()[0].id;

        repository.pin_conversation(conversation_id, true).await;
        assert!(repository.conversations()[0].is_pinned);

        repository
            .pin_conversation(ConversationId::random(), false)
            .await;
        assert!(repository.conversations()[0].is_pinned);

        repository.pin_conversation(conversation_id, false).await;
        assert!(!repository.conversations()[0].is_pinned);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sends_on_one_pair_keep_a_single_conversation() {
        let (_, repository) = repository();
        let repository = Arc::new(repository);

        let mut handles = Vec::new();
        for index in 0..32 {
            let repository = Arc::clone(&repository);
            handles.push(tokio::spawn(async move {
                let (sender, receiver) = if index % 2 == 0 { ("A", "B") } else { ("B", "A") };
                repository
                    .send_message(NewMessage::new(sender, receiver, format!("msg-{index}")))
                    .await
            }));
        }
        for handle in handles {
            handle.await.expect("task joins").expect("send succeeds");
        }

        assert_eq!(repository.messages().len(), 32);
        let conversations = repository.conversations();
        assert_eq!(conversations.len(), 1);
        // Half of the messages were addressed to "A", the first canonical participant.
        assert_eq!(conversations[0].unread_count, 16);
    }
}
