use std::sync::Arc;
use std::time::Duration;

use bandconnect_messaging::{
    Location, Message, MessageId, MessagePriority, MessageRepository, MessageStatus,
    MessagingResult, NewMessage, Signal, Subscription,
};
use futures::StreamExt;

use super::PresenterTasks;
use crate::users::{User, UserDirectory};

pub const NOT_SIGNED_IN_ERROR: &str = "You need to be logged in to send messages.";
pub const RECIPIENT_NOT_FOUND_ERROR: &str = "Recipient not found.";

#[derive(Debug, Clone, PartialEq)]
pub struct MessageUiState {
    pub is_loading: bool,
    pub recipient: Option<User>,
    pub messages: Vec<Message>,
    pub current_user_id: String,
    pub is_recipient_online: bool,
    pub quick_responses: Vec<String>,
    pub error_message: Option<String>,
}

impl Default for MessageUiState {
    fn default() -> Self {
        Self {
            is_loading: true,
            recipient: None,
            messages: Vec::new(),
            current_user_id: String::new(),
            is_recipient_online: false,
            quick_responses: Vec::new(),
            error_message: None,
        }
    }
}

/// Direct-message thread between the signed-in user and one recipient.
pub struct MessagePresenter {
    repository: Arc<MessageRepository>,
    directory: Arc<UserDirectory>,
    online_window: Duration,
    state: Arc<Signal<MessageUiState>>,
    tasks: PresenterTasks,
}

impl MessagePresenter {
    pub fn new(
        repository: Arc<MessageRepository>,
        directory: Arc<UserDirectory>,
        online_window: Duration,
    ) -> Self {
        Self {
            repository,
            directory,
            online_window,
            state: Arc::new(Signal::new(MessageUiState::default())),
            tasks: PresenterTasks::default(),
        }
    }

    pub fn state(&self) -> Arc<MessageUiState> {
        self.state.get()
    }

    pub fn subscribe(&self) -> Subscription<MessageUiState> {
        self.state.subscribe()
    }

    /// Opens the thread with `recipient_id`, replacing any previously opened one.
    ///
    /// Incoming messages are marked read as soon as they are observed. Band members
    /// also get their quick responses.
    pub fn init_conversation(&self, recipient_id: &str) {
        self.tasks.abort_all();

        let Some(current_user) = self.directory.current_user() else {
            self.fail(NOT_SIGNED_IN_ERROR);
            return;
        };
        let Some(recipient) = self.directory.user_by_id(recipient_id) else {
            tracing::debug!(recipient_id, "recipient lookup failed");
            self.fail(RECIPIENT_NOT_FOUND_ERROR);
            return;
        };

        let is_recipient_online = self.directory.is_online(&recipient, self.online_window);
        self.state.replace(MessageUiState {
            is_loading: true,
            recipient: Some(recipient.clone()),
            current_user_id: current_user.id.clone(),
            is_recipient_online,
            ..MessageUiState::default()
        });

        self.tasks.push(tokio::spawn(watch_thread(
            Arc::clone(&self.repository),
            Arc::clone(&self.state),
            current_user.id.clone(),
            recipient.id,
        )));
        if current_user.is_band_member() {
            self.tasks.push(tokio::spawn(watch_quick_responses(
                Arc::clone(&self.repository),
                Arc::clone(&self.state),
                current_user.id,
            )));
        }

        self.state.update(|state| state.is_loading = false);
    }

    /// Sends `content` to the open thread's recipient.
    ///
    /// Returns `Ok(None)` when there is nothing to send: blank content, nobody signed
    /// in, or no thread opened yet.
    pub async fn send_message(
        &self,
        content: &str,
        location: Option<Location>,
    ) -> MessagingResult<Option<Message>> {
        self.send(NewMessageDraft {
            content: content.to_string(),
            location,
            is_quick_response: false,
        })
        .await
    }

    /// Sends the quick response at `index`; out-of-range indices are ignored.
    pub async fn send_quick_response(&self, index: usize) -> MessagingResult<Option<Message>> {
        let Some(content) = self.state.get().quick_responses.get(index).cloned() else {
            tracing::debug!(index, "quick response index out of range");
            return Ok(None);
        };

        self.send(NewMessageDraft {
            content,
            location: None,
            is_quick_response: true,
        })
        .await
    }

    pub fn stop(&self) {
        self.tasks.abort_all();
    }

    async fn send(&self, draft: NewMessageDraft) -> MessagingResult<Option<Message>> {
        if draft.content.trim().is_empty() {
            return Ok(None);
        }
        let Some(current_user) = self.directory.current_user() else {
            return Ok(None);
        };
        let Some(recipient_id) = self
            .state
            .get()
            .recipient
            .as_ref()
            .map(|recipient| recipient.id.clone())
        else {
            return Ok(None);
        };

        let priority = if current_user.is_band_member() {
            MessagePriority::High
        } else {
            MessagePriority::Normal
        };

        let mut input = NewMessage::new(current_user.id.as_str(), recipient_id, draft.content)
            .with_priority(priority);
        if let Some(location) = draft.location {
            input = input.with_location(location);
        }
        if draft.is_quick_response {
            input = input.as_quick_response();
        }

        let message = self.repository.send_message(input).await?;
        self.directory.touch(&current_user.id).await;
        Ok(Some(message))
    }

    fn fail(&self, error_message: &str) {
        self.state.update(|state| {
            state.is_loading = false;
            state.error_message = Some(error_message.to_string());
        });
    }
}

struct NewMessageDraft {
    content: String,
    location: Option<Location>,
    is_quick_response: bool,
}

async fn watch_thread(
    repository: Arc<MessageRepository>,
    state: Arc<Signal<MessageUiState>>,
    current_user_id: String,
    recipient_id: String,
) {
    let mut thread = repository.messages_with_user(current_user_id.clone(), recipient_id);

    while let Some(messages) = thread.next().await {
        let unread = messages
            .iter()
            .filter(|message| {
                message.receiver_id == current_user_id && message.status != MessageStatus::Read
            })
            .map(|message| message.id)
            .collect::<Vec<MessageId>>();

        state.update(|state| state.messages = messages);

        for message_id in unread {
            repository.mark_message_as_read(message_id).await;
        }
    }
}

async fn watch_quick_responses(
    repository: Arc<MessageRepository>,
    state: Arc<Signal<MessageUiState>>,
    band_member_id: String,
) {
    let mut live = repository.quick_responses_for_band_member(band_member_id);

    while let Some(responses) = live.next().await {
        state.update(|state| {
            state.quick_responses = responses
                .into_iter()
                .map(|response| response.content)
                .collect();
        });
    }
}

#[cfg(test)]
mod tests {
    use bandconnect_messaging::NewMessage;

    use super::*;
    use crate::presenter::test_support::{fixtures, wait_for};
    use crate::settings::DEFAULT_ONLINE_WINDOW_SECONDS;

    fn window() -> Duration {
        Duration::from_secs(DEFAULT_ONLINE_WINDOW_SECONDS)
    }

    #[tokio::test]
    async fn init_requires_sign_in_and_known_recipient() {
        let (_, repository, directory) = fixtures();
        let presenter = MessagePresenter::new(repository, Arc::clone(&directory), window());

        presenter.init_conversation("user2");
        assert_eq!(
            presenter.state().error_message.as_deref(),
            Some(NOT_SIGNED_IN_ERROR)
        );
        assert!(!presenter.state().is_loading);

        directory.login("john@example.com").await.expect("seeded account");
        presenter.init_conversation("ghost");
        assert_eq!(
            presenter.state().error_message.as_deref(),
            Some(RECIPIENT_NOT_FOUND_ERROR)
        );
    }

    #[tokio::test]
    async fn band_member_sends_high_priority_and_sees_quick_responses() {
        let (_, repository, directory) = fixtures();
        directory.login("john@example.com").await.expect("seeded account");
        let presenter =
            MessagePresenter::new(Arc::clone(&repository), Arc::clone(&directory), window());
        let mut states = presenter.subscribe();

        presenter.init_conversation("fan1");
        let ready = wait_for(&mut states, |state| state.quick_responses.len() == 2).await;
        assert_eq!(ready.current_user_id, "user1");
        assert!(ready.is_recipient_online);
        assert!(ready.error_message.is_none());

        let sent = presenter
            .send_message("see you at the show", None)
            .await
            .expect("send succeeds")
            .expect("message was sent");
        assert_eq!(sent.priority, MessagePriority::High);
        assert_eq!(sent.receiver_id, "fan1");

        let quick = presenter
            .send_quick_response(1)
            .await
            .expect("send succeeds")
            .expect("index in range");
        assert!(quick.is_quick_response);
        assert_eq!(
            quick.content,
            "We'll be in your city soon! Keep an eye on our tour dates."
        );

        assert!(
            presenter
                .send_quick_response(9)
                .await
                .expect("no error")
                .is_none()
        );
        assert!(presenter.send_message("   ", None).await.expect("no error").is_none());

        let thread = wait_for(&mut states, |state| state.messages.len() == 2).await;
        assert_eq!(thread.messages[0].content, "see you at the show");
    }

    #[tokio::test]
    async fn fan_sends_normal_priority_without_quick_responses() {
        let (_, repository, directory) = fixtures();
        directory.login("riley@example.com").await.expect("seeded fan");
        let presenter =
            MessagePresenter::new(Arc::clone(&repository), Arc::clone(&directory), window());

        presenter.init_conversation("user1");
        let sent = presenter
            .send_message("big fan!", None)
            .await
            .expect("send succeeds")
            .expect("message was sent");
        assert_eq!(sent.priority, MessagePriority::Normal);
        assert!(presenter.state().quick_responses.is_empty());
    }

    #[tokio::test]
    async fn incoming_messages_are_marked_read_once_observed() {
        let (_, repository, directory) = fixtures();
        directory.login("john@example.com").await.expect("seeded account");
        let incoming = repository
            .send_message(NewMessage::new("fan1", "user1", "hello from the front row"))
            .await
            .expect("send");
        let outgoing = repository
            .send_message(NewMessage::new("user1", "fan1", "thanks!"))
            .await
            .expect("send");

        let presenter =
            MessagePresenter::new(Arc::clone(&repository), Arc::clone(&directory), window());
        let mut states = presenter.subscribe();
        presenter.init_conversation("fan1");

        wait_for(&mut states, |state| {
            state
                .messages
                .iter()
                .any(|message| message.id == incoming.id && message.status == MessageStatus::Read)
        })
        .await;

        assert_eq!(
            repository.find_message(incoming.id).map(|message| message.status),
            Some(MessageStatus::Read)
        );
        // Messages sent by the signed-in user stay untouched.
        assert_eq!(
            repository.find_message(outgoing.id).map(|message| message.status),
            Some(MessageStatus::Sent)
        );
    }
}
