use std::collections::HashMap;
use std::sync::Arc;

use bandconnect_messaging::{Conversation, ConversationId, MessageRepository, Signal, Subscription};
use futures::StreamExt;

use super::PresenterTasks;
use crate::users::UserDirectory;

pub const NOT_SIGNED_IN_ERROR: &str = "You need to be logged in to view conversations.";

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationsUiState {
    pub is_loading: bool,
    pub conversations: Vec<Conversation>,
    /// User id to display name.
    pub user_names: HashMap<String, String>,
    pub current_user_id: String,
    pub error_message: Option<String>,
}

impl Default for ConversationsUiState {
    fn default() -> Self {
        Self {
            is_loading: true,
            conversations: Vec::new(),
            user_names: HashMap::new(),
            current_user_id: String::new(),
            error_message: None,
        }
    }
}

impl ConversationsUiState {
    pub fn display_name(&self, user_id: &str) -> String {
        self.user_names
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| user_id.to_string())
    }
}

/// Conversation list of the signed-in user.
pub struct ConversationsPresenter {
    repository: Arc<MessageRepository>,
    state: Arc<Signal<ConversationsUiState>>,
    tasks: PresenterTasks,
}

impl ConversationsPresenter {
    /// Starts observing immediately. Must be called inside a tokio runtime.
    pub fn start(repository: Arc<MessageRepository>, directory: Arc<UserDirectory>) -> Self {
        let state = Arc::new(Signal::new(ConversationsUiState::default()));
        let tasks = PresenterTasks::default();
        tasks.push(tokio::spawn(load_conversations(
            Arc::clone(&repository),
            directory,
            Arc::clone(&state),
        )));

        Self {
            repository,
            state,
            tasks,
        }
    }

    pub fn state(&self) -> Arc<ConversationsUiState> {
        self.state.get()
    }

    pub fn subscribe(&self) -> Subscription<ConversationsUiState> {
        self.state.subscribe()
    }

    pub async fn pin_conversation(&self, conversation_id: ConversationId, is_pinned: bool) {
        self.repository
            .pin_conversation(conversation_id, is_pinned)
            .await;
    }

    pub fn stop(&self) {
        self.tasks.abort_all();
    }
}

async fn load_conversations(
    repository: Arc<MessageRepository>,
    directory: Arc<UserDirectory>,
    state: Arc<Signal<ConversationsUiState>>,
) {
    let Some(current_user) = directory.current_user() else {
        state.update(|state| {
            state.is_loading = false;
            state.error_message = Some(NOT_SIGNED_IN_ERROR.to_string());
        });
        return;
    };

    let mut users = directory.subscribe_users();
    let mut conversations = repository.conversations_for_user(current_user.id.clone());
    let mut latest_user_names = None;
    let mut latest_conversations = None;

    // Publish only once both sources have produced a value, then on every change of either.
    loop {
        tokio::select! {
            Some(snapshot) = users.next() => {
                latest_user_names = Some(
                    snapshot
                        .iter()
                        .map(|user| (user.id.clone(), user.name.clone()))
                        .collect::<HashMap<_, _>>(),
                );
            }
            Some(listing) = conversations.next() => {
                latest_conversations = Some(listing);
            }
            else => break,
        }

        if let (Some(user_names), Some(listing)) = (&latest_user_names, &latest_conversations) {
            state.update(|state| {
                state.is_loading = false;
                state.conversations = listing.clone();
                state.user_names = user_names.clone();
                state.current_user_id = current_user.id.clone();
                state.error_message = None;
            });
        }
    }

    tracing::debug!(user_id = %current_user.id, "conversation feeds closed");
}
