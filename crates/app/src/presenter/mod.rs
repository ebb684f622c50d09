//! Screen-level presenters. Each one subscribes to the repository and the user
//! directory, folds their emissions into a UI state [`Signal`] and forwards user
//! intents back to the repository.
//!
//! [`Signal`]: bandconnect_messaging::Signal

pub mod conversations;
pub mod message;

pub use conversations::{ConversationsPresenter, ConversationsUiState};
pub use message::{MessagePresenter, MessageUiState};

use std::sync::{Mutex, PoisonError};

use tokio::task::JoinHandle;

/// Background tasks owned by a presenter; aborted on replace and on drop.
#[derive(Default)]
pub(crate) struct PresenterTasks {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl PresenterTasks {
    pub(crate) fn push(&self, handle: JoinHandle<()>) {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    pub(crate) fn abort_all(&self) {
        let handles = std::mem::take(
            &mut *self
                .handles
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            handle.abort();
        }
    }
}

impl Drop for PresenterTasks {
    fn drop(&mut self) {
        self.abort_all();
    }
}
