use std::sync::Arc;

use bandconnect_messaging::{Clock, MessageRepository, SystemClock};

use crate::events::EventRegistry;
use crate::presenter::{ConversationsPresenter, MessagePresenter};
use crate::seed;
use crate::settings::AppSettings;
use crate::users::UserDirectory;

/// Owns the single repository, user directory and event registry, and hands them
/// to presenters.
pub struct BandConnectApp {
    settings: Arc<AppSettings>,
    repository: Arc<MessageRepository>,
    directory: Arc<UserDirectory>,
    events: Arc<EventRegistry>,
}

impl BandConnectApp {
    pub fn new(settings: Arc<AppSettings>) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: Arc<AppSettings>, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_unix_millis();
        let (users, quick_responses, events) = if settings.seed_sample_data {
            (
                seed::sample_users(now),
                seed::sample_quick_responses(),
                seed::sample_events(now),
            )
        } else {
            (Vec::new(), Vec::new(), Vec::new())
        };

        tracing::info!(
            users = users.len(),
            quick_responses = quick_responses.len(),
            events = events.len(),
            "composing application state"
        );

        Self {
            repository: Arc::new(MessageRepository::with_quick_responses(
                Arc::clone(&clock),
                quick_responses,
            )),
            directory: Arc::new(UserDirectory::new(Arc::clone(&clock), users)),
            events: Arc::new(EventRegistry::new(clock, events)),
            settings,
        }
    }

    /// Signs in the configured account, if any.
    pub async fn sign_in_from_settings(&self) -> bool {
        if self.settings.login_email.is_empty() {
            return false;
        }
        self.directory
            .login(&self.settings.login_email)
            .await
            .is_some()
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn repository(&self) -> &Arc<MessageRepository> {
        &self.repository
    }

    pub fn directory(&self) -> &Arc<UserDirectory> {
        &self.directory
    }

    pub fn events(&self) -> &Arc<EventRegistry> {
        &self.events
    }

    pub fn conversations_presenter(&self) -> ConversationsPresenter {
        ConversationsPresenter::start(Arc::clone(&self.repository), Arc::clone(&self.directory))
    }

    pub fn message_presenter(&self) -> MessagePresenter {
        MessagePresenter::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.directory),
            self.settings.online_window(),
        )
    }
}
