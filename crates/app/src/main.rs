use std::sync::Arc;

use bandconnect::app::BandConnectApp;
use bandconnect::settings::SettingsStore;
use bandconnect_messaging::{NewMessage, Subscription};
use tracing_subscriber::EnvFilter;

/// Runs a short scripted session against the in-memory messaging core:
/// 1. Load settings (defaults, then the JSON file, then `BANDCONNECT_*` variables)
/// 2. Install the tracing subscriber
/// 3. Sign in the configured account and open a thread with a fan
/// 4. Exchange a few messages, register the fan for a show and follow the band member
/// 5. Print the resulting conversation list
#[tokio::main]
async fn main() {
    let settings_store = SettingsStore::load();
    let settings = settings_store.settings();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::info!(config = ?settings_store.config_path(), "settings loaded");
    if let Err(error) = settings_store.write_if_missing() {
        tracing::warn!(%error, "could not write initial settings file");
    }

    let app = BandConnectApp::new(Arc::clone(&settings));
    if !app.sign_in_from_settings().await {
        tracing::warn!("nobody is signed in; presenters will report errors");
    }

    let conversations = app.conversations_presenter();
    let mut conversation_states = conversations.subscribe();
    let thread = app.message_presenter();
    let mut thread_states = thread.subscribe();

    thread.init_conversation("fan1");
    let Some(opened) = settle(&mut thread_states, |state| !state.is_loading).await else {
        return;
    };
    if let Some(error) = &opened.error_message {
        tracing::error!(%error, "could not open thread");
        return;
    }

    if let Err(error) = app
        .repository()
        .send_message(NewMessage::new(
            "fan1",
            &opened.current_user_id,
            "Loved the show last night!",
        ))
        .await
    {
        tracing::error!(%error, "fan message rejected");
        return;
    }
    match thread.send_quick_response(0).await {
        Ok(Some(message)) => tracing::info!(message_id = %message.id, "quick response sent"),
        Ok(None) => tracing::info!("no quick response available"),
        Err(error) => tracing::error!(%error, "quick response rejected"),
    }

    let Some(thread_state) = settle(&mut thread_states, |state| state.messages.len() >= 2).await
    else {
        return;
    };
    for message in &thread_state.messages {
        tracing::info!(
            from = %message.sender_id,
            status = ?message.status,
            priority = ?message.priority,
            "{}",
            message.content
        );
    }

    match app.events().register_for_event("event1", "fan1").await {
        Ok(event) => tracing::info!(
            event = %event.title,
            registrations = event.current_registrations(),
            capacity = event.max_capacity,
            "fan registered"
        ),
        Err(error) => tracing::warn!(%error, "event registration failed"),
    }
    if let Err(error) = app
        .directory()
        .follow_band_member("fan1", &opened.current_user_id)
        .await
    {
        tracing::warn!(%error, "follow failed");
    }

    let Some(listing) =
        settle(&mut conversation_states, |state| !state.conversations.is_empty()).await
    else {
        return;
    };
    for conversation in &listing.conversations {
        let counterpart = conversation
            .counterpart_of(&listing.current_user_id)
            .map(|user_id| listing.display_name(user_id))
            .unwrap_or_default();
        tracing::info!(
            with = %counterpart,
            unread = conversation.unread_count,
            pinned = conversation.is_pinned,
            "conversation"
        );
    }

    conversations.stop();
    thread.stop();
}

async fn settle<S>(states: &mut Subscription<S>, ready: impl Fn(&S) -> bool) -> Option<Arc<S>> {
    while let Some(state) = states.recv().await {
        if ready(&*state) {
            return Some(state);
        }
    }
    tracing::error!("presenter state feed closed early");
    None
}
