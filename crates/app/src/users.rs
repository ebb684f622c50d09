use std::sync::Arc;
use std::time::Duration;

use bandconnect_messaging::{Clock, Signal, Subscription};
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, Snafu, ensure};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Fan,
    BandMember,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub band_name: Option<String>,
    pub last_active_unix_millis: u64,
    /// Ids of the band members this user follows.
    #[serde(default)]
    pub following: Vec<String>,
    #[serde(default)]
    pub followers: Vec<String>,
}

impl User {
    pub fn is_band_member(&self) -> bool {
        self.role == UserRole::BandMember
    }

    pub fn follows(&self, band_member_id: &str) -> bool {
        self.following.iter().any(|id| id == band_member_id)
    }
}

/// Input for [`UserDirectory::create_user`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub band_name: Option<String>,
}

/// Profile fields that [`UserDirectory::update_user_profile`] may change.
/// `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub name: Option<String>,
    pub band_name: Option<String>,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DirectoryError {
    #[snafu(display("invalid user on `{stage}`: {field} must not be blank"))]
    InvalidUser {
        stage: &'static str,
        field: &'static str,
    },
    #[snafu(display("unknown user `{user_id}` on `{stage}`"))]
    UnknownUser {
        stage: &'static str,
        user_id: String,
    },
    #[snafu(display("user `{user_id}` is not a band member on `{stage}`"))]
    NotABandMember {
        stage: &'static str,
        user_id: String,
    },
}

/// Known users and the signed-in account.
pub struct UserDirectory {
    users: Signal<Vec<User>>,
    current_user: Signal<Option<User>>,
    writer: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl UserDirectory {
    pub fn new(clock: Arc<dyn Clock>, users: Vec<User>) -> Self {
        Self {
            users: Signal::new(users),
            current_user: Signal::new(None),
            writer: Mutex::new(()),
            clock,
        }
    }

    pub fn users(&self) -> Arc<Vec<User>> {
        self.users.get()
    }

    pub fn subscribe_users(&self) -> Subscription<Vec<User>> {
        self.users.subscribe()
    }

    pub fn current_user(&self) -> Option<User> {
        self.current_user.get().as_ref().clone()
    }

    pub fn subscribe_current_user(&self) -> Subscription<Option<User>> {
        self.current_user.subscribe()
    }

    pub fn user_by_id(&self, user_id: &str) -> Option<User> {
        self.users
            .get()
            .iter()
            .find(|user| user.id == user_id)
            .cloned()
    }

    pub fn band_members(&self) -> Vec<User> {
        self.users
            .get()
            .iter()
            .filter(|user| user.is_band_member())
            .cloned()
            .collect()
    }

    pub async fn create_user(&self, input: NewUser) -> Result<User, DirectoryError> {
        ensure!(
            !input.username.trim().is_empty(),
            InvalidUserSnafu {
                stage: "create-user",
                field: "username",
            }
        );
        ensure!(
            !input.email.trim().is_empty(),
            InvalidUserSnafu {
                stage: "create-user",
                field: "email",
            }
        );

        let _writer = self.writer.lock().await;

        let band_name = match input.role {
            UserRole::BandMember => input.band_name,
            UserRole::Fan | UserRole::Admin => None,
        };
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: input.username.trim().to_string(),
            email: input.email.trim().to_string(),
            name: input.name,
            role: input.role,
            band_name,
            last_active_unix_millis: self.clock.now_unix_millis(),
            following: Vec::new(),
            followers: Vec::new(),
        };
        self.users.update(|users| users.push(user.clone()));

        tracing::debug!(user_id = %user.id, role = ?user.role, "user created");
        Ok(user)
    }

    /// Signs in the account registered under `email`. There is no credential check.
    pub async fn login(&self, email: &str) -> Option<User> {
        let _writer = self.writer.lock().await;

        let user = self
            .users
            .get()
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email.trim()))
            .cloned();
        match &user {
            Some(user) => tracing::info!(user_id = %user.id, "signed in"),
            None => tracing::warn!(email, "no account for sign-in email"),
        }
        self.current_user.replace(user.clone());
        user
    }

    pub async fn logout(&self) {
        let _writer = self.writer.lock().await;
        self.current_user.replace(None);
    }

    /// Refreshes a user's last-active timestamp.
    pub async fn touch(&self, user_id: &str) {
        let _writer = self.writer.lock().await;

        if !self.users.get().iter().any(|user| user.id == user_id) {
            tracing::debug!(user_id, "touch for unknown user ignored");
            return;
        }

        let now = self.clock.now_unix_millis();
        let users = self.users.update(|users| {
            if let Some(user) = users.iter_mut().find(|user| user.id == user_id) {
                user.last_active_unix_millis = now;
            }
        });
        self.refresh_current_user(&users);
    }

    /// Replaces the editable profile fields of `user_id`. A band name only sticks
    /// on band members.
    pub async fn update_user_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<User, DirectoryError> {
        if let Some(username) = &update.username {
            ensure!(
                !username.trim().is_empty(),
                InvalidUserSnafu {
                    stage: "update-user-profile",
                    field: "username",
                }
            );
        }

        let _writer = self.writer.lock().await;
        self.ensure_known(user_id, "update-user-profile")?;

        let users = self.users.update(|users| {
            if let Some(user) = users.iter_mut().find(|user| user.id == user_id) {
                if let Some(username) = update.username {
                    user.username = username.trim().to_string();
                }
                if let Some(name) = update.name {
                    user.name = name;
                }
                if user.is_band_member() && update.band_name.is_some() {
                    user.band_name = update.band_name;
                }
            }
        });
        self.refresh_current_user(&users);

        tracing::debug!(user_id, "profile updated");
        users
            .iter()
            .find(|user| user.id == user_id)
            .cloned()
            .context(UnknownUserSnafu {
                stage: "update-user-profile",
                user_id,
            })
    }

    /// Records that `user_id` follows `band_member_id`. Following twice is a no-op.
    pub async fn follow_band_member(
        &self,
        user_id: &str,
        band_member_id: &str,
    ) -> Result<(), DirectoryError> {
        let _writer = self.writer.lock().await;
        self.ensure_known(user_id, "follow-band-member")?;
        let band_member = self.ensure_known(band_member_id, "follow-band-member")?;
        ensure!(
            band_member.is_band_member(),
            NotABandMemberSnafu {
                stage: "follow-band-member",
                user_id: band_member_id,
            }
        );

        let already_following = self
            .user_by_id(user_id)
            .is_some_and(|user| user.follows(band_member_id));
        if already_following {
            return Ok(());
        }

        let users = self.users.update(|users| {
            for user in users.iter_mut() {
                if user.id == user_id && !user.follows(band_member_id) {
                    user.following.push(band_member_id.to_string());
                }
                if user.id == band_member_id && !user.followers.iter().any(|id| id == user_id) {
                    user.followers.push(user_id.to_string());
                }
            }
        });
        self.refresh_current_user(&users);

        tracing::debug!(user_id, band_member_id, "followed band member");
        Ok(())
    }

    /// Drops the follow relation in both directions. Unfollowing twice is a no-op.
    pub async fn unfollow_band_member(
        &self,
        user_id: &str,
        band_member_id: &str,
    ) -> Result<(), DirectoryError> {
        let _writer = self.writer.lock().await;
        let follower = self.ensure_known(user_id, "unfollow-band-member")?;
        let band_member = self.ensure_known(band_member_id, "unfollow-band-member")?;
        let linked = follower.follows(band_member_id)
            || band_member.followers.iter().any(|id| id == user_id);
        if !linked {
            return Ok(());
        }

        let users = self.users.update(|users| {
            for user in users.iter_mut() {
                if user.id == user_id {
                    user.following.retain(|id| id != band_member_id);
                }
                if user.id == band_member_id {
                    user.followers.retain(|id| id != user_id);
                }
            }
        });
        self.refresh_current_user(&users);

        tracing::debug!(user_id, band_member_id, "unfollowed band member");
        Ok(())
    }

    fn ensure_known(&self, user_id: &str, stage: &'static str) -> Result<User, DirectoryError> {
        self.user_by_id(user_id)
            .context(UnknownUserSnafu { stage, user_id })
    }

    /// Re-publishes the signed-in user from a fresh user list.
    fn refresh_current_user(&self, users: &[User]) {
        let signed_in = self.current_user.get();
        let Some(current) = signed_in.as_ref() else {
            return;
        };
        let refreshed = users.iter().find(|user| user.id == current.id).cloned();
        if refreshed.as_ref() != Some(current) {
            self.current_user.replace(refreshed);
        }
    }

    pub fn is_online(&self, user: &User, window: Duration) -> bool {
        let now = self.clock.now_unix_millis();
        now.saturating_sub(user.last_active_unix_millis) < window.as_millis() as u64
    }
}
