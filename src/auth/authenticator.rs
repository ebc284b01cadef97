use chrono::Utc;
use std::sync::{Mutex, MutexGuard};

use super::context::UserContext;
use super::domain::{AuthState, LoginPolicy};
use crate::error::{ClientError, ClientResult};
use crate::gateway::{DynAccountApi, PasswordChange, ProfileUpdate, Registration};
use crate::model::{Role, User};
use crate::session::{DynSessionStore, SessionUser};

/// Password the backend expects for lecturer accounts created without one.
const LECTURER_DEFAULT_PASSWORD: &str = "ou@123";
const MIN_PASSWORD_LEN: usize = 6;
const MIN_PHONE_LEN: usize = 10;

/// Sign-up form as entered, before validation.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub email: String,
    pub phone_number: String,
    pub role: Option<Role>,
    pub student_id: Option<String>,
    pub avatar: Option<String>,
}

impl RegistrationForm {
    /// Validate the form and build the request body.
    pub fn validate(&self, policy: &LoginPolicy) -> ClientResult<Registration> {
        let role = self
            .role
            .as_ref()
            .ok_or_else(|| ClientError::Validation("Please choose a role.".into()))?;

        if self.username.trim().is_empty() {
            return Err(ClientError::Validation("Username is required.".into()));
        }

        let password = if policy.is_exempt(Some(&role.name)) {
            if self.password.is_empty() {
                LECTURER_DEFAULT_PASSWORD.to_string()
            } else {
                self.password.clone()
            }
        } else {
            if self.password != self.confirm_password {
                return Err(ClientError::Validation("Passwords do not match.".into()));
            }
            if self.password.chars().count() < MIN_PASSWORD_LEN {
                return Err(ClientError::Validation(format!(
                    "Password must be at least {MIN_PASSWORD_LEN} characters."
                )));
            }
            self.password.clone()
        };

        if !self.email.contains('@') {
            return Err(ClientError::Validation("Invalid email address.".into()));
        }
        if self.phone_number.trim().chars().count() < MIN_PHONE_LEN {
            return Err(ClientError::Validation("Invalid phone number.".into()));
        }

        let student_id = if is_student_role(&role.name) {
            self.student_id.clone().filter(|id| !id.trim().is_empty())
        } else {
            None
        };

        Ok(Registration {
            username: self.username.trim().to_string(),
            password,
            email: self.email.trim().to_string(),
            role: role.id,
            student_id,
            phone_number: Some(self.phone_number.trim().to_string()),
            avatar: self.avatar.clone(),
        })
    }
}

fn is_student_role(name: &str) -> bool {
    name.to_lowercase() == "sinh viên"
}

/// Drives the sign-in state machine: talks to the backend, keeps the session
/// store and the user context in step with the current state.
pub struct Authenticator {
    api: DynAccountApi,
    session: DynSessionStore,
    context: UserContext,
    policy: LoginPolicy,
    state: Mutex<AuthState>,
}

impl Authenticator {
    pub fn new(
        api: DynAccountApi,
        session: DynSessionStore,
        context: UserContext,
        policy: LoginPolicy,
    ) -> Self {
        Self {
            api,
            session,
            context,
            policy,
            state: Mutex::new(AuthState::Anonymous),
        }
    }

    pub fn state(&self) -> ClientResult<AuthState> {
        Ok(self.lock_state()?.clone())
    }

    pub fn policy(&self) -> &LoginPolicy {
        &self.policy
    }

    fn lock_state(&self) -> ClientResult<MutexGuard<'_, AuthState>> {
        self.state
            .lock()
            .map_err(|_| ClientError::Internal("auth state lock poisoned".into()))
    }

    fn transition<F>(&self, f: F) -> ClientResult<()>
    where
        F: FnOnce(AuthState) -> Result<AuthState, super::AuthError>,
    {
        let mut state = self.lock_state()?;
        let current = std::mem::take(&mut *state);
        match f(current.clone()) {
            Ok(next) => {
                tracing::debug!(from = current.state_name(), to = next.state_name(), "auth transition");
                *state = next;
                Ok(())
            }
            Err(e) => {
                *state = current;
                Err(e.into())
            }
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> ClientResult<SessionUser> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ClientError::Validation(
                "Username and password are required.".into(),
            ));
        }
        self.transition(|s| s.begin(username))?;

        match self.complete_login(username, password).await {
            Ok(user) => {
                self.transition(|s| s.succeed(user.clone()))?;
                self.context.set(user.clone());
                tracing::info!(user = %user.username, "Signed in");
                Ok(user)
            }
            Err(e) => Err(self.rollback(e).await),
        }
    }

    async fn complete_login(&self, username: &str, password: &str) -> ClientResult<SessionUser> {
        let grant = self.api.request_token(username, password).await?;
        let token = grant
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Validation("Please check your sign-in details.".into()))?;

        self.session.remove_token().await?;
        self.session.save_token(&token).await?;

        let profile = self.api.profile().await?;
        self.policy.check(&profile.user, Utc::now())?;

        let user = SessionUser::from(&profile.user);
        self.session.save_user(&user).await?;
        Ok(user)
    }

    /// Undo a half-finished sign-in: drop the token and go back to `Anonymous`.
    async fn rollback(&self, err: ClientError) -> ClientError {
        tracing::warn!(error = %err, "Sign-in rejected, discarding token");
        if let Err(e) = self.session.remove_token().await {
            tracing::error!(error = %e, "Failed to discard token");
        }
        match self.lock_state() {
            Ok(mut state) => *state = std::mem::take(&mut *state).fail(),
            Err(e) => tracing::error!(error = %e, "Failed to reset auth state"),
        }
        self.context.clear();
        err
    }

    /// Pick up a session persisted by an earlier run, if there is one.
    pub async fn restore(&self) -> ClientResult<Option<SessionUser>> {
        if self.lock_state()?.is_authenticated() {
            return Ok(self.context.current());
        }

        let (token, user) = (self.session.token().await?, self.session.user().await?);
        let (Some(_), Some(user)) = (token, user) else {
            return Ok(None);
        };

        self.transition(|s| s.restore(user.clone()))?;
        self.context.set(user.clone());
        tracing::debug!(user = %user.username, "Session restored");
        Ok(Some(user))
    }

    /// Forget the session. Safe to call when nobody is signed in.
    pub async fn logout(&self) -> ClientResult<()> {
        self.session.clear().await?;
        self.context.clear();

        let mut state = self.lock_state()?;
        if state.is_authenticated() {
            *state = std::mem::take(&mut *state).logout()?;
            tracing::info!("Signed out");
        }
        Ok(())
    }

    pub async fn register(&self, form: &RegistrationForm) -> ClientResult<User> {
        let registration = form.validate(&self.policy)?;
        let user = self.api.register(&registration).await?;
        tracing::info!(user = %user.username, "Account registered");
        Ok(user)
    }

    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> ClientResult<()> {
        if old_password.is_empty() || new_password.is_empty() || confirm_password.is_empty() {
            return Err(ClientError::Validation("All password fields are required.".into()));
        }
        if new_password != confirm_password {
            return Err(ClientError::Validation(
                "New password and confirmation do not match.".into(),
            ));
        }
        self.context.require()?;

        self.api
            .change_password(&PasswordChange {
                old_password: old_password.to_string(),
                new_password: new_password.to_string(),
                confirm_password: confirm_password.to_string(),
            })
            .await?;
        tracing::info!("Password changed");
        Ok(())
    }

    /// Save profile edits and refresh the persisted session user.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<User> {
        self.context.require()?;
        let user = self.api.update_profile(update).await?;

        let session_user = SessionUser::from(&user);
        self.session.save_user(&session_user).await?;
        self.context.set(session_user.clone());

        let mut state = self.lock_state()?;
        if state.is_authenticated() {
            *state = AuthState::Authenticated { user: session_user };
        }
        Ok(user)
    }
}
