// Authentication state machine - pure transitions and sign-in policy, no side effects
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

use crate::config::AuthConfig;
use crate::error::{ClientError, ClientResult};
use crate::model::User;
use crate::session::SessionUser;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthState {
    /// No one is signed in.
    #[default]
    Anonymous,

    /// Credentials sent, waiting on the token and profile.
    Authenticating { username: String },

    /// Profile passed the sign-in checks and is persisted.
    Authenticated { user: SessionUser },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    InvalidTransition(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for ClientError {
    fn from(err: AuthError) -> Self {
        ClientError::Validation(err.to_string())
    }
}

impl AuthState {
    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Anonymous => "Anonymous",
            Self::Authenticating { .. } => "Authenticating",
            Self::Authenticated { .. } => "Authenticated",
        }
    }

    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            Self::Authenticated { user } => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// Transition: Anonymous → Authenticating
    pub fn begin(self, username: impl Into<String>) -> Result<Self, AuthError> {
        match self {
            Self::Anonymous => Ok(Self::Authenticating {
                username: username.into(),
            }),
            other => Err(AuthError::InvalidTransition(format!(
                "Cannot sign in from {} state",
                other.state_name()
            ))),
        }
    }

    /// Transition: Authenticating → Authenticated
    pub fn succeed(self, user: SessionUser) -> Result<Self, AuthError> {
        match self {
            Self::Authenticating { .. } => Ok(Self::Authenticated { user }),
            other => Err(AuthError::InvalidTransition(format!(
                "Cannot complete sign-in from {} state",
                other.state_name()
            ))),
        }
    }

    /// Transition: Anonymous → Authenticated, from a session saved by an earlier run
    pub fn restore(self, user: SessionUser) -> Result<Self, AuthError> {
        match self {
            Self::Anonymous => Ok(Self::Authenticated { user }),
            other => Err(AuthError::InvalidTransition(format!(
                "Cannot restore a session from {} state",
                other.state_name()
            ))),
        }
    }

    /// Transition: Authenticated → Anonymous
    pub fn logout(self) -> Result<Self, AuthError> {
        match self {
            Self::Authenticated { .. } => Ok(Self::Anonymous),
            other => Err(AuthError::InvalidTransition(format!(
                "Cannot sign out from {} state",
                other.state_name()
            ))),
        }
    }

    /// Transition: any → Anonymous
    pub fn fail(self) -> Self {
        Self::Anonymous
    }
}

/// Checks a fetched profile must pass before the session is kept.
#[derive(Debug, Clone)]
pub struct LoginPolicy {
    exempt_roles: Vec<String>,
    password_grace: Duration,
}

impl LoginPolicy {
    pub fn new(exempt_roles: Vec<String>, password_grace: Duration) -> Self {
        Self {
            exempt_roles,
            password_grace,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.exempt_roles.clone(),
            Duration::hours(config.password_grace_hours),
        )
    }

    pub fn is_exempt(&self, role: Option<&str>) -> bool {
        role.is_some_and(|role| self.exempt_roles.iter().any(|r| r == role))
    }

    pub fn check(&self, user: &User, now: DateTime<Utc>) -> ClientResult<()> {
        if let Some(deadline) = user.password_reset_deadline {
            if now - deadline > self.password_grace {
                return Err(ClientError::PasswordChangeOverdue);
            }
        }

        if user.student_id_verified == Some(false) && !self.is_exempt(user.role.as_deref()) {
            return Err(ClientError::NotVerified(user.username.clone()));
        }

        Ok(())
    }
}

impl Default for LoginPolicy {
    fn default() -> Self {
        Self::from_config(&AuthConfig::default())
    }
}
