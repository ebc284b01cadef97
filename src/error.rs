use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Not signed in")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found")]
    NotFound,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Server responded {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("Malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Account not verified: {0}")]
    NotVerified(String),

    #[error("Password change overdue")]
    PasswordChangeOverdue,

    #[error("Storage error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad class of a failure, for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Authorization,
    Validation,
    Scope,
    Local,
}

impl ClientError {
    /// Map an unsuccessful HTTP status into the matching error.
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::NOT_FOUND => ClientError::NotFound,
            StatusCode::BAD_REQUEST => ClientError::Validation(message),
            _ => ClientError::Api { status, message },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Transport(_) | ClientError::Api { .. } | ClientError::Json(_) => {
                ErrorKind::Network
            }
            ClientError::Unauthorized
            | ClientError::NotVerified(_)
            | ClientError::PasswordChangeOverdue => ErrorKind::Authorization,
            ClientError::Validation(_) => ErrorKind::Validation,
            ClientError::Forbidden(_) | ClientError::NotFound => ErrorKind::Scope,
            ClientError::Url(_)
            | ClientError::Database(_)
            | ClientError::Pool(_)
            | ClientError::Io(_)
            | ClientError::Template(_)
            | ClientError::Internal(_) => ErrorKind::Local,
        }
    }

    /// One-line message fit for showing the user. Internal details are logged, not shown.
    pub fn notice(&self) -> String {
        match self {
            ClientError::Transport(e) => {
                tracing::error!("Transport error: {}", e);
                "Could not reach the server. Pull to refresh to try again.".to_string()
            }
            ClientError::Unauthorized => "Please sign in first.".to_string(),
            ClientError::Forbidden(msg) => format!("You are not allowed to do that: {msg}"),
            ClientError::NotFound => "That item no longer exists.".to_string(),
            ClientError::Validation(msg) => msg.clone(),
            ClientError::Api { status, message } => {
                tracing::error!("API error {}: {}", status, message);
                "The server could not complete the request.".to_string()
            }
            ClientError::Json(e) => {
                tracing::error!("Malformed payload: {}", e);
                "The server sent data this client does not understand.".to_string()
            }
            ClientError::NotVerified(_) => {
                "Your student ID has not been verified yet. Please contact an administrator."
                    .to_string()
            }
            ClientError::PasswordChangeOverdue => {
                "The deadline to change your password has passed. Please contact an administrator."
                    .to_string()
            }
            ClientError::Url(e) => {
                tracing::error!("URL error: {}", e);
                "Client misconfigured: bad server address.".to_string()
            }
            ClientError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Could not access local storage.".to_string()
            }
            ClientError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                "Could not access local storage.".to_string()
            }
            ClientError::Io(e) => {
                tracing::error!("IO error: {}", e);
                format!("Could not read file: {e}")
            }
            ClientError::Template(e) => {
                tracing::error!("Template render error: {}", e);
                "Could not display the result.".to_string()
            }
            ClientError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Something went wrong.".to_string()
            }
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
