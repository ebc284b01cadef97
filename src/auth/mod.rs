pub mod authenticator;
pub mod context;
pub mod domain;

pub use authenticator::{Authenticator, RegistrationForm};
pub use context::UserContext;
pub use domain::{AuthError, AuthState, LoginPolicy};
