// Remote data gateway - one trait per resource family, HttpGateway over REST

pub mod endpoints;
mod http;

pub use http::HttpGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ClientResult;
use crate::model::{
    Category, CategoryId, Comment, CommentId, Event, EventId, Notification, Page, Post, PostId,
    Reaction, ReactionId, ReactionKind, ReactionSummary, ReactionTarget, Role, RoleId, Survey,
    SurveyAnswer, SurveyId, SurveyQuestion, SurveyStatus, User, UserId, Visibility,
};

/// Successful answer of the OAuth2 password grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// `profile/` and `profile/{id}/` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub user: User,
    #[serde(default)]
    pub posts: Vec<Post>,
}

/// Another user's profile; their posts are paginated.
#[derive(Debug, Clone)]
pub struct ProfilePage {
    pub profile: Profile,
    pub next: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ProfilePayload {
    Paged {
        results: Profile,
        #[serde(default)]
        next: Option<String>,
    },
    Plain(Profile),
}

impl From<ProfilePayload> for ProfilePage {
    fn from(payload: ProfilePayload) -> Self {
        match payload {
            ProfilePayload::Paged { results, next } => Self { profile: results, next },
            ProfilePayload::Plain(profile) => Self { profile, next: None },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPost {
    pub content: String,
    pub category: CategoryId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub visibility: Visibility,
    pub is_comment_locked: bool,
}

/// Partial post update; only the fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_comment_locked: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
    pub role: RoleId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveyDraft {
    pub title: String,
    pub description: String,
    pub status: SurveyStatus,
    pub questions: Vec<SurveyQuestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveySubmission {
    pub survey: SurveyId,
    pub answers: Vec<SurveyAnswer>,
}

#[async_trait]
pub trait FeedApi: Send + Sync {
    /// First page when `cursor` is `None`, otherwise the page the cursor names.
    async fn posts(&self, cursor: Option<&str>) -> ClientResult<Page<Post>>;

    /// Every reaction the backend knows, across all pages.
    async fn reactions(&self) -> ClientResult<Vec<Reaction>>;

    /// Every comment the backend knows, across all pages.
    async fn comments(&self) -> ClientResult<Vec<Comment>>;

    async fn reaction_summary(&self, target: ReactionTarget) -> ClientResult<ReactionSummary>;

    /// `author` fills in the reaction's user when the backend omits it.
    ///
    /// The backend toggles on create: a reaction of the same kind already in
    /// the slot is removed instead, which comes back as `None`.
    async fn create_reaction(
        &self,
        author: UserId,
        target: ReactionTarget,
        kind: ReactionKind,
    ) -> ClientResult<Option<Reaction>>;

    async fn update_reaction(
        &self,
        author: UserId,
        existing: &Reaction,
        kind: ReactionKind,
    ) -> ClientResult<Reaction>;

    async fn delete_reaction(&self, id: ReactionId) -> ClientResult<()>;

    async fn categories(&self) -> ClientResult<Vec<Category>>;

    async fn post(&self, id: PostId) -> ClientResult<Post>;

    async fn create_post(&self, post: &NewPost) -> ClientResult<Post>;

    async fn update_post(&self, id: PostId, patch: &PostPatch) -> ClientResult<Post>;

    async fn delete_post(&self, id: PostId) -> ClientResult<()>;

    async fn comment(&self, id: CommentId) -> ClientResult<Comment>;

    async fn create_comment(
        &self,
        author: UserId,
        post: PostId,
        content: &str,
    ) -> ClientResult<Comment>;

    async fn update_comment(&self, id: CommentId, content: &str) -> ClientResult<Comment>;

    async fn delete_comment(&self, id: CommentId) -> ClientResult<()>;
}

#[async_trait]
pub trait AccountApi: Send + Sync {
    /// OAuth2 password grant. Does not touch the session store.
    async fn request_token(&self, username: &str, password: &str) -> ClientResult<TokenGrant>;

    /// The signed-in user's profile.
    async fn profile(&self) -> ClientResult<Profile>;

    /// `cursor` is the `next` link of a previous page, if any.
    async fn user_profile(&self, id: UserId, cursor: Option<&str>) -> ClientResult<ProfilePage>;

    async fn current_user(&self) -> ClientResult<User>;

    async fn users(&self) -> ClientResult<Vec<User>>;

    async fn roles(&self) -> ClientResult<Vec<Role>>;

    async fn register(&self, registration: &Registration) -> ClientResult<User>;

    async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<User>;

    async fn change_password(&self, change: &PasswordChange) -> ClientResult<()>;
}

#[async_trait]
pub trait SurveyApi: Send + Sync {
    async fn surveys(&self) -> ClientResult<Vec<Survey>>;

    async fn survey(&self, id: SurveyId) -> ClientResult<Survey>;

    async fn create_survey(&self, draft: &SurveyDraft) -> ClientResult<Survey>;

    async fn update_survey(&self, id: SurveyId, draft: &SurveyDraft) -> ClientResult<Survey>;

    async fn delete_survey(&self, id: SurveyId) -> ClientResult<()>;

    async fn submit_response(&self, submission: &SurveySubmission) -> ClientResult<()>;
}

#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn notifications(&self) -> ClientResult<Vec<Notification>>;

    async fn event(&self, id: EventId) -> ClientResult<Event>;
}

pub type DynFeedApi = Arc<dyn FeedApi>;
pub type DynAccountApi = Arc<dyn AccountApi>;
pub type DynSurveyApi = Arc<dyn SurveyApi>;
pub type DynNotificationApi = Arc<dyn NotificationApi>;

/// Reaction as the backend serializes it. The author is a hidden field on
/// writes, so it may be missing from responses. A removed reaction is
/// serialized with a null id.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireReaction {
    #[serde(default)]
    pub id: Option<ReactionId>,
    #[serde(flatten)]
    pub target: ReactionTarget,
    #[serde(default)]
    pub user: Option<UserId>,
    pub reaction_type: ReactionKind,
}

impl WireReaction {
    pub fn with_author(self, fallback: Option<UserId>) -> Option<Reaction> {
        let id = self.id?;
        let user = self.user.or(fallback)?;
        Some(Reaction {
            id,
            target: self.target,
            user,
            reaction_type: self.reaction_type,
        })
    }
}
