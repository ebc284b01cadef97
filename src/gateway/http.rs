use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::endpoints;
use super::{
    AccountApi, FeedApi, NewPost, NotificationApi, PasswordChange, PostPatch, Profile,
    ProfilePage, ProfilePayload, ProfileUpdate, Registration, SurveyApi, SurveyDraft,
    SurveySubmission, TokenGrant, WireReaction,
};
use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::model::{
    Category, Comment, CommentId, Event, EventId, Listing, Notification, Page, Post, PostId,
    Reaction, ReactionId, ReactionKind, ReactionSummary, ReactionTarget, Role, Survey, SurveyId,
    User, UserId,
};
use crate::session::DynSessionStore;

/// Whether a call may go out without a bearer token.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Signed,
}

#[derive(Deserialize)]
struct SummaryEnvelope {
    #[serde(default)]
    reaction_summary: ReactionSummary,
}

/// REST client for the campus backend. The bearer token is read from the
/// session store on every call, so a login or logout takes effect at once.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base: Url,
    client_id: String,
    client_secret: String,
    session: DynSessionStore,
}

impl HttpGateway {
    pub fn new(base: Url, session: DynSessionStore) -> Self {
        Self {
            client: Client::new(),
            base,
            client_id: String::new(),
            client_secret: String::new(),
            session,
        }
    }

    pub fn from_config(config: &Config, session: DynSessionStore) -> ClientResult<Self> {
        let mut gateway = Self::new(config.base_url()?, session);
        gateway.client_id = config.api.client_id.clone();
        gateway.client_secret = config.api.client_secret.clone();
        Ok(gateway)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve a resource path, or a `next` cursor that may already be absolute.
    fn url(&self, path: &str) -> ClientResult<Url> {
        match Url::parse(path) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(self.base.join(path)?),
            Err(e) => Err(e.into()),
        }
    }

    async fn request(&self, method: Method, path: &str, access: Access) -> ClientResult<RequestBuilder> {
        let url = self.url(path)?;
        tracing::debug!(%method, %url, "request");
        let mut builder = self.client.request(method, url);

        match (self.session.token().await?, access) {
            (Some(token), _) => builder = builder.header(AUTHORIZATION, format!("Bearer {token}")),
            (None, Access::Signed) => return Err(ClientError::Unauthorized),
            (None, Access::Public) => {}
        }

        Ok(builder)
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str, access: Access) -> ClientResult<T> {
        let request = self.request(Method::GET, path, access).await?;
        decode(checked(request.send().await?).await?).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &impl serde::Serialize,
    ) -> ClientResult<T> {
        let request = self.request(method, path, Access::Signed).await?.json(body);
        decode(checked(request.send().await?).await?).await
    }

    async fn remove(&self, path: &str) -> ClientResult<()> {
        let request = self.request(Method::DELETE, path, Access::Signed).await?;
        checked(request.send().await?).await?;
        Ok(())
    }

    async fn page<T: DeserializeOwned>(&self, path: &str, access: Access) -> ClientResult<Page<T>> {
        let listing: Listing<T> = self.fetch(path, access).await?;
        Ok(listing.into_page())
    }

    /// Follow `next` links until the collection is exhausted.
    async fn collect<T: DeserializeOwned>(&self, path: &str, access: Access) -> ClientResult<Vec<T>> {
        let mut items = Vec::new();
        let mut cursor = path.to_string();

        loop {
            let page: Page<T> = self.page(&cursor, access).await?;
            items.extend(page.results);
            match page.next {
                Some(next) if next != cursor => cursor = next,
                _ => break,
            }
        }

        Ok(items)
    }
}

async fn checked(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(%status, "request failed");
    Err(ClientError::from_status(status, error_message(&body)))
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Pull a readable message out of an error body: `detail`, `error`, or the
/// first field error of a validation response.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.chars().take(200).collect();
    };

    for key in ["detail", "error", "error_description", "message"] {
        if let Some(text) = value.get(key).and_then(Value::as_str) {
            return text.to_string();
        }
    }

    if let Some(fields) = value.as_object() {
        for (field, errors) in fields {
            let first = match errors {
                Value::Array(list) => list.first().and_then(Value::as_str),
                Value::String(text) => Some(text.as_str()),
                _ => None,
            };
            if let Some(text) = first {
                return format!("{field}: {text}");
            }
        }
    }

    value.to_string()
}

#[async_trait]
impl FeedApi for HttpGateway {
    async fn posts(&self, cursor: Option<&str>) -> ClientResult<Page<Post>> {
        self.page(cursor.unwrap_or(endpoints::POSTS), Access::Public).await
    }

    async fn reactions(&self) -> ClientResult<Vec<Reaction>> {
        let wire: Vec<WireReaction> = self.collect(endpoints::REACTIONS, Access::Public).await?;
        let total = wire.len();
        let reactions: Vec<Reaction> = wire.into_iter().filter_map(|r| r.with_author(None)).collect();
        if reactions.len() < total {
            tracing::warn!(dropped = total - reactions.len(), "reactions without author skipped");
        }
        Ok(reactions)
    }

    async fn comments(&self) -> ClientResult<Vec<Comment>> {
        self.collect(endpoints::COMMENTS, Access::Public).await
    }

    async fn reaction_summary(&self, target: ReactionTarget) -> ClientResult<ReactionSummary> {
        let envelope: SummaryEnvelope = self
            .fetch(&endpoints::reactions_summary(target), Access::Public)
            .await?;
        Ok(envelope.reaction_summary)
    }

    async fn create_reaction(
        &self,
        author: UserId,
        target: ReactionTarget,
        kind: ReactionKind,
    ) -> ClientResult<Option<Reaction>> {
        let body = json!({
            "target_type": target.kind(),
            "target_id": target.raw_id(),
            "reaction_type": kind,
        });
        let wire: WireReaction = self.send_json(Method::POST, endpoints::REACTIONS, &body).await?;
        if wire.id.is_none() {
            tracing::debug!(%target, "backend removed the existing reaction");
            return Ok(None);
        }
        Ok(wire.with_author(Some(author)))
    }

    async fn update_reaction(
        &self,
        author: UserId,
        existing: &Reaction,
        kind: ReactionKind,
    ) -> ClientResult<Reaction> {
        let body = json!({ "reaction_type": kind });
        let wire: WireReaction = self
            .send_json(Method::PATCH, &endpoints::reaction_detail(existing.id), &body)
            .await?;
        wire.with_author(Some(author))
            .ok_or_else(|| ClientError::Internal("reaction without author".into()))
    }

    async fn delete_reaction(&self, id: ReactionId) -> ClientResult<()> {
        self.remove(&endpoints::reaction_detail(id)).await
    }

    async fn categories(&self) -> ClientResult<Vec<Category>> {
        self.collect(endpoints::CATEGORIES, Access::Public).await
    }

    async fn post(&self, id: PostId) -> ClientResult<Post> {
        self.fetch(&endpoints::post_detail(id), Access::Public).await
    }

    async fn create_post(&self, post: &NewPost) -> ClientResult<Post> {
        self.send_json(Method::POST, endpoints::POSTS, post).await
    }

    async fn update_post(&self, id: PostId, patch: &PostPatch) -> ClientResult<Post> {
        self.send_json(Method::PATCH, &endpoints::post_detail(id), patch).await
    }

    async fn delete_post(&self, id: PostId) -> ClientResult<()> {
        self.remove(&endpoints::post_detail(id)).await
    }

    async fn comment(&self, id: CommentId) -> ClientResult<Comment> {
        self.fetch(&endpoints::comment_detail(id), Access::Public).await
    }

    async fn create_comment(
        &self,
        author: UserId,
        post: PostId,
        content: &str,
    ) -> ClientResult<Comment> {
        let body = json!({ "content": content, "post": post, "user": author });
        self.send_json(Method::POST, endpoints::COMMENTS, &body).await
    }

    async fn update_comment(&self, id: CommentId, content: &str) -> ClientResult<Comment> {
        let body = json!({ "content": content });
        self.send_json(Method::PATCH, &endpoints::comment_detail(id), &body).await
    }

    async fn delete_comment(&self, id: CommentId) -> ClientResult<()> {
        self.remove(&endpoints::comment_detail(id)).await
    }
}

#[async_trait]
impl AccountApi for HttpGateway {
    async fn request_token(&self, username: &str, password: &str) -> ClientResult<TokenGrant> {
        let url = self.url(endpoints::TOKEN)?;
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ];
        let response = self.client.post(url).form(&form).send().await?;
        decode(checked(response).await?).await
    }

    async fn profile(&self) -> ClientResult<Profile> {
        self.fetch(endpoints::PROFILE, Access::Signed).await
    }

    async fn user_profile(&self, id: UserId, cursor: Option<&str>) -> ClientResult<ProfilePage> {
        let path = match cursor {
            Some(next) => next.to_string(),
            None => endpoints::profile_of(id),
        };
        let payload: ProfilePayload = self.fetch(&path, Access::Signed).await?;
        Ok(payload.into())
    }

    async fn current_user(&self) -> ClientResult<User> {
        self.fetch(endpoints::CURRENT_USER, Access::Signed).await
    }

    async fn users(&self) -> ClientResult<Vec<User>> {
        self.collect(endpoints::USERS, Access::Signed).await
    }

    async fn roles(&self) -> ClientResult<Vec<Role>> {
        self.collect(endpoints::ROLES, Access::Public).await
    }

    async fn register(&self, registration: &Registration) -> ClientResult<User> {
        let url = self.url(endpoints::USERS)?;
        let response = self.client.post(url).json(registration).send().await?;
        decode(checked(response).await?).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<User> {
        self.send_json(Method::PATCH, endpoints::UPDATE_USER, update).await
    }

    async fn change_password(&self, change: &PasswordChange) -> ClientResult<()> {
        let request = self
            .request(Method::POST, endpoints::CHANGE_PASSWORD, Access::Signed)
            .await?
            .json(change);
        checked(request.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl SurveyApi for HttpGateway {
    async fn surveys(&self) -> ClientResult<Vec<Survey>> {
        self.collect(endpoints::SURVEYS, Access::Signed).await
    }

    async fn survey(&self, id: SurveyId) -> ClientResult<Survey> {
        self.fetch(&endpoints::survey_detail(id), Access::Signed).await
    }

    async fn create_survey(&self, draft: &SurveyDraft) -> ClientResult<Survey> {
        self.send_json(Method::POST, endpoints::SURVEYS, draft).await
    }

    async fn update_survey(&self, id: SurveyId, draft: &SurveyDraft) -> ClientResult<Survey> {
        self.send_json(Method::PATCH, &endpoints::survey_detail(id), draft).await
    }

    async fn delete_survey(&self, id: SurveyId) -> ClientResult<()> {
        self.remove(&endpoints::survey_detail(id)).await
    }

    async fn submit_response(&self, submission: &SurveySubmission) -> ClientResult<()> {
        let request = self
            .request(Method::POST, endpoints::SURVEY_RESPONSES, Access::Signed)
            .await?
            .json(submission);
        checked(request.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationApi for HttpGateway {
    async fn notifications(&self) -> ClientResult<Vec<Notification>> {
        self.collect(endpoints::NOTIFICATIONS, Access::Signed).await
    }

    async fn event(&self, id: EventId) -> ClientResult<Event> {
        self.fetch(&endpoints::event_detail(id), Access::Signed).await
    }
}
