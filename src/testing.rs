// In-memory backend and record builders shared by unit tests
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

use crate::error::{ClientError, ClientResult};
use crate::gateway::{
    AccountApi, FeedApi, NewPost, NotificationApi, PasswordChange, PostPatch, Profile,
    ProfilePage, ProfileUpdate, Registration, SurveyApi, SurveyDraft, SurveySubmission,
    TokenGrant,
};
use crate::model::{
    Category, CategoryId, Comment, CommentId, Event, EventId, Notification, Page, Post, PostId,
    Reaction, ReactionId, ReactionKind, ReactionSummary, ReactionTarget, Role, RoleId, Survey,
    SurveyId, User, UserId, Visibility,
};

pub fn user(id: i64) -> User {
    User {
        id: UserId(id),
        username: format!("user{id}"),
        role: Some("Sinh viên".into()),
        email: None,
        phone_number: None,
        avatar: None,
        cover_image: None,
        student_id: None,
        student_id_verified: Some(true),
        password_reset_deadline: None,
    }
}

pub fn post(id: i64, author: i64) -> Post {
    Post {
        id: PostId(id),
        user: user(author),
        content: format!("<p>post {id}</p>"),
        image: None,
        category: CategoryId(1),
        visibility: Visibility::Public,
        is_comment_locked: false,
        reaction_summary: ReactionSummary::default(),
        created_date: None,
        updated_date: None,
    }
}

pub fn comment(id: i64, post: i64, author: i64) -> Comment {
    Comment {
        id: CommentId(id),
        post: PostId(post),
        user: user(author),
        content: format!("comment {id}"),
        reaction_summary: ReactionSummary::default(),
        created_date: None,
    }
}

#[derive(Default)]
struct Data {
    pages: Vec<Vec<Post>>,
    reactions: Vec<Reaction>,
    comments: Vec<Comment>,
    accounts: Vec<(User, String)>,
    signed_in: Option<UserId>,
    surveys: Vec<Survey>,
    responses: Vec<SurveySubmission>,
    notifications: Vec<Notification>,
    events: Vec<Event>,
    next_id: i64,
}

impl Data {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        1000 + self.next_id
    }

    fn account(&self, id: UserId) -> ClientResult<&User> {
        self.accounts
            .iter()
            .map(|(u, _)| u)
            .find(|u| u.id == id)
            .ok_or(ClientError::NotFound)
    }

    fn signed_in(&self) -> ClientResult<UserId> {
        self.signed_in.ok_or(ClientError::Unauthorized)
    }

    fn find_post(&mut self, id: PostId) -> ClientResult<&mut Post> {
        self.pages
            .iter_mut()
            .flatten()
            .find(|p| p.id == id)
            .ok_or(ClientError::NotFound)
    }
}

/// Backend double: keeps every resource in memory and records which calls were made.
#[derive(Default)]
pub struct FakeBackend {
    data: Mutex<Data>,
    calls: Mutex<Vec<&'static str>>,
    post_requests: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
    fail_posts: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, Data> {
        self.data.lock().unwrap()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// One inner vec per page, first page first.
    pub fn seed_posts(&self, pages: Vec<Vec<Post>>) {
        self.data().pages = pages;
    }

    pub fn seed_comments(&self, comments: Vec<Comment>) {
        self.data().comments = comments;
    }

    pub fn seed_reactions(&self, reactions: Vec<Reaction>) {
        self.data().reactions = reactions;
    }

    pub fn seed_surveys(&self, surveys: Vec<Survey>) {
        self.data().surveys = surveys;
    }

    pub fn seed_notifications(&self, notifications: Vec<Notification>, events: Vec<Event>) {
        let mut data = self.data();
        data.notifications = notifications;
        data.events = events;
    }

    pub fn add_account(&self, user: User, password: &str) {
        self.data().accounts.push((user, password.to_string()));
    }

    pub fn password_of(&self, id: UserId) -> Option<String> {
        self.data()
            .accounts
            .iter()
            .find(|(u, _)| u.id == id)
            .map(|(_, p)| p.clone())
    }

    pub fn reactions_on(&self, target: ReactionTarget) -> Vec<Reaction> {
        self.data()
            .reactions
            .iter()
            .filter(|r| r.target == target)
            .cloned()
            .collect()
    }

    pub fn responses(&self) -> Vec<SurveySubmission> {
        self.data().responses.clone()
    }

    pub fn post_requests(&self) -> usize {
        self.post_requests.load(Ordering::SeqCst)
    }

    /// The next posts request waits until the returned handle is notified.
    pub fn hold_posts(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }
}

const PROFILE_PAGE_SIZE: usize = 2;

fn page_number(cursor: &str) -> usize {
    cursor
        .rsplit('=')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(1)
        .max(1)
}

#[async_trait]
impl FeedApi for FakeBackend {
    async fn posts(&self, cursor: Option<&str>) -> ClientResult<Page<Post>> {
        self.post_requests.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(ClientError::from_status(
                StatusCode::INTERNAL_SERVER_ERROR,
                "boom",
            ));
        }

        let number = cursor.map(page_number).unwrap_or(1);
        let data = self.data();
        let results = data.pages.get(number.saturating_sub(1)).cloned().unwrap_or_default();
        let next = (number < data.pages.len()).then(|| format!("posts/?page={}", number + 1));
        Ok(Page {
            count: None,
            next,
            previous: None,
            results,
        })
    }

    async fn reactions(&self) -> ClientResult<Vec<Reaction>> {
        Ok(self.data().reactions.clone())
    }

    async fn comments(&self) -> ClientResult<Vec<Comment>> {
        Ok(self.data().comments.clone())
    }

    async fn reaction_summary(&self, target: ReactionTarget) -> ClientResult<ReactionSummary> {
        self.record("reaction_summary");
        let mut summary = ReactionSummary::default();
        for reaction in self.data().reactions.iter().filter(|r| r.target == target) {
            match reaction.reaction_type {
                ReactionKind::Like => summary.like += 1,
                ReactionKind::Haha => summary.haha += 1,
                ReactionKind::Love => summary.love += 1,
            }
        }
        Ok(summary)
    }

    async fn create_reaction(
        &self,
        author: UserId,
        target: ReactionTarget,
        kind: ReactionKind,
    ) -> ClientResult<Option<Reaction>> {
        self.record("create_reaction");
        let mut data = self.data();
        // Same toggle the backend applies to a slot that is already taken.
        if let Some(pos) = data
            .reactions
            .iter()
            .position(|r| r.user == author && r.target == target)
        {
            if data.reactions[pos].reaction_type == kind {
                data.reactions.remove(pos);
                return Ok(None);
            }
            data.reactions[pos].reaction_type = kind;
            return Ok(Some(data.reactions[pos].clone()));
        }
        let reaction = Reaction {
            id: ReactionId(data.next_id()),
            target,
            user: author,
            reaction_type: kind,
        };
        data.reactions.push(reaction.clone());
        Ok(Some(reaction))
    }

    async fn update_reaction(
        &self,
        _author: UserId,
        existing: &Reaction,
        kind: ReactionKind,
    ) -> ClientResult<Reaction> {
        self.record("update_reaction");
        let mut data = self.data();
        let reaction = data
            .reactions
            .iter_mut()
            .find(|r| r.id == existing.id)
            .ok_or(ClientError::NotFound)?;
        reaction.reaction_type = kind;
        Ok(reaction.clone())
    }

    async fn delete_reaction(&self, id: ReactionId) -> ClientResult<()> {
        self.record("delete_reaction");
        let mut data = self.data();
        let before = data.reactions.len();
        data.reactions.retain(|r| r.id != id);
        if data.reactions.len() == before {
            return Err(ClientError::NotFound);
        }
        Ok(())
    }

    async fn categories(&self) -> ClientResult<Vec<Category>> {
        Ok(vec![Category {
            id: CategoryId(1),
            name: "General".into(),
        }])
    }

    async fn post(&self, id: PostId) -> ClientResult<Post> {
        self.record("post");
        Ok(self.data().find_post(id)?.clone())
    }

    async fn create_post(&self, new: &NewPost) -> ClientResult<Post> {
        self.record("create_post");
        let mut data = self.data();
        let author = data.signed_in()?;
        let mut created = post(data.next_id(), author.get());
        created.user = data.account(author)?.clone();
        created.content = new.content.clone();
        created.category = new.category;
        created.image = new.image.clone();
        created.visibility = new.visibility;
        created.is_comment_locked = new.is_comment_locked;
        if data.pages.is_empty() {
            data.pages.push(Vec::new());
        }
        data.pages[0].insert(0, created.clone());
        Ok(created)
    }

    async fn update_post(&self, id: PostId, patch: &PostPatch) -> ClientResult<Post> {
        self.record("update_post");
        let mut data = self.data();
        let post = data.find_post(id)?;
        if let Some(content) = &patch.content {
            post.content = content.clone();
        }
        if let Some(image) = &patch.image {
            post.image = Some(image.clone());
        }
        if let Some(locked) = patch.is_comment_locked {
            post.is_comment_locked = locked;
        }
        if let Some(visibility) = patch.visibility {
            post.visibility = visibility;
        }
        Ok(post.clone())
    }

    async fn delete_post(&self, id: PostId) -> ClientResult<()> {
        self.record("delete_post");
        let mut data = self.data();
        data.find_post(id)?;
        for page in data.pages.iter_mut() {
            page.retain(|p| p.id != id);
        }
        Ok(())
    }

    async fn comment(&self, id: CommentId) -> ClientResult<Comment> {
        self.record("comment");
        self.data()
            .comments
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(ClientError::NotFound)
    }

    async fn create_comment(
        &self,
        author: UserId,
        post: PostId,
        content: &str,
    ) -> ClientResult<Comment> {
        self.record("create_comment");
        let mut data = self.data();
        let mut created = comment(data.next_id(), post.get(), author.get());
        if let Ok(account) = data.account(author) {
            created.user = account.clone();
        }
        created.content = content.to_string();
        data.comments.push(created.clone());
        Ok(created)
    }

    async fn update_comment(&self, id: CommentId, content: &str) -> ClientResult<Comment> {
        self.record("update_comment");
        let mut data = self.data();
        let comment = data
            .comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ClientError::NotFound)?;
        comment.content = content.to_string();
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: CommentId) -> ClientResult<()> {
        self.record("delete_comment");
        self.data().comments.retain(|c| c.id != id);
        Ok(())
    }
}

#[async_trait]
impl AccountApi for FakeBackend {
    async fn request_token(&self, username: &str, password: &str) -> ClientResult<TokenGrant> {
        self.record("request_token");
        let mut data = self.data();
        let id = data
            .accounts
            .iter()
            .find(|(u, p)| u.username == username && p == password)
            .map(|(u, _)| u.id)
            .ok_or_else(|| ClientError::Validation("invalid_grant".into()))?;
        data.signed_in = Some(id);
        Ok(TokenGrant {
            access_token: Some(format!("token-{id}")),
            token_type: Some("Bearer".into()),
            expires_in: Some(36000),
            refresh_token: None,
        })
    }

    async fn profile(&self) -> ClientResult<Profile> {
        self.record("profile");
        let data = self.data();
        let user = data.account(data.signed_in()?)?.clone();
        Ok(Profile {
            user,
            posts: Vec::new(),
        })
    }

    async fn user_profile(&self, id: UserId, cursor: Option<&str>) -> ClientResult<ProfilePage> {
        let data = self.data();
        let user = data.account(id)?.clone();
        let posts: Vec<Post> = data
            .pages
            .iter()
            .flatten()
            .filter(|p| p.user.id == id)
            .cloned()
            .collect();
        let number = cursor.map(page_number).unwrap_or(1);
        let start = (number - 1) * PROFILE_PAGE_SIZE;
        let next = (posts.len() > start + PROFILE_PAGE_SIZE)
            .then(|| format!("profile/{id}/?page={}", number + 1));
        let posts = posts
            .into_iter()
            .skip(start)
            .take(PROFILE_PAGE_SIZE)
            .collect();
        Ok(ProfilePage {
            profile: Profile { user, posts },
            next,
        })
    }

    async fn current_user(&self) -> ClientResult<User> {
        let data = self.data();
        Ok(data.account(data.signed_in()?)?.clone())
    }

    async fn users(&self) -> ClientResult<Vec<User>> {
        Ok(self.data().accounts.iter().map(|(u, _)| u.clone()).collect())
    }

    async fn roles(&self) -> ClientResult<Vec<Role>> {
        Ok(vec![
            Role {
                id: RoleId(1),
                name: "Sinh viên".into(),
            },
            Role {
                id: RoleId(2),
                name: "Giảng viên".into(),
            },
        ])
    }

    async fn register(&self, registration: &Registration) -> ClientResult<User> {
        self.record("register");
        let mut data = self.data();
        let mut created = user(data.next_id());
        created.username = registration.username.clone();
        created.email = Some(registration.email.clone());
        created.student_id = registration.student_id.clone();
        created.student_id_verified = Some(false);
        data.accounts.push((created.clone(), registration.password.clone()));
        Ok(created)
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<User> {
        self.record("update_profile");
        let mut data = self.data();
        let id = data.signed_in()?;
        let (account, _) = data
            .accounts
            .iter_mut()
            .find(|(u, _)| u.id == id)
            .ok_or(ClientError::NotFound)?;
        if let Some(email) = &update.email {
            account.email = Some(email.clone());
        }
        if let Some(phone) = &update.phone_number {
            account.phone_number = Some(phone.clone());
        }
        if let Some(avatar) = &update.avatar {
            account.avatar = Some(avatar.clone());
        }
        if let Some(cover) = &update.cover_image {
            account.cover_image = Some(cover.clone());
        }
        Ok(account.clone())
    }

    async fn change_password(&self, change: &PasswordChange) -> ClientResult<()> {
        self.record("change_password");
        let mut data = self.data();
        let id = data.signed_in()?;
        let (_, password) = data
            .accounts
            .iter_mut()
            .find(|(u, _)| u.id == id)
            .ok_or(ClientError::NotFound)?;
        if *password != change.old_password {
            return Err(ClientError::Validation("old_password: Wrong password.".into()));
        }
        *password = change.new_password.clone();
        Ok(())
    }
}

#[async_trait]
impl SurveyApi for FakeBackend {
    async fn surveys(&self) -> ClientResult<Vec<Survey>> {
        Ok(self.data().surveys.clone())
    }

    async fn survey(&self, id: SurveyId) -> ClientResult<Survey> {
        self.data()
            .surveys
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(ClientError::NotFound)
    }

    async fn create_survey(&self, draft: &SurveyDraft) -> ClientResult<Survey> {
        self.record("create_survey");
        let mut data = self.data();
        let survey = Survey {
            id: SurveyId(data.next_id()),
            title: draft.title.clone(),
            description: draft.description.clone(),
            status: draft.status,
            questions: draft.questions.clone(),
            user_has_responded: false,
            created_date: None,
        };
        data.surveys.insert(0, survey.clone());
        Ok(survey)
    }

    async fn update_survey(&self, id: SurveyId, draft: &SurveyDraft) -> ClientResult<Survey> {
        self.record("update_survey");
        let mut data = self.data();
        let survey = data
            .surveys
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(ClientError::NotFound)?;
        survey.title = draft.title.clone();
        survey.description = draft.description.clone();
        survey.status = draft.status;
        survey.questions = draft.questions.clone();
        Ok(survey.clone())
    }

    async fn delete_survey(&self, id: SurveyId) -> ClientResult<()> {
        self.record("delete_survey");
        self.data().surveys.retain(|s| s.id != id);
        Ok(())
    }

    async fn submit_response(&self, submission: &SurveySubmission) -> ClientResult<()> {
        self.record("submit_response");
        let mut data = self.data();
        if let Some(survey) = data.surveys.iter_mut().find(|s| s.id == submission.survey) {
            survey.user_has_responded = true;
        }
        data.responses.push(submission.clone());
        Ok(())
    }
}

#[async_trait]
impl NotificationApi for FakeBackend {
    async fn notifications(&self) -> ClientResult<Vec<Notification>> {
        Ok(self.data().notifications.clone())
    }

    async fn event(&self, id: EventId) -> ClientResult<Event> {
        self.record("event");
        self.data()
            .events
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(ClientError::NotFound)
    }
}
