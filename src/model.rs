// Domain records - typed views of the backend's JSON payloads
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub i64);

            impl $name {
                pub fn get(self) -> i64 {
                    self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<i64> for $name {
                fn from(id: i64) -> Self {
                    Self(id)
                }
            }
        )+
    };
}

id_type!(
    UserId,
    PostId,
    CommentId,
    ReactionId,
    CategoryId,
    RoleId,
    SurveyId,
    QuestionId,
    OptionId,
    NotificationId,
    EventId,
);

/// Prefix the image host leaves on stored asset paths.
const UPLOAD_PREFIX: &str = "image/upload/";

/// Strip the `image/upload/` prefix the backend leaves on asset URLs.
pub fn normalize_image_url(url: &str) -> &str {
    url.strip_prefix(UPLOAD_PREFIX).unwrap_or(url)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub student_id_verified: Option<bool>,
    #[serde(default)]
    pub password_reset_deadline: Option<DateTime<Utc>>,
}

impl User {
    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar.as_deref().map(normalize_image_url)
    }

    pub fn cover_url(&self) -> Option<&str> {
        self.cover_image.as_deref().map(normalize_image_url)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Haha,
    Love,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 3] = [ReactionKind::Like, ReactionKind::Haha, ReactionKind::Love];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Haha => "haha",
            Self::Love => "love",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "like" => Ok(Self::Like),
            "haha" => Ok(Self::Haha),
            "love" => Ok(Self::Love),
            other => Err(format!("unknown reaction kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Post,
    Comment,
}

/// What a reaction is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "target_type", content = "target_id", rename_all = "lowercase")]
pub enum ReactionTarget {
    Post(PostId),
    Comment(CommentId),
}

impl ReactionTarget {
    pub fn kind(self) -> TargetKind {
        match self {
            Self::Post(_) => TargetKind::Post,
            Self::Comment(_) => TargetKind::Comment,
        }
    }

    pub fn raw_id(self) -> i64 {
        match self {
            Self::Post(id) => id.get(),
            Self::Comment(id) => id.get(),
        }
    }

    pub fn from_parts(kind: TargetKind, id: i64) -> Self {
        match kind {
            TargetKind::Post => Self::Post(PostId(id)),
            TargetKind::Comment => Self::Comment(CommentId(id)),
        }
    }
}

impl fmt::Display for ReactionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post(id) => write!(f, "post {id}"),
            Self::Comment(id) => write!(f, "comment {id}"),
        }
    }
}

/// Server-computed counts per reaction kind. Kinds the server omits count as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionSummary {
    pub like: u32,
    pub haha: u32,
    pub love: u32,
}

impl ReactionSummary {
    pub fn count(&self, kind: ReactionKind) -> u32 {
        match kind {
            ReactionKind::Like => self.like,
            ReactionKind::Haha => self.haha,
            ReactionKind::Love => self.love,
        }
    }

    pub fn total(&self) -> u32 {
        self.like + self.haha + self.love
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: ReactionId,
    #[serde(flatten)]
    pub target: ReactionTarget,
    pub user: UserId,
    pub reaction_type: ReactionKind,
}

impl Reaction {
    /// Two reactions occupy the same slot when one author reacts to one target.
    pub fn same_slot(&self, other: &Reaction) -> bool {
        self.user == other.user && self.target == other.target
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub user: User,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    pub category: CategoryId,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_comment_locked: bool,
    #[serde(default)]
    pub reaction_summary: ReactionSummary,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_date: Option<DateTime<Utc>>,
}

impl Post {
    pub fn image_url(&self) -> Option<&str> {
        self.image.as_deref().map(normalize_image_url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post: PostId,
    pub user: User,
    pub content: String,
    #[serde(default)]
    pub reaction_summary: ReactionSummary,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
}

/// A page of a paginated collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn single(results: Vec<T>) -> Self {
        Self {
            count: Some(results.len() as u64),
            next: None,
            previous: None,
            results,
        }
    }
}

/// Collection endpoints answer either with a page or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Paged(Page<T>),
    Flat(Vec<T>),
}

impl<T> Listing<T> {
    pub fn into_page(self) -> Page<T> {
        match self {
            Self::Paged(page) => page,
            Self::Flat(items) => Page::single(items),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyStatus {
    #[default]
    Active,
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    #[default]
    Text,
    MultipleChoice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyOption {
    pub id: OptionId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyQuestion {
    pub id: QuestionId,
    pub text: String,
    #[serde(default)]
    pub question_type: QuestionKind,
    #[serde(default)]
    pub options: Vec<SurveyOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub id: SurveyId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: SurveyStatus,
    #[serde(default)]
    pub questions: Vec<SurveyQuestion>,
    #[serde(default)]
    pub user_has_responded: bool,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyAnswer {
    pub question: QuestionId,
    pub text_answer: Option<String>,
    pub option: Option<OptionId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub event: Option<EventId>,
    #[serde(default)]
    pub recipient_user: Option<UserId>,
    #[serde(default)]
    pub recipient_group: Option<i64>,
    #[serde(default)]
    pub created_by: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_parses_backend_payload() {
        let post: Post = serde_json::from_value(json!({
            "id": 7,
            "user": {"id": 3, "username": "lan", "role": "Sinh viên", "avatar": "image/upload/https://cdn/a.png"},
            "category": 2,
            "content": "<p>hello</p>",
            "image": null,
            "visibility": "public",
            "is_comment_locked": false,
            "comments": [],
            "reactions": [],
            "reaction_summary": {"like": 2, "love": 1},
            "created_date": "2025-01-05T10:00:00.123456+07:00",
            "updated_date": "2025-01-05T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(post.id, PostId(7));
        assert_eq!(post.reaction_summary.count(ReactionKind::Like), 2);
        assert_eq!(post.reaction_summary.count(ReactionKind::Haha), 0);
        assert_eq!(post.user.avatar_url(), Some("https://cdn/a.png"));
        assert!(post.created_date.is_some());
    }

    #[test]
    fn post_without_author_is_rejected() {
        let result: Result<Post, _> = serde_json::from_value(json!({
            "id": 7,
            "category": 2,
            "content": "orphan"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn reaction_target_flattens_to_wire_fields() {
        let reaction = Reaction {
            id: ReactionId(1),
            target: ReactionTarget::Comment(CommentId(9)),
            user: UserId(5),
            reaction_type: ReactionKind::Haha,
        };
        let value = serde_json::to_value(&reaction).unwrap();
        assert_eq!(value["target_type"], "comment");
        assert_eq!(value["target_id"], 9);
        assert_eq!(value["reaction_type"], "haha");
    }

    #[test]
    fn listing_accepts_page_or_array() {
        let paged: Listing<Category> = serde_json::from_value(json!({
            "count": 1, "next": "https://api/x?page=2", "previous": null,
            "results": [{"id": 1, "name": "news"}]
        }))
        .unwrap();
        assert_eq!(paged.into_page().next.as_deref(), Some("https://api/x?page=2"));

        let flat: Listing<Category> =
            serde_json::from_value(json!([{"id": 1, "name": "news"}])).unwrap();
        let page = flat.into_page();
        assert_eq!(page.results.len(), 1);
        assert!(page.next.is_none());
    }

    #[test]
    fn reaction_kind_parses_case_insensitively() {
        assert_eq!("LOVE".parse::<ReactionKind>(), Ok(ReactionKind::Love));
        assert!("wow".parse::<ReactionKind>().is_err());
    }

    #[test]
    fn normalize_leaves_plain_urls_alone() {
        assert_eq!(normalize_image_url("https://cdn/x.png"), "https://cdn/x.png");
        assert_eq!(normalize_image_url("image/upload/v1/x.png"), "v1/x.png");
    }
}
