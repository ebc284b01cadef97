// Text rendering of store state for the command line
use askama::Template;
use chrono::{DateTime, Local, Utc};

use crate::error::ClientResult;
use crate::gateway::Profile;
use crate::model::{
    Comment, Post, QuestionKind, ReactionKind, ReactionSummary, ReactionTarget, Survey,
    SurveyStatus, UserId,
};
use crate::notifications::NotificationEntry;
use crate::store::FeedState;

/// Drop HTML tags and decode character references.
pub fn plain_text(html: &str) -> String {
    let mut stripped = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => stripped.push(c),
            _ => {}
        }
    }
    decode_entities(&stripped)
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let hex = num.strip_prefix('x').or_else(|| num.strip_prefix('X'));
        let code = match hex {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "hellip" => '…',
        "ndash" => '–',
        "mdash" => '—',
        "copy" => '©',
        _ => return None,
    })
}

fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_default()
}

fn summary_line(summary: &ReactionSummary) -> String {
    ReactionKind::ALL
        .iter()
        .map(|kind| format!("{} {}", kind, summary.count(*kind)))
        .collect::<Vec<_>>()
        .join(" · ")
}

pub struct CommentView {
    pub id: String,
    pub author: String,
    pub content: String,
    pub summary: String,
    pub my_reaction: String,
}

pub struct PostView {
    pub id: String,
    pub author: String,
    pub posted_at: String,
    pub content: String,
    pub image: String,
    pub summary: String,
    pub my_reaction: String,
    pub locked: bool,
    pub show_comments: bool,
    pub comment_count: usize,
    pub comments: Vec<CommentView>,
}

fn my_reaction(state: &FeedState, viewer: Option<UserId>, target: ReactionTarget) -> String {
    viewer
        .and_then(|me| state.reaction_of(me, target))
        .map(|r| r.reaction_type.to_string())
        .unwrap_or_default()
}

fn comment_view(state: &FeedState, viewer: Option<UserId>, comment: &Comment) -> CommentView {
    CommentView {
        id: comment.id.to_string(),
        author: comment.user.username.clone(),
        content: plain_text(&comment.content).trim().to_string(),
        summary: summary_line(&comment.reaction_summary),
        my_reaction: my_reaction(state, viewer, ReactionTarget::Comment(comment.id)),
    }
}

fn post_view(state: &FeedState, viewer: Option<UserId>, post: &Post, expand_all: bool) -> PostView {
    let comments: Vec<CommentView> = state
        .comments_for(post.id)
        .map(|c| comment_view(state, viewer, c))
        .collect();

    PostView {
        id: post.id.to_string(),
        author: post.user.username.clone(),
        posted_at: timestamp(post.created_date),
        content: plain_text(&post.content).trim().to_string(),
        image: post.image_url().unwrap_or_default().to_string(),
        summary: summary_line(&post.reaction_summary),
        my_reaction: my_reaction(state, viewer, ReactionTarget::Post(post.id)),
        locked: post.is_comment_locked,
        show_comments: expand_all || state.comments_visible(post.id),
        comment_count: comments.len(),
        comments,
    }
}

#[derive(Template)]
#[template(path = "feed.txt")]
pub struct FeedTemplate {
    pub loading: bool,
    pub has_more: bool,
    pub posts: Vec<PostView>,
}

impl FeedTemplate {
    /// `expand_all` shows every comment thread regardless of the toggled flags.
    pub fn from_state(
        state: &FeedState,
        viewer: Option<UserId>,
        has_more: bool,
        expand_all: bool,
    ) -> Self {
        Self {
            loading: state.loading,
            has_more,
            posts: state
                .posts
                .iter()
                .map(|p| post_view(state, viewer, p, expand_all))
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "profile.txt")]
pub struct ProfileTemplate {
    pub username: String,
    pub role: String,
    pub email: String,
    pub phone_number: String,
    pub avatar: String,
    pub cover: String,
    pub posts: Vec<PostView>,
}

impl ProfileTemplate {
    pub fn from_profile(profile: &Profile) -> Self {
        let user = &profile.user;
        let state = FeedState::default();
        Self {
            username: user.username.clone(),
            role: user.role.clone().unwrap_or_default(),
            email: user.email.clone().unwrap_or_default(),
            phone_number: user.phone_number.clone().unwrap_or_default(),
            avatar: user.avatar_url().unwrap_or_default().to_string(),
            cover: user.cover_url().unwrap_or_default().to_string(),
            posts: profile
                .posts
                .iter()
                .map(|p| post_view(&state, None, p, false))
                .collect(),
        }
    }
}

pub struct QuestionView {
    pub number: usize,
    pub text: String,
    pub choices: Vec<String>,
}

pub struct SurveyView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub questions: Vec<QuestionView>,
}

impl From<&Survey> for SurveyView {
    fn from(survey: &Survey) -> Self {
        let status = match (survey.status, survey.user_has_responded) {
            (SurveyStatus::Closed, _) => "closed",
            (SurveyStatus::Active, true) => "answered",
            (SurveyStatus::Active, false) => "open",
        };
        Self {
            id: survey.id.to_string(),
            title: survey.title.clone(),
            description: plain_text(&survey.description).trim().to_string(),
            status: status.to_string(),
            questions: survey
                .questions
                .iter()
                .enumerate()
                .map(|(i, q)| QuestionView {
                    number: i + 1,
                    text: q.text.clone(),
                    choices: match q.question_type {
                        QuestionKind::Text => Vec::new(),
                        QuestionKind::MultipleChoice => q
                            .options
                            .iter()
                            .map(|o| format!("[{}] {}", o.id, o.text))
                            .collect(),
                    },
                })
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "surveys.txt")]
pub struct SurveysTemplate {
    pub surveys: Vec<SurveyView>,
}

impl SurveysTemplate {
    pub fn new(surveys: &[Survey]) -> Self {
        Self {
            surveys: surveys.iter().map(SurveyView::from).collect(),
        }
    }
}

pub struct NotificationView {
    pub title: String,
    pub content: String,
    pub event: String,
}

#[derive(Template)]
#[template(path = "notifications.txt")]
pub struct NotificationsTemplate {
    pub items: Vec<NotificationView>,
}

impl NotificationsTemplate {
    pub fn new(entries: &[NotificationEntry]) -> Self {
        Self {
            items: entries
                .iter()
                .map(|entry| NotificationView {
                    title: plain_text(&entry.notification.title),
                    content: plain_text(&entry.notification.content).trim().to_string(),
                    event: entry
                        .event
                        .as_ref()
                        .map(|e| {
                            format!(
                                "{} ({} → {})",
                                plain_text(&e.title),
                                timestamp(Some(e.start_time)),
                                timestamp(Some(e.end_time))
                            )
                        })
                        .unwrap_or_default(),
                })
                .collect(),
        }
    }
}

/// Render any of the screens above.
pub fn render<T: Template>(template: &T) -> ClientResult<String> {
    Ok(template.render()?)
}
