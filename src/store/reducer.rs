// Application state container - pure transitions, no I/O
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::hash::Hash;

use crate::model::{
    Comment, CommentId, Post, PostId, Reaction, ReactionId, ReactionSummary, ReactionTarget,
    Survey, SurveyId, UserId,
};

/// Everything the feed screen shows.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
    pub posts: Vec<Post>,
    pub reactions: Vec<Reaction>,
    pub comments: Vec<Comment>,
    pub surveys: Vec<Survey>,
    pub loading: bool,
    /// Posts whose comment thread is expanded. Local only, never sent to the server.
    pub expanded_comments: HashSet<PostId>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            posts: Vec::new(),
            reactions: Vec::new(),
            comments: Vec::new(),
            surveys: Vec::new(),
            loading: true,
            expanded_comments: HashSet::new(),
        }
    }
}

impl FeedState {
    pub fn post(&self, id: PostId) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    pub fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    pub fn comments_for(&self, post: PostId) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(move |c| c.post == post)
    }

    pub fn comments_visible(&self, post: PostId) -> bool {
        self.expanded_comments.contains(&post)
    }

    /// The reaction `user` currently holds on `target`, if any.
    pub fn reaction_of(&self, user: UserId, target: ReactionTarget) -> Option<&Reaction> {
        self.reactions
            .iter()
            .find(|r| r.user == user && r.target == target)
    }
}

/// Wholesale replacement payload for `SET_DATA`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub posts: Vec<Post>,
    pub reactions: Vec<Reaction>,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    SetData(FeedSnapshot),
    SetLoading(bool),
    ToggleComments(PostId),
    SetReactions(Vec<Reaction>),
    UpdateReactions {
        target: ReactionTarget,
        summary: Option<ReactionSummary>,
    },
    AddReaction(Reaction),
    UpdateReaction {
        id: ReactionId,
        reaction: Reaction,
    },
    DeleteReaction(ReactionId),
    ResetReactions,
    AddPost(Post),
    UpdatePost(Post),
    DeletePost(PostId),
    SetComments(Vec<Comment>),
    AddComment(Comment),
    UpdateComment(Comment),
    DeleteComment(CommentId),
    SetSurveys(Vec<Survey>),
    AddSurvey(Survey),
    UpdateSurvey(Survey),
    DeleteSurvey(SurveyId),
    #[serde(other)]
    Unknown,
}

impl Action {
    const KNOWN: &'static [&'static str] = &[
        "SET_DATA",
        "SET_LOADING",
        "TOGGLE_COMMENTS",
        "SET_REACTIONS",
        "UPDATE_REACTIONS",
        "ADD_REACTION",
        "UPDATE_REACTION",
        "DELETE_REACTION",
        "RESET_REACTIONS",
        "ADD_POST",
        "UPDATE_POST",
        "DELETE_POST",
        "SET_COMMENTS",
        "ADD_COMMENT",
        "UPDATE_COMMENT",
        "DELETE_COMMENT",
        "SET_SURVEYS",
        "ADD_SURVEY",
        "UPDATE_SURVEY",
        "DELETE_SURVEY",
    ];

    /// Parse a `{"type": ..., "payload": ...}` record. Unrecognized types become
    /// `Unknown` whatever their payload; a known type with a bad payload is an error.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned);

        match serde_json::from_value::<Action>(value) {
            Ok(action) => Ok(action),
            Err(e) => match tag {
                Some(tag) if !Self::KNOWN.contains(&tag.as_str()) => Ok(Action::Unknown),
                _ => Err(e),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SetData(_) => "SET_DATA",
            Self::SetLoading(_) => "SET_LOADING",
            Self::ToggleComments(_) => "TOGGLE_COMMENTS",
            Self::SetReactions(_) => "SET_REACTIONS",
            Self::UpdateReactions { .. } => "UPDATE_REACTIONS",
            Self::AddReaction(_) => "ADD_REACTION",
            Self::UpdateReaction { .. } => "UPDATE_REACTION",
            Self::DeleteReaction(_) => "DELETE_REACTION",
            Self::ResetReactions => "RESET_REACTIONS",
            Self::AddPost(_) => "ADD_POST",
            Self::UpdatePost(_) => "UPDATE_POST",
            Self::DeletePost(_) => "DELETE_POST",
            Self::SetComments(_) => "SET_COMMENTS",
            Self::AddComment(_) => "ADD_COMMENT",
            Self::UpdateComment(_) => "UPDATE_COMMENT",
            Self::DeleteComment(_) => "DELETE_COMMENT",
            Self::SetSurveys(_) => "SET_SURVEYS",
            Self::AddSurvey(_) => "ADD_SURVEY",
            Self::UpdateSurvey(_) => "UPDATE_SURVEY",
            Self::DeleteSurvey(_) => "DELETE_SURVEY",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Merge `incoming` into `existing` keyed by `key`. First-seen order is kept;
/// the later copy of a duplicated key wins.
pub fn merge_unique<T, K, F>(existing: Vec<T>, incoming: Vec<T>, key: F) -> Vec<T>
where
    K: Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut merged: IndexMap<K, T> = IndexMap::with_capacity(existing.len() + incoming.len());
    for item in existing.into_iter().chain(incoming) {
        merged.insert(key(&item), item);
    }
    merged.into_values().collect()
}

fn unique_reactions(reactions: Vec<Reaction>) -> Vec<Reaction> {
    merge_unique(Vec::new(), reactions, |r| (r.user, r.target))
}

fn replace_by<T, F>(items: &mut [T], item: T, same: F) -> bool
where
    F: Fn(&T, &T) -> bool,
{
    match items.iter_mut().find(|existing| same(existing, &item)) {
        Some(slot) => {
            *slot = item;
            true
        }
        None => false,
    }
}

/// Put `reaction` where `replacing` sat (or at the end), dropping every other
/// entry that shares its id or its (author, target) slot.
fn upsert_reaction(
    reactions: Vec<Reaction>,
    replacing: ReactionId,
    reaction: Reaction,
) -> Vec<Reaction> {
    let mut next = Vec::with_capacity(reactions.len() + 1);
    let mut placed = false;
    for existing in reactions {
        if existing.id == replacing {
            if !placed {
                next.push(reaction.clone());
                placed = true;
            }
        } else if existing.id != reaction.id && !existing.same_slot(&reaction) {
            next.push(existing);
        }
    }
    if !placed {
        next.push(reaction);
    }
    next
}

pub fn reduce(mut state: FeedState, action: Action) -> FeedState {
    match action {
        Action::SetData(snapshot) => {
            state.posts = merge_unique(Vec::new(), snapshot.posts, |p| p.id);
            state.reactions = unique_reactions(snapshot.reactions);
            state.comments = merge_unique(Vec::new(), snapshot.comments, |c| c.id);
            state.loading = false;
        }
        Action::SetLoading(loading) => state.loading = loading,
        Action::ToggleComments(post) => {
            if !state.expanded_comments.remove(&post) {
                state.expanded_comments.insert(post);
            }
        }
        Action::SetReactions(reactions) => state.reactions = unique_reactions(reactions),
        Action::UpdateReactions { target, summary } => {
            // A missing summary keeps what is shown.
            if let Some(summary) = summary {
                match target {
                    ReactionTarget::Post(id) => {
                        if let Some(post) = state.posts.iter_mut().find(|p| p.id == id) {
                            post.reaction_summary = summary;
                        }
                    }
                    ReactionTarget::Comment(id) => {
                        if let Some(comment) = state.comments.iter_mut().find(|c| c.id == id) {
                            comment.reaction_summary = summary;
                        }
                    }
                }
            }
        }
        Action::AddReaction(reaction) => {
            state.reactions = upsert_reaction(state.reactions, reaction.id, reaction);
        }
        Action::UpdateReaction { id, reaction } => {
            state.reactions = upsert_reaction(state.reactions, id, reaction);
        }
        Action::DeleteReaction(id) => state.reactions.retain(|r| r.id != id),
        Action::ResetReactions => state.reactions.clear(),
        Action::AddPost(post) => {
            state.posts.retain(|p| p.id != post.id);
            state.posts.insert(0, post);
        }
        Action::UpdatePost(post) => {
            replace_by(&mut state.posts, post, |a, b| a.id == b.id);
        }
        Action::DeletePost(id) => {
            let orphaned: HashSet<CommentId> = state
                .comments
                .iter()
                .filter(|c| c.post == id)
                .map(|c| c.id)
                .collect();
            state.posts.retain(|p| p.id != id);
            state.comments.retain(|c| c.post != id);
            state.reactions.retain(|r| match r.target {
                ReactionTarget::Post(post) => post != id,
                ReactionTarget::Comment(comment) => !orphaned.contains(&comment),
            });
            state.expanded_comments.remove(&id);
        }
        Action::SetComments(comments) => {
            state.comments = merge_unique(Vec::new(), comments, |c| c.id);
        }
        Action::AddComment(comment) => {
            if !replace_by(&mut state.comments, comment.clone(), |a, b| a.id == b.id) {
                state.comments.push(comment);
            }
        }
        Action::UpdateComment(comment) => {
            replace_by(&mut state.comments, comment, |a, b| a.id == b.id);
        }
        Action::DeleteComment(id) => {
            state.comments.retain(|c| c.id != id);
            state
                .reactions
                .retain(|r| r.target != ReactionTarget::Comment(id));
        }
        Action::SetSurveys(surveys) => {
            state.surveys = merge_unique(Vec::new(), surveys, |s| s.id);
        }
        Action::AddSurvey(survey) => {
            state.surveys.retain(|s| s.id != survey.id);
            state.surveys.insert(0, survey);
        }
        Action::UpdateSurvey(survey) => {
            replace_by(&mut state.surveys, survey, |a, b| a.id == b.id);
        }
        Action::DeleteSurvey(id) => state.surveys.retain(|s| s.id != id),
        Action::Unknown => {}
    }
    state
}
