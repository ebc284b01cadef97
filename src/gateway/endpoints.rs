// Resource paths, relative to the configured base URL
use crate::model::{CommentId, EventId, PostId, ReactionId, ReactionTarget, SurveyId, UserId};

pub const TOKEN: &str = "o/token/";
pub const USERS: &str = "users/";
pub const CURRENT_USER: &str = "users/current-user/";
pub const UPDATE_USER: &str = "users/update/";
pub const CHANGE_PASSWORD: &str = "users/change-password/";
pub const ROLES: &str = "roles/";
pub const PROFILE: &str = "profile/";
pub const POSTS: &str = "posts/";
pub const CATEGORIES: &str = "categories/";
pub const COMMENTS: &str = "comments/";
pub const REACTIONS: &str = "reactions/";
pub const SURVEYS: &str = "surveys/";
pub const SURVEY_RESPONSES: &str = "survey-responses/";
pub const NOTIFICATIONS: &str = "notifications/";

pub fn profile_of(user: UserId) -> String {
    format!("{PROFILE}{user}/")
}

pub fn post_detail(id: PostId) -> String {
    format!("{POSTS}{id}/")
}

pub fn comment_detail(id: CommentId) -> String {
    format!("{COMMENTS}{id}/")
}

pub fn reaction_detail(id: ReactionId) -> String {
    format!("{REACTIONS}{id}/")
}

pub fn survey_detail(id: SurveyId) -> String {
    format!("{SURVEYS}{id}/")
}

pub fn event_detail(id: EventId) -> String {
    format!("events/{id}/")
}

pub fn reactions_summary(target: ReactionTarget) -> String {
    match target {
        ReactionTarget::Post(id) => format!("{}reactions-summary/", post_detail(id)),
        ReactionTarget::Comment(id) => format!("{}reactions-summary/", comment_detail(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_paths_end_with_slash() {
        assert_eq!(post_detail(PostId(4)), "posts/4/");
        assert_eq!(comment_detail(CommentId(9)), "comments/9/");
        assert_eq!(survey_detail(SurveyId(2)), "surveys/2/");
    }

    #[test]
    fn summary_path_follows_target_kind() {
        assert_eq!(
            reactions_summary(ReactionTarget::Post(PostId(1))),
            "posts/1/reactions-summary/"
        );
        assert_eq!(
            reactions_summary(ReactionTarget::Comment(CommentId(3))),
            "comments/3/reactions-summary/"
        );
    }
}
