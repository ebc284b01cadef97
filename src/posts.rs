// Post and comment authoring
use crate::auth::UserContext;
use crate::error::{ClientError, ClientResult};
use crate::gateway::{DynFeedApi, NewPost, PostPatch};
use crate::model::{CategoryId, Comment, CommentId, Post, PostId, User, Visibility};
use crate::session::SessionUser;
use crate::store::{Action, Store};
use crate::view::plain_text;

/// A post as composed, before it is sent.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub content: String,
    pub category: Option<CategoryId>,
    pub image: Option<String>,
    pub visibility: Visibility,
    pub comments_locked: bool,
}

impl PostDraft {
    pub fn new(content: impl Into<String>, category: CategoryId) -> Self {
        Self {
            content: content.into(),
            category: Some(category),
            image: None,
            visibility: Visibility::Public,
            comments_locked: false,
        }
    }
}

fn require_text(content: &str, what: &str) -> ClientResult<()> {
    if plain_text(content).trim().is_empty() {
        return Err(ClientError::Validation(format!("{what} cannot be empty.")));
    }
    Ok(())
}

fn require_owner(me: &SessionUser, owner: &User, what: &str) -> ClientResult<()> {
    if owner.id != me.id {
        return Err(ClientError::Forbidden(format!("only the author can change this {what}")));
    }
    Ok(())
}

/// Writes go to the backend first; the store only changes once they succeed.
pub struct PostService {
    api: DynFeedApi,
    store: Store,
    context: UserContext,
}

impl PostService {
    pub fn new(api: DynFeedApi, store: Store, context: UserContext) -> Self {
        Self {
            api,
            store,
            context,
        }
    }

    /// The post from the store, or from the backend when the feed has not loaded it.
    async fn find_post(&self, id: PostId) -> ClientResult<Post> {
        match self.store.read(|s| s.post(id).cloned()) {
            Some(post) => Ok(post),
            None => self.api.post(id).await,
        }
    }

    pub async fn publish(&self, draft: PostDraft) -> ClientResult<Post> {
        self.context.require()?;
        require_text(&draft.content, "Post content")?;
        let category = draft
            .category
            .ok_or_else(|| ClientError::Validation("Please choose a category.".into()))?;

        let post = self
            .api
            .create_post(&NewPost {
                content: draft.content,
                category,
                image: draft.image,
                visibility: draft.visibility,
                is_comment_locked: draft.comments_locked,
            })
            .await?;

        tracing::info!(post = %post.id, "Post published");
        self.store.dispatch(Action::AddPost(post.clone()));
        Ok(post)
    }

    /// Replace a post's text, and its image when `image` is given.
    pub async fn edit(&self, id: PostId, content: &str, image: Option<String>) -> ClientResult<Post> {
        let me = self.context.require()?;
        require_text(content, "Post content")?;
        require_owner(&me, &self.find_post(id).await?.user, "post")?;

        let patch = PostPatch {
            content: Some(content.to_string()),
            image,
            ..Default::default()
        };
        let post = self.api.update_post(id, &patch).await?;
        self.store.dispatch(Action::UpdatePost(post.clone()));
        Ok(post)
    }

    pub async fn toggle_comment_lock(&self, id: PostId) -> ClientResult<Post> {
        let me = self.context.require()?;
        let current = self.find_post(id).await?;
        require_owner(&me, &current.user, "post")?;

        let patch = PostPatch {
            is_comment_locked: Some(!current.is_comment_locked),
            ..Default::default()
        };
        let post = self.api.update_post(id, &patch).await?;
        tracing::info!(post = %id, locked = post.is_comment_locked, "Comment lock changed");
        self.store.dispatch(Action::UpdatePost(post.clone()));
        Ok(post)
    }

    pub async fn delete(&self, id: PostId) -> ClientResult<()> {
        let me = self.context.require()?;
        require_owner(&me, &self.find_post(id).await?.user, "post")?;

        self.api.delete_post(id).await?;
        tracing::info!(post = %id, "Post deleted");
        self.store.dispatch(Action::DeletePost(id));
        Ok(())
    }

    pub async fn add_comment(&self, post: PostId, content: &str) -> ClientResult<Comment> {
        let me = self.context.require()?;
        require_text(content, "Comment")?;
        if self.find_post(post).await?.is_comment_locked {
            return Err(ClientError::Forbidden("comments are locked on this post".into()));
        }

        let comment = self.api.create_comment(me.id, post, content.trim()).await?;
        self.store.dispatch(Action::AddComment(comment.clone()));
        Ok(comment)
    }

    pub async fn edit_comment(&self, id: CommentId, content: &str) -> ClientResult<Comment> {
        let me = self.context.require()?;
        require_text(content, "Comment")?;
        require_owner(&me, &self.api.comment(id).await?.user, "comment")?;

        let comment = self.api.update_comment(id, content.trim()).await?;
        self.store.dispatch(Action::UpdateComment(comment.clone()));
        Ok(comment)
    }

    /// Ownership is checked against the backend's copy of the comment.
    pub async fn delete_comment(&self, id: CommentId) -> ClientResult<()> {
        let me = self.context.require()?;
        require_owner(&me, &self.api.comment(id).await?.user, "comment")?;

        self.api.delete_comment(id).await?;
        tracing::info!(comment = %id, "Comment deleted");
        self.store.dispatch(Action::DeleteComment(id));
        Ok(())
    }
}
