use async_trait::async_trait;

use crate::{Comment, CommentId, Post, PostId, PostSummary, User, UserId};

/// Storage backend of the server
#[async_trait]
pub trait Db: Send + Sync {
    async fn find_user_by_name(&self, name: &str) -> anyhow::Result<Option<User>>;

    async fn list_posts(&self) -> anyhow::Result<Vec<PostSummary>>;

    /// The returned post always carries its comments, most recent first
    async fn fetch_post(&self, post: &PostId) -> anyhow::Result<Option<Post>>;

    async fn create_comment(
        &self,
        post: &PostId,
        author: &UserId,
        message: &str,
        parent_id: Option<&CommentId>,
    ) -> anyhow::Result<Comment>;
}
