use std::sync::Arc;

use crate::{
    api::{self, CommentId, Post, PostId},
    Comment, CommentStore, FetchTicket, LoadState, PostLoader, PostSource,
};

/// Everything a post page needs: the post being loaded and its comment tree
#[derive(Debug, Default)]
pub struct PostContext {
    loader: PostLoader,
    comments: CommentStore,
}

impl PostContext {
    pub fn new() -> PostContext {
        PostContext::default()
    }

    pub fn post_id(&self) -> Option<&PostId> {
        self.loader.post_id()
    }

    pub fn state(&self) -> &LoadState {
        self.loader.state()
    }

    pub fn post(&self) -> Option<&Arc<Post>> {
        self.loader.post()
    }

    pub fn comments(&self) -> &CommentStore {
        &self.comments
    }

    /// Empty unless the latest load succeeded
    pub fn root_comments(&self) -> &[Arc<Comment>] {
        match self.state() {
            LoadState::Loaded(_) => self.comments.roots(),
            _ => &[],
        }
    }

    pub fn replies(&self, parent: &CommentId) -> &[Arc<Comment>] {
        match self.state() {
            LoadState::Loaded(_) => self.comments.replies(Some(parent)),
            _ => &[],
        }
    }

    pub fn begin_load(&mut self, post: PostId) -> FetchTicket {
        if self.loader.post_id() != Some(&post) {
            self.comments = CommentStore::new();
        }
        self.loader.load(post)
    }

    /// Returns whether the result was for the latest fetch, in which case the
    /// comment store was seeded from it, or emptied if the fetch failed
    pub fn finish_load(&mut self, ticket: &FetchTicket, res: anyhow::Result<Post>) -> bool {
        if !self.loader.complete(ticket, res) {
            return false;
        }
        match self.loader.state() {
            LoadState::Loaded(post) => self.comments.seed_from(post.comments.clone()),
            _ => self.comments.seed_from(None),
        }
        true
    }

    pub async fn fetch_with<S>(&mut self, source: &S, post: PostId) -> &LoadState
    where
        S: PostSource + ?Sized + Sync,
    {
        let ticket = self.begin_load(post);
        let res = source.fetch_post(ticket.post()).await;
        self.finish_load(&ticket, res);
        self.state()
    }

    pub fn create_local_comment(&mut self, comment: api::Comment) {
        self.comments.create_local(comment)
    }

    pub fn confirm_local_comment(&mut self, local_id: &CommentId, comment: api::Comment) -> bool {
        self.comments.confirm(local_id, comment)
    }

    pub fn reject_local_comment(&mut self, local_id: &CommentId) -> bool {
        self.comments.reject(local_id)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use async_trait::async_trait;
    use futures::executor::block_on;

    use super::*;
    use crate::test_util::comment;

    struct FixedSource(Option<Post>);

    #[async_trait]
    impl PostSource for FixedSource {
        async fn fetch_post(&self, post: &PostId) -> anyhow::Result<Post> {
            self.0
                .clone()
                .filter(|p| p.id == *post)
                .ok_or_else(|| anyhow!("Unknown error: post {post} not found"))
        }
    }

    fn post(id: &str, comments: Option<Vec<api::Comment>>) -> Post {
        Post {
            id: PostId(String::from(id)),
            title: String::from("Hello"),
            body: String::from("World"),
            comments,
        }
    }

    #[test]
    fn fetch_seeds_comments() {
        let source = FixedSource(Some(post(
            "5",
            Some(vec![comment("2", Some("1")), comment("1", None)]),
        )));
        let mut ctx = PostContext::new();
        block_on(ctx.fetch_with(&source, PostId(String::from("5"))));
        assert!(matches!(ctx.state(), LoadState::Loaded(_)));
        assert_eq!(ctx.root_comments().len(), 1);
        assert_eq!(ctx.replies(&CommentId(String::from("1"))).len(), 1);
    }

    #[test]
    fn fetch_failure_is_surfaced() {
        let source = FixedSource(None);
        let mut ctx = PostContext::new();
        let state = block_on(ctx.fetch_with(&source, PostId(String::from("5")))).clone();
        assert_eq!(
            state,
            LoadState::Failed(String::from("Unknown error: post 5 not found"))
        );
        assert!(ctx.root_comments().is_empty());
    }

    #[test]
    fn stale_load_does_not_seed() {
        let mut ctx = PostContext::new();
        let first = ctx.begin_load(PostId(String::from("1")));
        let second = ctx.begin_load(PostId(String::from("2")));
        assert!(!ctx.finish_load(&first, Ok(post("1", Some(vec![comment("a", None)])))));
        assert!(!ctx.comments().is_loaded());
        assert!(ctx.finish_load(&second, Ok(post("2", Some(vec![comment("b", None)])))));
        assert_eq!(ctx.root_comments()[0].id, CommentId(String::from("b")));
    }

    #[test]
    fn switching_post_drops_previous_comments() {
        let mut ctx = PostContext::new();
        let t = ctx.begin_load(PostId(String::from("1")));
        ctx.finish_load(&t, Ok(post("1", Some(vec![comment("a", None)]))));
        assert_eq!(ctx.root_comments().len(), 1);

        ctx.begin_load(PostId(String::from("2")));
        assert!(!ctx.comments().is_loaded());
        assert!(ctx.root_comments().is_empty());
    }

    #[test]
    fn failed_reload_hides_previous_comments() {
        let mut ctx = PostContext::new();
        let t = ctx.begin_load(PostId(String::from("5")));
        ctx.finish_load(
            &t,
            Ok(post("5", Some(vec![comment("2", Some("1")), comment("1", None)]))),
        );
        assert_eq!(ctx.root_comments().len(), 1);

        let t = ctx.begin_load(PostId(String::from("5")));
        assert!(ctx.root_comments().is_empty());
        assert!(ctx.replies(&CommentId(String::from("1"))).is_empty());

        assert!(ctx.finish_load(&t, Err(anyhow!("connection reset"))));
        assert_eq!(
            ctx.state(),
            &LoadState::Failed(String::from("connection reset"))
        );
        assert!(!ctx.comments().is_loaded());
        assert!(ctx.root_comments().is_empty());
        assert!(ctx.replies(&CommentId(String::from("1"))).is_empty());
    }

    #[test]
    fn post_without_comment_list_is_not_loaded() {
        let mut ctx = PostContext::new();
        let t = ctx.begin_load(PostId(String::from("1")));
        ctx.finish_load(&t, Ok(post("1", None)));
        assert!(ctx.post().is_some());
        assert!(!ctx.comments().is_loaded());
    }

    #[test]
    fn optimistic_comment_lifecycle() {
        let mut ctx = PostContext::new();
        let t = ctx.begin_load(PostId(String::from("1")));
        ctx.finish_load(&t, Ok(post("1", Some(vec![comment("1", None)]))));

        ctx.create_local_comment(comment("tmp", None));
        assert_eq!(ctx.root_comments().len(), 2);
        assert!(ctx.root_comments()[0].is_pending());

        let tmp = CommentId(String::from("tmp"));
        assert!(ctx.confirm_local_comment(&tmp, comment("2", None)));
        assert_eq!(ctx.root_comments()[0].id, CommentId(String::from("2")));

        ctx.create_local_comment(comment("tmp2", Some("2")));
        assert!(ctx.reject_local_comment(&CommentId(String::from("tmp2"))));
        assert!(ctx.replies(&CommentId(String::from("2"))).is_empty());
    }
}
