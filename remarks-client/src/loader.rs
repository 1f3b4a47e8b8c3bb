use std::sync::Arc;

use async_trait::async_trait;

use crate::api::{Post, PostId};

/// Where posts get fetched from
#[async_trait]
pub trait PostSource {
    async fn fetch_post(&self, post: &PostId) -> anyhow::Result<Post>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LoadState {
    Pending,
    Failed(String),
    Loaded(Arc<Post>),
}

/// Handed out for each fetch, to be given back along with its result
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchTicket {
    generation: u64,
    post: PostId,
}

impl FetchTicket {
    pub fn post(&self) -> &PostId {
        &self.post
    }
}

/// Tracks the loading of the currently displayed post
///
/// Only the result of the latest fetch may change the state: any result for an
/// earlier ticket is dropped, even if it arrives after the latest one.
#[derive(Debug)]
pub struct PostLoader {
    generation: u64,
    post: Option<PostId>,
    state: LoadState,
}

impl PostLoader {
    pub fn new() -> PostLoader {
        PostLoader {
            generation: 0,
            post: None,
            state: LoadState::Pending,
        }
    }

    /// Id of the post currently requested
    pub fn post_id(&self) -> Option<&PostId> {
        self.post.as_ref()
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn post(&self) -> Option<&Arc<Post>> {
        match &self.state {
            LoadState::Loaded(p) => Some(p),
            _ => None,
        }
    }

    pub fn load(&mut self, post: PostId) -> FetchTicket {
        self.generation += 1;
        self.post = Some(post.clone());
        self.state = LoadState::Pending;
        FetchTicket {
            generation: self.generation,
            post,
        }
    }

    /// Returns whether the result was applied
    pub fn complete(&mut self, ticket: &FetchTicket, res: anyhow::Result<Post>) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                post = %ticket.post,
                generation = ticket.generation,
                latest = self.generation,
                "dropping result of superseded fetch"
            );
            return false;
        }
        self.state = match res {
            Ok(post) => LoadState::Loaded(Arc::new(post)),
            Err(err) => {
                tracing::info!(post = %ticket.post, "failed loading post: {err:#}");
                LoadState::Failed(format!("{err:#}"))
            }
        };
        true
    }
}

impl Default for PostLoader {
    fn default() -> PostLoader {
        PostLoader::new()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    fn post(id: &str) -> Post {
        Post {
            id: PostId(String::from(id)),
            title: format!("title {id}"),
            body: String::from("body"),
            comments: Some(vec![]),
        }
    }

    #[test]
    fn starts_pending() {
        let loader = PostLoader::new();
        assert_eq!(loader.state(), &LoadState::Pending);
        assert_eq!(loader.post_id(), None);
    }

    #[test]
    fn loads_post() {
        let mut loader = PostLoader::new();
        let ticket = loader.load(PostId(String::from("1")));
        assert_eq!(loader.state(), &LoadState::Pending);
        assert!(loader.complete(&ticket, Ok(post("1"))));
        assert_eq!(loader.post().map(|p| &p.title as &str), Some("title 1"));
    }

    #[test]
    fn failure_keeps_message() {
        let mut loader = PostLoader::new();
        let ticket = loader.load(PostId(String::from("1")));
        assert!(loader.complete(&ticket, Err(anyhow!("connection refused"))));
        assert_eq!(
            loader.state(),
            &LoadState::Failed(String::from("connection refused"))
        );
    }

    #[test]
    fn stale_results_are_dropped() {
        let mut loader = PostLoader::new();
        let first = loader.load(PostId(String::from("1")));
        let second = loader.load(PostId(String::from("2")));
        assert_eq!(second.post(), &PostId(String::from("2")));

        assert!(!loader.complete(&first, Ok(post("1"))));
        assert_eq!(loader.state(), &LoadState::Pending);

        assert!(loader.complete(&second, Ok(post("2"))));
        assert!(!loader.complete(&first, Err(anyhow!("too late"))));
        assert_eq!(loader.post().map(|p| &p.id.0 as &str), Some("2"));
    }

    #[test]
    fn reloading_same_post_supersedes_too() {
        let mut loader = PostLoader::new();
        let first = loader.load(PostId(String::from("1")));
        let second = loader.load(PostId(String::from("1")));
        assert!(!loader.complete(&first, Err(anyhow!("old"))));
        assert!(loader.complete(&second, Ok(post("1"))));
    }
}
