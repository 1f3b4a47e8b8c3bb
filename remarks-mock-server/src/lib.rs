use std::collections::BTreeMap;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use remarks_api::{
    Comment, CommentId, Db, Post, PostId, PostSummary, Time, User, UserId, Uuid,
};
use tokio::sync::RwLock;

/// In-memory storage, behaving like the postgres one
pub struct MockDb(RwLock<MockData>);

#[derive(Debug, Default)]
struct MockData {
    users: BTreeMap<UserId, User>,
    posts: BTreeMap<PostId, MockPost>,
}

#[derive(Debug)]
struct MockPost {
    title: String,
    body: String,
    /// In insertion order
    comments: Vec<MockComment>,
}

#[derive(Debug)]
struct MockComment {
    id: CommentId,
    message: String,
    parent_id: Option<CommentId>,
    created_at: Time,
    user_id: UserId,
}

impl MockDb {
    pub fn new() -> MockDb {
        MockDb(RwLock::new(MockData::default()))
    }

    pub async fn add_user(&self, name: &str) -> UserId {
        let id = UserId(Uuid::new_v4().to_string());
        self.0.write().await.users.insert(
            id.clone(),
            User {
                id: id.clone(),
                name: String::from(name),
            },
        );
        id
    }

    pub async fn add_post(&self, id: &str, title: &str, body: &str) -> PostId {
        let id = PostId(String::from(id));
        self.0.write().await.posts.insert(
            id.clone(),
            MockPost {
                title: String::from(title),
                body: String::from(body),
                comments: Vec::new(),
            },
        );
        id
    }

    /// Return the number of comments stored across all posts
    pub async fn test_num_comments(&self) -> usize {
        self.0
            .read()
            .await
            .posts
            .values()
            .map(|p| p.comments.len())
            .sum()
    }
}

impl Default for MockDb {
    fn default() -> MockDb {
        MockDb::new()
    }
}

impl MockData {
    fn comment(&self, c: &MockComment) -> anyhow::Result<Comment> {
        let user = self
            .users
            .get(&c.user_id)
            .ok_or_else(|| anyhow!("comment {} references unknown user {}", c.id, c.user_id))?;
        Ok(Comment {
            id: c.id.clone(),
            message: c.message.clone(),
            parent_id: c.parent_id.clone(),
            created_at: c.created_at,
            user: user.clone(),
        })
    }
}

#[async_trait]
impl Db for MockDb {
    async fn find_user_by_name(&self, name: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .0
            .read()
            .await
            .users
            .values()
            .find(|u| u.name == name)
            .cloned())
    }

    async fn list_posts(&self) -> anyhow::Result<Vec<PostSummary>> {
        Ok(self
            .0
            .read()
            .await
            .posts
            .iter()
            .map(|(id, p)| PostSummary {
                id: id.clone(),
                title: p.title.clone(),
            })
            .collect())
    }

    async fn fetch_post(&self, post: &PostId) -> anyhow::Result<Option<Post>> {
        let data = self.0.read().await;
        let Some(p) = data.posts.get(post) else {
            return Ok(None);
        };
        let mut comments = p
            .comments
            .iter()
            .map(|c| data.comment(c))
            .collect::<anyhow::Result<Vec<_>>>()?;
        // stable, so same-date comments stay most-recently-inserted first
        comments.reverse();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Some(Post {
            id: post.clone(),
            title: p.title.clone(),
            body: p.body.clone(),
            comments: Some(comments),
        }))
    }

    async fn create_comment(
        &self,
        post: &PostId,
        author: &UserId,
        message: &str,
        parent_id: Option<&CommentId>,
    ) -> anyhow::Result<Comment> {
        let mut data = self.0.write().await;
        let user = data
            .users
            .get(author)
            .cloned()
            .ok_or_else(|| anyhow!("violates foreign key constraint: unknown user {author}"))?;
        let p = data
            .posts
            .get_mut(post)
            .ok_or_else(|| anyhow!("violates foreign key constraint: unknown post {post}"))?;
        if let Some(parent) = parent_id {
            if !p.comments.iter().any(|c| c.id == *parent) {
                return Err(anyhow!(
                    "violates foreign key constraint: unknown parent comment {parent}"
                ));
            }
        }
        let c = MockComment {
            id: CommentId::generate(),
            message: String::from(message),
            parent_id: parent_id.cloned(),
            created_at: Utc::now(),
            user_id: author.clone(),
        };
        let res = Comment {
            id: c.id.clone(),
            message: c.message.clone(),
            parent_id: c.parent_id.clone(),
            created_at: c.created_at,
            user,
        };
        p.comments.push(c);
        Ok(res)
    }
}
