use anyhow::Context;
use async_trait::async_trait;
use remarks_api::{
    Comment, CommentId, Db, Post, PostId, PostSummary, Time, User, UserId,
};
use sqlx::{postgres::PgRow, Row};

pub struct PostgresDb(sqlx::PgPool);

impl PostgresDb {
    pub fn new(pool: sqlx::PgPool) -> PostgresDb {
        PostgresDb(pool)
    }
}

/// Expects the columns selected by the comment queries below
fn comment_from_row(row: &PgRow) -> anyhow::Result<Comment> {
    Ok(Comment {
        id: CommentId(row.try_get("id").context("retrieving the id field")?),
        message: row
            .try_get("message")
            .context("retrieving the message field")?,
        parent_id: row
            .try_get::<Option<String>, _>("parent_id")
            .context("retrieving the parent_id field")?
            .map(CommentId),
        created_at: row
            .try_get::<Time, _>("created_at")
            .context("retrieving the created_at field")?,
        user: User {
            id: UserId(
                row.try_get("user_id")
                    .context("retrieving the user_id field")?,
            ),
            name: row
                .try_get("user_name")
                .context("retrieving the user_name field")?,
        },
    })
}

#[async_trait]
impl Db for PostgresDb {
    async fn find_user_by_name(&self, name: &str) -> anyhow::Result<Option<User>> {
        // byte order on ids, like the mock's BTreeMap
        let row = sqlx::query(
            r#"SELECT id, name FROM users WHERE name = $1 ORDER BY id COLLATE "C" LIMIT 1"#,
        )
        .bind(name)
        .fetch_optional(&self.0)
        .await
        .context("querying users table")?;
        row.map(|u| -> anyhow::Result<User> {
            Ok(User {
                id: UserId(u.try_get("id").context("retrieving the id field")?),
                name: u.try_get("name").context("retrieving the name field")?,
            })
        })
        .transpose()
    }

    async fn list_posts(&self) -> anyhow::Result<Vec<PostSummary>> {
        sqlx::query(r#"SELECT id, title FROM posts ORDER BY id COLLATE "C""#)
            .fetch_all(&self.0)
            .await
            .context("querying posts table")?
            .iter()
            .map(|p| -> anyhow::Result<PostSummary> {
                Ok(PostSummary {
                    id: PostId(p.try_get("id").context("retrieving the id field")?),
                    title: p.try_get("title").context("retrieving the title field")?,
                })
            })
            .collect()
    }

    async fn fetch_post(&self, post: &PostId) -> anyhow::Result<Option<Post>> {
        let Some(p) = sqlx::query("SELECT title, body FROM posts WHERE id = $1")
            .bind(&post.0)
            .fetch_optional(&self.0)
            .await
            .context("querying posts table")?
        else {
            return Ok(None);
        };
        let comments = sqlx::query(
            "
                SELECT
                    c.id,
                    c.message,
                    c.parent_id,
                    c.created_at,
                    u.id AS user_id,
                    u.name AS user_name
                FROM comments c
                INNER JOIN users u
                    ON u.id = c.user_id
                WHERE c.post_id = $1
                ORDER BY c.created_at DESC
            ",
        )
        .bind(&post.0)
        .fetch_all(&self.0)
        .await
        .context("querying comments table")?
        .iter()
        .map(comment_from_row)
        .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Some(Post {
            id: post.clone(),
            title: p.try_get("title").context("retrieving the title field")?,
            body: p.try_get("body").context("retrieving the body field")?,
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
        let row = sqlx::query(
            "
                WITH c AS (
                    INSERT INTO comments (id, message, user_id, post_id, parent_id)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id, message, parent_id, created_at, user_id
                )
                SELECT
                    c.id,
                    c.message,
                    c.parent_id,
                    c.created_at,
                    u.id AS user_id,
                    u.name AS user_name
                FROM c
                INNER JOIN users u
                    ON u.id = c.user_id
            ",
        )
        .bind(CommentId::generate().0)
        .bind(message)
        .bind(&author.0)
        .bind(&post.0)
        .bind(parent_id.map(|p| &p.0))
        .fetch_one(&self.0)
        .await
        .context("inserting into comments table")?;
        comment_from_row(&row)
    }
}
