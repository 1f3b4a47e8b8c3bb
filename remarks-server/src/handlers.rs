use std::sync::Arc;

use anyhow::{anyhow, Context};
use axum::{
    extract::{Path, State},
    Json,
};
use remarks_api::{validate_string, Comment, Db, NewComment, Post, PostId, PostSummary};

use crate::{extractors::*, Error};

pub async fn list_posts(State(db): State<Arc<dyn Db>>) -> Result<Json<Vec<PostSummary>>, Error> {
    Ok(Json(db.list_posts().await.context("listing posts")?))
}

pub async fn fetch_post(
    State(db): State<Arc<dyn Db>>,
    Path(post): Path<PostId>,
) -> Result<Json<Post>, Error> {
    validate_string(&post.0)?;
    Ok(Json(
        db.fetch_post(&post)
            .await
            .with_context(|| format!("fetching post {post}"))?
            .ok_or_else(|| anyhow!("post {post} not found"))?,
    ))
}

pub async fn create_comment(
    Auth(user): Auth,
    State(db): State<Arc<dyn Db>>,
    Path(post): Path<PostId>,
    Json(data): Json<NewComment>,
) -> Result<Json<Comment>, Error> {
    let message = data.validate()?;
    validate_string(&post.0)?;
    let comment = db
        .create_comment(&post, &user, message, data.parent_id.as_ref())
        .await
        .with_context(|| format!("creating comment on post {post} for {user}"))?;
    tracing::debug!(%post, comment = %comment.id, "created comment");
    Ok(Json(comment))
}
