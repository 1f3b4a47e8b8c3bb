use anyhow::Context;
use async_trait::async_trait;
use remarks_client::{
    api::{self, Comment, NewComment, Post, PostId, PostSummary},
    PostSource,
};

pub struct HttpApi {
    client: reqwest::Client,
    host: String,
}

impl HttpApi {
    /// The client keeps the session cookie handed out by the server
    pub fn new(host: String) -> anyhow::Result<HttpApi> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .context("building http client")?;
        Ok(HttpApi { client, host })
    }

    pub async fn list_posts(&self) -> anyhow::Result<Vec<PostSummary>> {
        let resp = self
            .client
            .get(format!("{}/posts", self.host))
            .send()
            .await
            .context("fetching post list")?;
        parse_response(resp).await
    }

    pub async fn create_comment(&self, post: &PostId, c: &NewComment) -> anyhow::Result<Comment> {
        let resp = self
            .client
            .post(format!("{}/posts/{}/comments", self.host, post))
            .json(c)
            .send()
            .await
            .with_context(|| format!("submitting comment to post {post}"))?;
        parse_response(resp).await
    }
}

#[async_trait]
impl PostSource for HttpApi {
    async fn fetch_post(&self, post: &PostId) -> anyhow::Result<Post> {
        let resp = self
            .client
            .get(format!("{}/posts/{}", self.host, post))
            .send()
            .await
            .with_context(|| format!("fetching post {post}"))?;
        parse_response(resp).await
    }
}

async fn parse_response<T>(resp: reqwest::Response) -> anyhow::Result<T>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let status = resp.status();
    if status.is_success() {
        return resp.json().await.context("parsing server response");
    }
    let body = resp.bytes().await.context("reading error response")?;
    let err = api::Error::parse(&body).unwrap_or_else(|_| {
        api::Error::Unknown(format!(
            "server answered {status}: {}",
            String::from_utf8_lossy(&body)
        ))
    });
    Err(err.into())
}
