use anyhow::{anyhow, bail, Context};
use remarks_client::{
    api::{CommentId, NewComment, PostId, User, UserId},
    Comment, LoadState, PostContext,
};

mod api;
mod render;

use api::HttpApi;

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, env = "REMARKS_HOST", default_value = "http://127.0.0.1:3000")]
    host: String,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// List all posts
    List,

    /// Show a post along with its comments
    Show {
        /// Post id
        post: String,
    },

    /// Comment on a post
    Comment {
        /// Post id
        post: String,

        /// Comment text
        message: String,

        /// Id of the comment to reply to
        #[structopt(long)]
        parent: Option<String>,
    },
}

async fn load(api: &HttpApi, ctx: &mut PostContext, post: PostId) -> anyhow::Result<()> {
    println!("{}", render::post(ctx).trim_end());
    match ctx.fetch_with(api, post).await {
        LoadState::Failed(msg) => Err(anyhow!("{msg}")),
        _ => Ok(()),
    }
}

async fn comment(
    api: &HttpApi,
    post: PostId,
    message: String,
    parent: Option<CommentId>,
) -> anyhow::Result<()> {
    let mut ctx = PostContext::new();
    load(api, &mut ctx, post.clone()).await?;
    if let Some(parent) = &parent {
        if ctx.comments().get(parent).is_none() {
            bail!("post {post} has no comment {parent}");
        }
    }

    // the server attributes the comment, this is only shown until it answers
    let author = User {
        id: UserId(String::new()),
        name: String::from("you"),
    };
    let draft = Comment::draft(message.clone(), parent.clone(), author);
    let local_id = draft.id.clone();
    ctx.create_local_comment(draft);
    tracing::debug!(%local_id, "inserted local comment");

    match api
        .create_comment(&post, &NewComment::new(message, parent))
        .await
    {
        Ok(c) => {
            ctx.confirm_local_comment(&local_id, c);
            print!("{}", render::post(&ctx));
            Ok(())
        }
        Err(e) => {
            ctx.reject_local_comment(&local_id);
            print!("{}", render::post(&ctx));
            Err(e)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let api = HttpApi::new(opt.host)?;

    match opt.cmd {
        Command::List => {
            for p in api.list_posts().await? {
                println!("{}\t{}", p.id, p.title);
            }
        }
        Command::Show { post } => {
            let mut ctx = PostContext::new();
            load(&api, &mut ctx, PostId(post)).await?;
            print!("{}", render::post(&ctx));
        }
        Command::Comment {
            post,
            message,
            parent,
        } => {
            comment(&api, PostId(post), message, parent.map(CommentId))
                .await
                .context("commenting")?;
        }
    }

    Ok(())
}
