use std::{fmt::Write, sync::Arc};

use remarks_client::{Comment, LoadState, PostContext};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn post(ctx: &PostContext) -> String {
    let mut out = String::new();
    match ctx.state() {
        LoadState::Pending => out.push_str("loading...\n"),
        LoadState::Failed(msg) => {
            let _ = writeln!(out, "error: {msg}");
        }
        LoadState::Loaded(post) => {
            let _ = writeln!(out, "# {}\n\n{}\n", post.title, post.body);
            if ctx.root_comments().is_empty() {
                out.push_str("(no comments)\n");
            }
            comments(&mut out, ctx, ctx.root_comments(), 0);
        }
    }
    out
}

fn comments(out: &mut String, ctx: &PostContext, list: &[Arc<Comment>], depth: usize) {
    let indent = depth * 4;
    for c in list {
        let pending = if c.is_pending() { " [sending]" } else { "" };
        let _ = writeln!(
            out,
            "{:indent$}{} ({}) #{}{pending}",
            "",
            c.user.name,
            c.created_at.format(DATE_FORMAT),
            c.id,
        );
        for line in c.message.lines() {
            let _ = writeln!(out, "{:indent$}  {line}", "");
        }
        comments(out, ctx, ctx.replies(&c.id), depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use remarks_client::api::{self, CommentId, Post, PostId, User, UserId};

    use super::*;

    fn comment(id: &str, parent: Option<&str>, message: &str) -> api::Comment {
        api::Comment {
            id: CommentId(String::from(id)),
            message: String::from(message),
            parent_id: parent.map(|p| CommentId(String::from(p))),
            created_at: chrono::Utc.timestamp_opt(1_667_556_000, 0).unwrap(),
            user: User {
                id: UserId(String::from("u")),
                name: String::from("Sally"),
            },
        }
    }

    #[test]
    fn renders_nested_tree() {
        let mut ctx = PostContext::new();
        assert_eq!(post(&ctx), "loading...\n");

        let t = ctx.begin_load(PostId(String::from("5")));
        ctx.finish_load(
            &t,
            Ok(Post {
                id: PostId(String::from("5")),
                title: String::from("Title"),
                body: String::from("Body"),
                comments: Some(vec![
                    comment("2", Some("1"), "reply"),
                    comment("1", None, "root"),
                ]),
            }),
        );
        ctx.create_local_comment(comment("3", Some("2"), "new"));
        assert_eq!(
            post(&ctx),
            "# Title\n\nBody\n\n\
             Sally (2022-11-04 10:00) #1\n  root\n\
             \x20   Sally (2022-11-04 10:00) #2\n      reply\n\
             \x20       Sally (2022-11-04 10:00) #3 [sending]\n          new\n"
        );
    }

    #[test]
    fn renders_error() {
        let mut ctx = PostContext::new();
        let t = ctx.begin_load(PostId(String::from("5")));
        ctx.finish_load(&t, Err(anyhow::anyhow!("Unknown error: post 5 not found")));
        assert_eq!(post(&ctx), "error: Unknown error: post 5 not found\n");
    }
}
