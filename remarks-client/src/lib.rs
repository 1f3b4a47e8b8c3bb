mod comment;
pub use comment::{Comment, CommentStatus};

mod context;
pub use context::PostContext;

mod loader;
pub use loader::{FetchTicket, LoadState, PostLoader, PostSource};

mod store;
pub use store::CommentStore;

pub mod api {
    pub use remarks_api::*;
}

#[cfg(test)]
pub(crate) mod test_util {
    use chrono::TimeZone;

    use crate::api::{Comment, CommentId, Time, User, UserId};

    pub fn date(i: i64) -> Time {
        chrono::Utc.timestamp_opt(1_667_556_000 + i, 0).unwrap()
    }

    pub fn comment(id: &str, parent: Option<&str>) -> Comment {
        Comment {
            id: CommentId(String::from(id)),
            message: format!("message {id}"),
            parent_id: parent.map(|p| CommentId(String::from(p))),
            created_at: date(0),
            user: User {
                id: UserId(String::from("sally")),
                name: String::from("Sally"),
            },
        }
    }

    /// Comment `i` gets id `i` and, if any, the parent `p % 8`
    pub fn comments_from_shape(shape: &[Option<u8>]) -> Vec<Comment> {
        shape
            .iter()
            .enumerate()
            .map(|(i, p)| {
                comment(
                    &i.to_string(),
                    p.map(|p| (p % 8).to_string()).as_deref(),
                )
            })
            .collect()
    }
}
