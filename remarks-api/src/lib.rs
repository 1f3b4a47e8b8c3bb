use chrono::Utc;

mod comment;
pub use comment::{Comment, CommentId, NewComment};

mod db;
pub use db::Db;

mod error;
pub use error::Error;

mod post;
pub use post::{Post, PostId, PostSummary};

mod user;
pub use user::{User, UserId};

pub use uuid::Uuid;
pub type Time = chrono::DateTime<Utc>;

/// Name of the cookie carrying the current user's id
pub const USER_COOKIE: &str = "userId";

pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}
