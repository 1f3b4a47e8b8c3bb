use std::ops::Deref;

use chrono::Utc;

use crate::api::{self, CommentId, User};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CommentStatus {
    /// Known to the server
    Confirmed,

    /// Inserted locally, server answer not received yet
    Pending,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Comment {
    pub data: api::Comment,
    pub status: CommentStatus,
}

impl Comment {
    pub fn confirmed(data: api::Comment) -> Comment {
        Comment {
            data,
            status: CommentStatus::Confirmed,
        }
    }

    pub fn pending(data: api::Comment) -> Comment {
        Comment {
            data,
            status: CommentStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == CommentStatus::Pending
    }

    /// Builds the record to insert locally while the submission is in flight,
    /// with a client-generated id and the current time
    pub fn draft(message: String, parent_id: Option<CommentId>, author: User) -> api::Comment {
        api::Comment {
            id: CommentId::generate(),
            message,
            parent_id,
            created_at: Utc::now(),
            user: author,
        }
    }
}

impl Deref for Comment {
    type Target = api::Comment;

    fn deref(&self) -> &api::Comment {
        &self.data
    }
}
