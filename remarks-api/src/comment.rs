use std::fmt;

use uuid::Uuid;

use crate::{Error, Time, User};

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct CommentId(pub String);

impl CommentId {
    pub fn generate() -> CommentId {
        CommentId(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub message: String,

    /// `None` for root comments
    #[serde(rename = "parentId")]
    pub parent_id: Option<CommentId>,

    pub created_at: Time,
    pub user: User,
}

/// Body of a comment submission
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(rename = "parentId", default)]
    pub parent_id: Option<CommentId>,
}

impl NewComment {
    pub fn new(message: String, parent_id: Option<CommentId>) -> NewComment {
        NewComment {
            message: Some(message),
            parent_id,
        }
    }

    /// Returns the message to be stored
    pub fn validate(&self) -> Result<&str, Error> {
        let message = match self.message.as_deref() {
            None | Some("") => return Err(Error::MessageRequired),
            Some(message) => message,
        };
        crate::validate_string(message)?;
        if let Some(parent) = &self.parent_id {
            crate::validate_string(&parent.0)?;
        }
        Ok(message)
    }
}
