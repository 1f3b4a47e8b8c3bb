use std::{collections::HashMap, sync::Arc};

use crate::{
    api::{self, CommentId},
    Comment,
};

/// Flat list of the comments of one post, along with the index of comments by parent
///
/// The index is rebuilt from scratch after every change to the list, so each bucket
/// always lists its comments in the same relative order as the list itself.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommentStore {
    /// `None` until a comment list was received
    comments: Option<Vec<Arc<Comment>>>,
    by_parent: HashMap<Option<CommentId>, Vec<Arc<Comment>>>,
}

impl CommentStore {
    pub fn new() -> CommentStore {
        CommentStore::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.comments.is_some()
    }

    /// All comments, in list order
    pub fn comments(&self) -> &[Arc<Comment>] {
        self.comments.as_deref().unwrap_or(&[])
    }

    pub fn get(&self, id: &CommentId) -> Option<&Arc<Comment>> {
        self.comments().iter().find(|c| c.id == *id)
    }

    /// Replaces the whole list with comments confirmed by the server
    pub fn seed(&mut self, comments: Vec<api::Comment>) {
        self.comments = Some(
            comments
                .into_iter()
                .map(|c| Arc::new(Comment::confirmed(c)))
                .collect(),
        );
        self.reindex();
    }

    /// Like `seed`, but a missing list resets the store to its not-loaded state
    pub fn seed_from(&mut self, comments: Option<Vec<api::Comment>>) {
        match comments {
            Some(comments) => self.seed(comments),
            None => {
                self.comments = None;
                self.reindex();
            }
        }
    }

    /// Comments whose parent is `parent`, empty if there are none
    pub fn replies(&self, parent: Option<&CommentId>) -> &[Arc<Comment>] {
        self.by_parent
            .get(&parent.cloned())
            .map(|v| &v[..])
            .unwrap_or(&[])
    }

    pub fn roots(&self) -> &[Arc<Comment>] {
        self.replies(None)
    }

    /// Inserts a not-yet-confirmed comment at the front of the list
    pub fn create_local(&mut self, comment: api::Comment) {
        self.comments
            .get_or_insert_with(Vec::new)
            .insert(0, Arc::new(Comment::pending(comment)));
        self.reindex();
    }

    /// Replaces the pending comment `local_id` with its server-side version, keeping
    /// its position in the list
    pub fn confirm(&mut self, local_id: &CommentId, confirmed: api::Comment) -> bool {
        let Some(slot) = self
            .comments
            .as_mut()
            .and_then(|l| l.iter_mut().find(|c| c.is_pending() && c.id == *local_id))
        else {
            tracing::warn!(?local_id, "confirmed a comment that is not pending");
            return false;
        };
        *slot = Arc::new(Comment::confirmed(confirmed));
        self.reindex();
        true
    }

    /// Removes the pending comment `local_id`, after its submission failed
    pub fn reject(&mut self, local_id: &CommentId) -> bool {
        let Some(list) = self.comments.as_mut() else {
            return false;
        };
        let Some(pos) = list.iter().position(|c| c.is_pending() && c.id == *local_id) else {
            tracing::warn!(?local_id, "rejected a comment that is not pending");
            return false;
        };
        list.remove(pos);
        self.reindex();
        true
    }

    fn reindex(&mut self) {
        let mut by_parent: HashMap<Option<CommentId>, Vec<Arc<Comment>>> = HashMap::new();
        for c in self.comments() {
            by_parent
                .entry(c.parent_id.clone())
                .or_insert_with(Vec::new)
                .push(c.clone());
        }
        self.by_parent = by_parent;
    }
}
