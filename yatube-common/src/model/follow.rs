use crate::model::{Id, user::UserMarker};

/// `user` wants the posts of `author` in their follow feed.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Follow {
    user: Id<UserMarker>,
    author: Id<UserMarker>,
}

impl Follow {
    /// Returns `None` when a user tries to follow themselves.
    #[must_use]
    pub fn new(user: Id<UserMarker>, author: Id<UserMarker>) -> Option<Self> {
        (user != author).then_some(Self { user, author })
    }

    #[must_use]
    pub fn user(self) -> Id<UserMarker> {
        self.user
    }

    #[must_use]
    pub fn author(self) -> Id<UserMarker> {
        self.author
    }
}
