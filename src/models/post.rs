use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::group::GroupRef;

/// Row of the `posts` table. `author_id` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: i64,
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub author_id: i64,
    pub group_id: Option<i64>,
}

/// The only fields an edit may touch.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub text: String,
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: i64,
    pub username: String,
}

/// Post joined with its author and group, as listed and shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostView {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: AuthorRef,
    pub group: Option<GroupRef>,
}

impl PostView {
    pub fn to_post(&self) -> Post {
        Post {
            id: self.id,
            text: self.text.clone(),
            pub_date: self.pub_date,
            author_id: self.author.id,
            group_id: self.group.as_ref().map(|g| g.id),
        }
    }
}

/// Which posts a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(i64),
    Author(i64),
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            PostFilter::All => true,
            PostFilter::Group(id) => post.group_id == Some(*id),
            PostFilter::Author(id) => post.author_id == *id,
        }
    }
}
