//! Server payloads as they arrive from JSON endpoints.
//!
//! Field values are opaque: the client never validates them, it only routes
//! them. Presence of a key is the only check.

use serde::{Deserialize, Serialize};

/// Whatever the server sent under one payload key, usually a list of records
/// but `voted_by` is an object keyed by score.
pub type Records = serde_json::Value;

/// Recognized payload fields, in the order they are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadField {
    Posts,
    Tags,
    Votes,
    VotedBy,
    Pools,
    PoolPosts,
}

impl PayloadField {
    /// Dispatch order. Events for one payload are always emitted in this order.
    pub const ORDER: [Self; 6] =
        [Self::Posts, Self::Tags, Self::Votes, Self::VotedBy, Self::Pools, Self::PoolPosts];

    /// JSON key of the field.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Tags => "tags",
            Self::Votes => "votes",
            Self::VotedBy => "voted_by",
            Self::Pools => "pools",
            Self::PoolPosts => "pool_posts",
        }
    }
}

/// An incoming server payload.
///
/// A missing key and an explicit `null` both mean the field is absent. Any
/// other value, an empty list included, is present. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payload {
    pub posts: Option<Records>,
    pub tags: Option<Records>,
    pub votes: Option<Records>,
    pub voted_by: Option<Records>,
    pub pools: Option<Records>,
    pub pool_posts: Option<Records>,
}

impl Payload {
    /// Returns the value stored under `field`, if present.
    #[must_use]
    pub const fn field(&self, field: PayloadField) -> Option<&Records> {
        match field {
            PayloadField::Posts => self.posts.as_ref(),
            PayloadField::Tags => self.tags.as_ref(),
            PayloadField::Votes => self.votes.as_ref(),
            PayloadField::VotedBy => self.voted_by.as_ref(),
            PayloadField::Pools => self.pools.as_ref(),
            PayloadField::PoolPosts => self.pool_posts.as_ref(),
        }
    }

    /// Present fields with their values, in dispatch order.
    pub fn present(&self) -> impl Iterator<Item = (PayloadField, &Records)> + '_ {
        PayloadField::ORDER.into_iter().filter_map(|f| self.field(f).map(|v| (f, v)))
    }
}
