//! Closed set of topics and their typed payloads.

use crate::error::DispatchError;
use moe_domain::payload::{PayloadField, Records};
use moe_event_bus::Routed;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

const READY_SUFFIX: &str = ":ready";

/// Every topic published by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// `post:add`
    PostAdd,
    /// `tag:add`
    TagAdd,
    /// `vote:add`
    VoteAdd,
    /// `vote:add_user_list`
    VoteAddUserList,
    /// `pool:add`
    PoolAdd,
    /// `pool:add_post`
    PoolAddPost,
    /// `<path>:ready`, published once per successful request to `path`.
    Ready(String),
}

impl Topic {
    /// Wire name of the topic.
    #[must_use]
    pub fn name(&self) -> Cow<'static, str> {
        match self {
            Self::PostAdd => Cow::Borrowed("post:add"),
            Self::TagAdd => Cow::Borrowed("tag:add"),
            Self::VoteAdd => Cow::Borrowed("vote:add"),
            Self::VoteAddUserList => Cow::Borrowed("vote:add_user_list"),
            Self::PoolAdd => Cow::Borrowed("pool:add"),
            Self::PoolAddPost => Cow::Borrowed("pool:add_post"),
            Self::Ready(path) => Cow::Owned(format!("{path}{READY_SUFFIX}")),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Topic {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "post:add" => Self::PostAdd,
            "tag:add" => Self::TagAdd,
            "vote:add" => Self::VoteAdd,
            "vote:add_user_list" => Self::VoteAddUserList,
            "pool:add" => Self::PoolAdd,
            "pool:add_post" => Self::PoolAddPost,
            other => match other.strip_suffix(READY_SUFFIX) {
                Some(path) if !path.is_empty() => Self::Ready(path.to_owned()),
                _ => {
                    return Err(DispatchError::UnknownTopic {
                        message: other.to_owned().into(),
                        context: None,
                    });
                },
            },
        })
    }
}

/// Argument of `pool:add_post`: the pool memberships plus the posts they refer to.
///
/// `posts` is absent (and skipped when serialized) if the payload carried none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolPosts {
    pub pool_posts: Records,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<Records>,
}

/// An event on the client bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PostAdd(Records),
    TagAdd(Records),
    VoteAdd(Records),
    VoteAddUserList(Records),
    PoolAdd(Records),
    PoolAddPost(PoolPosts),
    /// Decoded response body of a successful request to `path`.
    Ready { path: String, body: serde_json::Value },
}

impl Event {
    /// The event published for a present payload field.
    ///
    /// `pool_posts` also carries the payload's `posts`, when there are any.
    #[must_use]
    pub fn from_field(field: PayloadField, records: Records, posts: Option<&Records>) -> Self {
        match field {
            PayloadField::Posts => Self::PostAdd(records),
            PayloadField::Tags => Self::TagAdd(records),
            PayloadField::Votes => Self::VoteAdd(records),
            PayloadField::VotedBy => Self::VoteAddUserList(records),
            PayloadField::Pools => Self::PoolAdd(records),
            PayloadField::PoolPosts => {
                Self::PoolAddPost(PoolPosts { pool_posts: records, posts: posts.cloned() })
            },
        }
    }
}

impl Routed for Event {
    type Topic = Topic;

    fn topic(&self) -> Topic {
        match self {
            Self::PostAdd(_) => Topic::PostAdd,
            Self::TagAdd(_) => Topic::TagAdd,
            Self::VoteAdd(_) => Topic::VoteAdd,
            Self::VoteAddUserList(_) => Topic::VoteAddUserList,
            Self::PoolAdd(_) => Topic::PoolAdd,
            Self::PoolAddPost(_) => Topic::PoolAddPost,
            Self::Ready { path, .. } => Topic::Ready(path.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_parse_back() {
        for topic in [
            Topic::PostAdd,
            Topic::TagAdd,
            Topic::VoteAdd,
            Topic::VoteAddUserList,
            Topic::PoolAdd,
            Topic::PoolAddPost,
            Topic::Ready("/post/vote.json".to_owned()),
        ] {
            assert_eq!(topic.to_string().parse::<Topic>().unwrap(), topic);
        }
    }

    #[test]
    fn ready_topic_uses_the_request_path() {
        assert_eq!(Topic::Ready("/tag/update.json".to_owned()).name(), "/tag/update.json:ready");
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(matches!("post:remove".parse::<Topic>(), Err(DispatchError::UnknownTopic { .. })));
        assert!(":ready".parse::<Topic>().is_err());
    }

    #[test]
    fn every_field_maps_to_its_topic() {
        let topics: Vec<String> = PayloadField::ORDER
            .into_iter()
            .map(|f| Event::from_field(f, serde_json::json!([]), None).topic().to_string())
            .collect();
        assert_eq!(
            topics,
            ["post:add", "tag:add", "vote:add", "vote:add_user_list", "pool:add", "pool:add_post"]
        );
    }

    #[test]
    fn pool_posts_without_posts_omits_the_key() {
        let value =
            serde_json::to_value(PoolPosts { pool_posts: serde_json::json!([]), posts: None })
                .unwrap();
        assert_eq!(value, serde_json::json!({ "pool_posts": [] }));
    }
}
