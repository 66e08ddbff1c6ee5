//! Telegram link parsing.
//!
//! Channel-post and topic links share one shape (`/<username>/<id>`), so the
//! caller decides which interpretation applies via [`LinkKind`].

use url::Url;

use crate::{
    domain::{MessageId, TargetDescriptor},
    errors::Error,
    Result,
};

const ALLOWED_HOSTS: [&str; 4] = ["t.me", "telegram.me", "www.t.me", "www.telegram.me"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    Bot,
    ChannelPost,
    Topic,
}

pub fn parse(raw: &str, kind: LinkKind) -> Result<TargetDescriptor> {
    match kind {
        LinkKind::Bot => parse_bot_link(raw),
        LinkKind::ChannelPost => parse_channel_post_link(raw),
        LinkKind::Topic => parse_topic_link(raw),
    }
}

/// `https://t.me/<bot>?start=<param>`
pub fn parse_bot_link(raw: &str) -> Result<TargetDescriptor> {
    let url = parse_telegram_url(raw)?;
    let segments = path_segments(&url);
    let Some(first) = segments.first() else {
        return Err(Error::InvalidLink(format!(
            "missing bot username in path: {raw}"
        )));
    };

    let param = url
        .query_pairs()
        .find(|(k, _)| k == "start")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
        .ok_or(Error::MissingStartParam)?;

    Ok(TargetDescriptor::BotStart {
        username: strip_at(first),
        param,
    })
}

/// `https://t.me/<channel>/<message_id>`
pub fn parse_channel_post_link(raw: &str) -> Result<TargetDescriptor> {
    let (username, message_id) = parse_username_and_id(raw)?;
    Ok(TargetDescriptor::ChannelPost {
        username,
        message_id,
    })
}

/// `https://t.me/<channel>/<topic_id>`
pub fn parse_topic_link(raw: &str) -> Result<TargetDescriptor> {
    let (username, topic_id) = parse_username_and_id(raw)?;
    Ok(TargetDescriptor::ChannelTopic { username, topic_id })
}

fn parse_username_and_id(raw: &str) -> Result<(String, MessageId)> {
    let url = parse_telegram_url(raw)?;
    let segments = path_segments(&url);
    if segments.len() < 2 {
        return Err(Error::InvalidLink(format!(
            "expected /<username>/<id> in path: {raw}"
        )));
    }

    let id = segments[1]
        .parse::<MessageId>()
        .ok()
        .filter(|id| *id >= 0)
        .ok_or_else(|| Error::InvalidMessageId(segments[1].to_string()))?;

    Ok((strip_at(segments[0]), id))
}

fn parse_telegram_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| Error::InvalidLink(format!("{raw}: {e}")))?;
    match url.host_str() {
        Some(host) if ALLOWED_HOSTS.contains(&host) => Ok(url),
        Some(host) => Err(Error::InvalidLink(format!("unsupported host: {host}"))),
        None => Err(Error::InvalidLink(format!("missing host: {raw}"))),
    }
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segs| segs.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

fn strip_at(username: &str) -> String {
    username.strip_prefix('@').unwrap_or(username).to_string()
}
