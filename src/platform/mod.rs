pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

/// An event received from the platform
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Message(Message),
    /// Anything else the platform pushes (edits, callbacks, member updates...)
    Other,
}

/// A chat message, reduced to what the relay and command handling look at
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub chat_id: i64,
    pub id: i32,
    /// Command name without the leading slash or `@botname` suffix
    pub command: Option<String>,
    /// Set when the message was forwarded here from a channel
    pub forwarded_from_chat: bool,
    pub reply_to: Option<Box<Message>>,
    pub media: Option<Media>,
}

impl Message {
    pub fn media_kind(&self) -> Option<MediaKind> {
        self.media.as_ref().map(Media::kind)
    }
}

/// Relayable media carried by a message. File references are opaque
/// platform identifiers.
#[derive(Debug, Clone, PartialEq)]
pub enum Media {
    /// Size variants, smallest first
    Photo(Vec<String>),
    Video(String),
    Animation(String),
}

impl Media {
    pub fn kind(&self) -> MediaKind {
        match self {
            Media::Photo(_) => MediaKind::Photo,
            Media::Video(_) => MediaKind::Video,
            Media::Animation(_) => MediaKind::Animation,
        }
    }

    /// The file to republish: the largest photo size, or the single file.
    pub fn file_ref(&self) -> Option<&str> {
        match self {
            Media::Photo(sizes) => sizes.last().map(String::as_str),
            Media::Video(file) | Media::Animation(file) => Some(file),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Animation,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Photo => write!(f, "photo"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Animation => write!(f, "animation"),
        }
    }
}

/// Current webhook registration as reported by the platform
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookStatus {
    /// Registered URL, `None` when no webhook is set
    pub url: Option<String>,
    pub pending_update_count: u32,
    pub last_error_message: Option<String>,
}

impl WebhookStatus {
    pub fn is_set(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// Outbound side of the platform client. Shared by every component, so
/// implementations must tolerate concurrent calls.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Send an HTML-formatted text as a reply to `reply_to`.
    async fn send_text(&self, chat_id: i64, text: &str, reply_to: i32) -> Result<()>;

    /// Post media by file reference.
    async fn send_media(&self, chat_id: i64, kind: MediaKind, file_ref: &str) -> Result<()>;

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()>;

    async fn webhook_info(&self) -> Result<WebhookStatus>;
}
