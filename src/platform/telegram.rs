use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, FileId, InputFile, MessageEntityKind, MessageId, MessageOrigin, ParseMode,
    ReplyParameters, Update, UpdateKind,
};
use tracing::info;

use crate::config::POLL_TIMEOUT_SECS;
use crate::platform::{InboundEvent, Media, MediaKind, Message, Platform, WebhookStatus};

/// Build a bot whose HTTP timeout outlasts the long-poll ceiling, so the
/// client never gives up on a `getUpdates` call Telegram is still holding.
pub fn build_bot(token: &str) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(POLL_TIMEOUT_SECS) + 15))
        .build()
        .context("Failed to build HTTP client for Telegram")?;
    Ok(Bot::with_client(token, client))
}

/// Telegram implementation of the platform client
#[derive(Clone)]
pub struct TelegramPlatform {
    bot: Bot,
}

impl TelegramPlatform {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Verify the token and log which account we are running as.
    pub async fn authorize(&self) -> Result<()> {
        let me = self
            .bot
            .get_me()
            .await
            .context("Failed to authorize with Telegram")?;
        info!(
            "Authorized on account {}",
            me.username.as_deref().unwrap_or("<unnamed>")
        );
        Ok(())
    }
}

#[async_trait]
impl Platform for TelegramPlatform {
    async fn send_text(&self, chat_id: i64, text: &str, reply_to: i32) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .reply_parameters(ReplyParameters::new(MessageId(reply_to)))
            .await
            .with_context(|| format!("Failed to send text to chat {chat_id}"))?;
        Ok(())
    }

    async fn send_media(&self, chat_id: i64, kind: MediaKind, file_ref: &str) -> Result<()> {
        let chat = ChatId(chat_id);
        let file = InputFile::file_id(FileId(file_ref.to_string()));
        match kind {
            MediaKind::Photo => {
                self.bot.send_photo(chat, file).await?;
            }
            MediaKind::Video => {
                self.bot.send_video(chat, file).await?;
            }
            MediaKind::Animation => {
                self.bot.send_animation(chat, file).await?;
            }
        }
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .with_context(|| format!("Failed to delete message {message_id} in chat {chat_id}"))?;
        Ok(())
    }

    async fn webhook_info(&self) -> Result<WebhookStatus> {
        let info = self
            .bot
            .get_webhook_info()
            .await
            .context("Failed to get webhook info")?;
        Ok(WebhookStatus {
            url: info.url.map(|url| url.to_string()),
            pending_update_count: info.pending_update_count,
            last_error_message: info.last_error_message,
        })
    }
}

/// Reduce a raw Telegram update to an inbound event.
pub fn convert_update(update: Update) -> InboundEvent {
    match update.kind {
        UpdateKind::Message(msg) => InboundEvent::Message(convert_message(&msg)),
        _ => InboundEvent::Other,
    }
}

pub fn convert_message(msg: &teloxide::types::Message) -> Message {
    let starts_with_command = msg
        .entities()
        .and_then(|entities| entities.first())
        .is_some_and(|e| matches!(e.kind, MessageEntityKind::BotCommand) && e.offset == 0);

    let command = if starts_with_command {
        msg.text().and_then(parse_command)
    } else {
        None
    };

    let forwarded_from_chat = matches!(
        msg.forward_origin(),
        Some(MessageOrigin::Channel { .. } | MessageOrigin::Chat { .. })
    );

    Message {
        chat_id: msg.chat.id.0,
        id: msg.id.0,
        command,
        forwarded_from_chat,
        reply_to: msg
            .reply_to_message()
            .map(|reply| Box::new(convert_message(reply))),
        media: extract_media(msg),
    }
}

/// Photo wins over video, video over animation, should Telegram ever
/// populate more than one.
fn extract_media(msg: &teloxide::types::Message) -> Option<Media> {
    if let Some(sizes) = msg.photo().filter(|sizes| !sizes.is_empty()) {
        return Some(Media::Photo(
            sizes.iter().map(|size| size.file.id.0.clone()).collect(),
        ));
    }
    if let Some(video) = msg.video() {
        return Some(Media::Video(video.file.id.0.clone()));
    }
    msg.animation()
        .map(|animation| Media::Animation(animation.file.id.0.clone()))
}

/// "/resend@nozomi_bot now" -> "resend"
fn parse_command(text: &str) -> Option<String> {
    let token = text.split_whitespace().next()?;
    let name = token.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn chat() -> Value {
        json!({ "id": -100123, "type": "supergroup", "title": "Memes" })
    }

    fn parse(value: Value) -> teloxide::types::Message {
        serde_json::from_value(value).expect("deserialize message")
    }

    fn photo_size(file_id: &str, width: u32) -> Value {
        json!({
            "file_id": file_id,
            "file_unique_id": format!("{file_id}-unique"),
            "width": width,
            "height": width,
            "file_size": width * 10
        })
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("/help"), Some("help".to_string()));
        assert_eq!(parse_command("/resend@nozomi_bot now"), Some("resend".to_string()));
        assert_eq!(parse_command("/VibeCheck"), Some("VibeCheck".to_string()));
        assert_eq!(parse_command("help"), None);
        assert_eq!(parse_command("/"), None);
    }

    #[test]
    fn test_command_message() {
        let msg = parse(json!({
            "message_id": 3,
            "date": 1,
            "chat": chat(),
            "from": { "id": 1001, "is_bot": false, "first_name": "Alice" },
            "text": "/help@nozomi_bot",
            "entities": [{ "type": "bot_command", "offset": 0, "length": 16 }]
        }));

        let converted = convert_message(&msg);
        assert_eq!(converted.chat_id, -100123);
        assert_eq!(converted.id, 3);
        assert_eq!(converted.command.as_deref(), Some("help"));
        assert!(!converted.forwarded_from_chat);
        assert_eq!(converted.media, None);
    }

    #[test]
    fn test_slash_text_without_entity_is_not_a_command() {
        let msg = parse(json!({
            "message_id": 4,
            "date": 1,
            "chat": chat(),
            "from": { "id": 1001, "is_bot": false, "first_name": "Alice" },
            "text": "/help"
        }));
        assert_eq!(convert_message(&msg).command, None);
    }

    #[test]
    fn test_forwarded_channel_photo() {
        let msg = parse(json!({
            "message_id": 7,
            "date": 1,
            "chat": chat(),
            "from": { "id": 1001, "is_bot": false, "first_name": "Alice" },
            "forward_origin": {
                "type": "channel",
                "date": 1,
                "chat": { "id": -100999, "type": "channel", "title": "Source" },
                "message_id": 55
            },
            "photo": [photo_size("S", 90), photo_size("M", 320), photo_size("L", 1280)]
        }));

        let converted = convert_message(&msg);
        assert!(converted.forwarded_from_chat);
        assert_eq!(
            converted.media,
            Some(Media::Photo(vec!["S".into(), "M".into(), "L".into()]))
        );
    }

    #[test]
    fn test_forwarded_from_user_is_not_from_chat() {
        let msg = parse(json!({
            "message_id": 8,
            "date": 1,
            "chat": chat(),
            "from": { "id": 1001, "is_bot": false, "first_name": "Alice" },
            "forward_origin": {
                "type": "user",
                "date": 1,
                "sender_user": { "id": 2002, "is_bot": false, "first_name": "Bob" }
            },
            "text": "hello"
        }));
        assert!(!convert_message(&msg).forwarded_from_chat);
    }

    #[test]
    fn test_video_message() {
        let msg = parse(json!({
            "message_id": 9,
            "date": 1,
            "chat": chat(),
            "from": { "id": 1001, "is_bot": false, "first_name": "Alice" },
            "video": {
                "file_id": "V1",
                "file_unique_id": "V1-unique",
                "width": 640,
                "height": 480,
                "duration": 12,
                "mime_type": "video/mp4",
                "file_size": 40960
            }
        }));
        assert_eq!(
            convert_message(&msg).media,
            Some(Media::Video("V1".to_string()))
        );
    }

    #[test]
    fn test_reply_target_is_converted() {
        let msg = parse(json!({
            "message_id": 10,
            "date": 2,
            "chat": chat(),
            "from": { "id": 1001, "is_bot": false, "first_name": "Alice" },
            "text": "/resend",
            "entities": [{ "type": "bot_command", "offset": 0, "length": 7 }],
            "reply_to_message": {
                "message_id": 6,
                "date": 1,
                "chat": chat(),
                "from": { "id": 2002, "is_bot": false, "first_name": "Bob" },
                "photo": [photo_size("S", 90), photo_size("L", 1280)]
            }
        }));

        let converted = convert_message(&msg);
        assert_eq!(converted.command.as_deref(), Some("resend"));
        let target = converted.reply_to.expect("reply target");
        assert_eq!(target.id, 6);
        assert_eq!(target.media_kind(), Some(MediaKind::Photo));
    }

    #[test]
    fn test_non_message_update_is_other() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 1,
            "edited_message": {
                "message_id": 1,
                "date": 1,
                "edit_date": 2,
                "chat": chat(),
                "from": { "id": 1001, "is_bot": false, "first_name": "Alice" },
                "text": "edited"
            }
        }))
        .expect("deserialize update");
        assert_eq!(convert_update(update), InboundEvent::Other);
    }
}
