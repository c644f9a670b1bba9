use tracing::{debug, info, warn};

use crate::platform::{Message, Platform};

/// How a relay attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// No message, or nothing relayable in it
    Skipped,
    /// Republishing failed; the source message was left alone
    SendFailed,
    /// Media was republished; `deleted` tells whether the source went away
    Republished { deleted: bool },
}

/// Republish the media of `message` as the bot, then delete the source.
///
/// The source is only deleted once the copy is confirmed, and neither step is
/// retried. Messages without relayable media are never touched.
pub async fn resend_media(platform: &dyn Platform, message: Option<&Message>) -> RelayOutcome {
    let Some(message) = message else {
        debug!("Nothing to resend: no message");
        return RelayOutcome::Skipped;
    };

    let Some(media) = message.media.as_ref() else {
        debug!(
            "Message {} in chat {} has no relayable media",
            message.id, message.chat_id
        );
        return RelayOutcome::Skipped;
    };

    let Some(file_ref) = media.file_ref() else {
        return RelayOutcome::Skipped;
    };

    let kind = media.kind();
    if let Err(e) = platform.send_media(message.chat_id, kind, file_ref).await {
        warn!(
            "Failed to resend {} from message {} in chat {}: {:#}",
            kind, message.id, message.chat_id, e
        );
        return RelayOutcome::SendFailed;
    }

    info!(
        "Resent {} from message {} in chat {}",
        kind, message.id, message.chat_id
    );

    match platform.delete_message(message.chat_id, message.id).await {
        Ok(()) => RelayOutcome::Republished { deleted: true },
        Err(e) => {
            warn!(
                "Resent message {} in chat {} but could not delete the original: {:#}",
                message.id, message.chat_id, e
            );
            RelayOutcome::Republished { deleted: false }
        }
    }
}
