use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::commands::{self, CommandAction};
use crate::platform::{InboundEvent, Message, Platform};
use crate::relay;
use crate::transport::EventSource;

/// Consume events until the source closes.
pub async fn run(platform: Arc<dyn Platform>, mut source: EventSource) {
    info!("Bot is running ({} mode)", source.mode());

    while let Some(event) = source.next().await {
        handle_event(&platform, event).await;
    }

    warn!("Update source closed, stopping dispatcher");
}

/// Handle one inbound event. Commands are handled inline; forwarded messages
/// are relayed on a detached task, so this returns before the relay is done.
pub async fn handle_event(platform: &Arc<dyn Platform>, event: InboundEvent) {
    let InboundEvent::Message(message) = event else {
        return;
    };

    if let Some(name) = message.command.as_deref() {
        handle_command(platform.as_ref(), &message, name).await;
        return;
    }

    if !message.forwarded_from_chat {
        return;
    }

    debug!(
        "Forwarded message {} in chat {} ({:?}), relaying",
        message.id,
        message.chat_id,
        message.media_kind()
    );
    let platform = Arc::clone(platform);
    tokio::spawn(async move {
        relay::resend_media(platform.as_ref(), Some(&message)).await;
    });
}

async fn handle_command(platform: &dyn Platform, message: &Message, name: &str) {
    debug!(
        "Command /{} from message {} in chat {}",
        name, message.id, message.chat_id
    );

    match commands::route(name) {
        CommandAction::Resend => {
            relay::resend_media(platform, message.reply_to.as_deref()).await;
        }
        CommandAction::Reply(text) => {
            if let Err(e) = platform.send_text(message.chat_id, text, message.id).await {
                warn!("Failed to answer /{}: {:#}", name, e);
            }
        }
        CommandAction::Ignore => {}
    }
}
