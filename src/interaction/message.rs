//! Inbound message pipeline: self-filter, channel gate, commands, then trigger matching.

use tracing::{Instrument, debug, error, instrument, warn};

use crate::{
    base::types::{InboundMessage, Void},
    interaction::command,
    runtime::Runtime,
};

/// Handles an inbound message on its own task.
#[instrument(skip_all, fields(channel = %message.channel_id))]
pub fn handle_message(message: InboundMessage, runtime: Runtime) {
    tokio::spawn(
        async move {
            // Process the event.
            let result = process_message(&message, &runtime).await;

            // Log any errors.
            if let Err(err) = &result {
                error!("Error while handling: {:#}", err);
            }
        }
        .in_current_span(),
    );
}

/// Processes one inbound message to completion.
#[instrument(skip_all)]
pub async fn process_message(message: &InboundMessage, runtime: &Runtime) -> Void {
    // Never answer ourselves or other bots.

    if message.author.is_bot || message.author.id == runtime.chat.bot_user_id() {
        debug!("Skipping message from a bot.");
        return Ok(());
    }

    // Only permitted channels are handled.

    let access = runtime.access.snapshot();
    if !access.is_permitted(&message.channel_id) {
        debug!("Skipping message from an unpermitted channel.");
        return Ok(());
    }

    // Administrative commands take precedence over triggers.

    if command::try_execute(message, runtime).await? {
        return Ok(());
    }

    // Automated replies.

    let Some(event) = runtime.matcher.handle(message.text.trim(), &message.author, true)? else {
        return Ok(());
    };

    runtime.chat.send_message(&message.channel_id, &event.text).await?;

    if let Some(log_channel) = &access.log_channel_id {
        let notice = format!("*✨ Auto-response log*\n*User:* <@{}>\n*Trigger:* `{}`", message.author.id, event.trigger);

        if let Err(err) = runtime.chat.send_message(log_channel.as_str(), &notice).await {
            warn!("Failed to post auto-response notice: {}", err);
        }
    }

    Ok(())
}
