use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::{debug, info, warn};

use common::{Error, Result, SignalNotifier, TradingSignal};

use crate::format::format_signal;
use crate::recipients::RecipientStore;

/// Broadcasts trading signals to every subscribed chat.
pub struct TelegramNotifier {
    bot: Bot,
    store: RecipientStore,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, store: RecipientStore) -> Self {
        Self { bot, store }
    }
}

#[async_trait]
impl SignalNotifier for TelegramNotifier {
    async fn notify(&self, signal: &TradingSignal) -> Result<()> {
        let chat_ids = self.store.list().await?;
        if chat_ids.is_empty() {
            debug!(symbol = %signal.symbol, "No subscribers, signal not broadcast");
            return Ok(());
        }

        let text = format_signal(signal);
        let chat_ids: Vec<ChatId> = chat_ids.into_iter().map(ChatId).collect();
        let delivered = send_alert(&self.bot, &chat_ids, &text).await;
        info!(symbol = %signal.symbol, delivered, total = chat_ids.len(), "Signal broadcast");

        if delivered == 0 {
            return Err(Error::Notify(format!(
                "signal for {} reached none of {} recipients",
                signal.symbol,
                chat_ids.len()
            )));
        }
        Ok(())
    }
}

/// Send `message` to each chat. Returns how many sends succeeded.
pub async fn send_alert(bot: &Bot, chat_ids: &[ChatId], message: &str) -> usize {
    let mut delivered = 0;
    for &chat_id in chat_ids {
        match bot.send_message(chat_id, message).await {
            Ok(_) => delivered += 1,
            Err(e) => warn!(chat_id = ?chat_id, error = %e, "Failed to send Telegram message"),
        }
    }
    delivered
}
