use std::sync::Arc;

use teloxide::{
    dispatching::UpdateHandler,
    prelude::*,
    utils::command::BotCommands,
};
use tracing::{info, warn};

use engine::{ScannerHandle, TriggerOutcome, TriggerSource};
use strategy::DetectorRegistry;

use crate::format::format_status;
use crate::recipients::RecipientStore;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Dependencies injected into every handler via `dptree`.
#[derive(Clone)]
pub struct BotDeps {
    pub store: RecipientStore,
    pub scanner: ScannerHandle,
    pub registry: Arc<DetectorRegistry>,
    /// Users allowed to run `/scan`.
    pub admin_ids: Arc<Vec<i64>>,
}

impl BotDeps {
    fn is_admin(&self, user_id: UserId) -> bool {
        self.admin_ids.contains(&(user_id.0 as i64))
    }
}

/// Telegram bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "VegasBot commands:")]
pub enum Command {
    #[command(description = "Show this help")]
    Help,
    #[command(description = "Receive tunnel signals in this chat")]
    Subscribe,
    #[command(description = "Stop receiving signals")]
    Unsubscribe,
    #[command(description = "Show detector states and the last scan")]
    Status,
    #[command(description = "Run a scan now (admins only)")]
    Scan,
}

/// Start the Telegram bot in long-polling mode.
pub async fn start_bot(bot: Bot, deps: BotDeps) {
    let deps = Arc::new(deps);

    info!("Telegram bot starting (long-polling)");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![deps])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(handle_help))
        .branch(case![Command::Subscribe].endpoint(handle_subscribe))
        .branch(case![Command::Unsubscribe].endpoint(handle_unsubscribe))
        .branch(case![Command::Status].endpoint(handle_status))
        .branch(case![Command::Scan].endpoint(handle_scan));

    Update::filter_message().branch(command_handler)
}

async fn handle_help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
    Ok(())
}

async fn handle_subscribe(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let reply = if deps.store.add(msg.chat.id.0).await? {
        info!(chat_id = msg.chat.id.0, "Chat subscribed");
        "Subscribed. Tunnel signals will be posted here."
    } else {
        "This chat is already subscribed."
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_unsubscribe(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let reply = if deps.store.remove(msg.chat.id.0).await? {
        info!(chat_id = msg.chat.id.0, "Chat unsubscribed");
        "Unsubscribed."
    } else {
        "This chat was not subscribed."
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_status(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let report = deps.scanner.last_report().await;
    let subscribers = deps.store.count().await?;
    let text = format_status(&deps.registry.states(), &report, subscribers);
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_scan(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let Some(user_id) = msg.from().map(|u| u.id) else {
        return Ok(());
    };
    if !deps.is_admin(user_id) {
        warn!(user_id = user_id.0, "Unauthorized /scan attempt");
        bot.send_message(msg.chat.id, "Not allowed.").await?;
        return Ok(());
    }

    let reply = match deps.scanner.trigger(TriggerSource::Telegram) {
        TriggerOutcome::Queued => "Scan queued.",
        TriggerOutcome::Busy => "Scans already pending, try again shortly.",
        TriggerOutcome::Closed => "Scanner unavailable.",
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}
