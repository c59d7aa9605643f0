pub mod commands;
pub mod format;
pub mod notifier;
pub mod recipients;

pub use commands::{start_bot, BotDeps};
pub use format::{format_signal, format_status};
pub use notifier::TelegramNotifier;
pub use recipients::RecipientStore;
