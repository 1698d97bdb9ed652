//! Long-running workers submitted to the supervisor.
//!
//! - [`crawler`]: fetches data with the current api key and asks for a new one when it is rejected;
//! - [`bot`]: chat front-end to the operator console;
//! - [`relay`]: moves keys from the bot's queue into the crawler's store.
pub mod bot;
pub mod crawler;
pub mod relay;

pub use bot::{
    BotConfig, BotError, BotWorker, ChatMessage, ChatTransport, ChatUpdate, TelegramTransport,
    bot_task,
};
pub use crawler::{
    CrawlError, CrawlJob, CrawlReport, CrawlerConfig, HttpCrawlJob, crawler_task,
};
pub use relay::relay_task;
