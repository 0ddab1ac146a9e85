pub mod app;
pub mod config;
pub mod dedup;
pub mod ledger;
pub mod logging;
pub mod parse;
pub mod secrets;
pub mod server;
pub mod speech;

pub use app::ExpenseApp;
pub use config::{Config, ConfigManager};
pub use ledger::{Category, LedgerEntry, LedgerStore};
