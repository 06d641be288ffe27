pub mod config;
pub mod execution;
pub mod history;
pub mod jobs;
pub mod parser;
pub mod shell;
pub mod sig;
pub mod suggest;

use std::error::Error;

use crate::config::Config;
use crate::history::HistoryStore;
use crate::shell::Shell;
use crate::sig::{install_sighandler, interrupt_handler};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    install_sighandler(libc::SIGINT, interrupt_handler)?;

    let config = Config::from_env();

    // persistence failure degrades to a history-less shell, never fatal
    let history = match HistoryStore::open(&config.history_path) {
        Ok(store) => Some(store),
        Err(e) => {
            eprintln!(
                "ish: warning: history store unavailable ({}); history is disabled",
                e
            );
            None
        }
    };

    let mut shell = Shell::new(config, history)?;
    shell.run()
}
