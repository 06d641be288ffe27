use std::env;
use std::error::Error;
use std::io;

use log::{debug, warn};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::config::{self, Config};
use crate::execution::{self, Outcome};
use crate::history::HistoryStore;
use crate::jobs::JobTable;
use crate::parser;
use crate::suggest::{SuggestionClient, Transport};

const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, PartialEq)]
pub(crate) enum Flow {
    Continue,
    Exit,
}

/// The interactive loop: read a line, fetch an advisory hint within the
/// configured deadline, dispatch built-ins or spawn an external process,
/// and log every dispatched line to the history store exactly once.
///
/// Owns the persistence handle for its whole lifetime; `history` is `None`
/// when the store could not be opened at startup (degraded mode).
pub struct Shell {
    editor: DefaultEditor,
    config: Config,
    history: Option<HistoryStore>,
    suggest: SuggestionClient,
    jobs: JobTable,
}

impl Shell {
    pub fn new(config: Config, history: Option<HistoryStore>) -> rustyline::Result<Shell> {
        let suggest = SuggestionClient::new(
            vec![
                Transport::Unix(config.suggest_socket.clone()),
                Transport::Tcp(config.suggest_addr),
            ],
            config.model.clone(),
        );

        Ok(Shell {
            editor: DefaultEditor::new()?,
            config,
            history,
            suggest,
            jobs: JobTable::new(),
        })
    }

    pub fn run(&mut self) -> Result<(), Box<dyn Error>> {
        loop {
            for job in self.jobs.reap() {
                println!(
                    "[{}] done  pid {}  {} ({})",
                    job.id, job.pid, job.cmdline, job.status
                );
            }

            let line = match self.editor.readline(config::PROMPT) {
                Ok(line) => line,
                // Ctrl-C in the editor, or a read interrupted by the
                // installed SIGINT handler: re-issue the prompt
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Io(ref e)) if e.kind() == io::ErrorKind::Interrupted => {
                    continue
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(e) => return Err(Box::new(e)),
            };

            if let Flow::Exit = self.handle_line(&line) {
                break;
            }
        }

        Ok(())
    }

    /// One loop iteration past the read: trim, discard empty input before
    /// any suggestion or history traffic, fetch a hint within the deadline,
    /// then dispatch.
    pub(crate) fn handle_line(&mut self, raw: &str) -> Flow {
        let line = raw.trim();
        if line.is_empty() {
            return Flow::Continue;
        }

        let _ = self.editor.add_history_entry(line);

        // bounded wait; the fetch always resolves before dispatch
        if let Some(hint) = self.suggest.fetch(line, self.config.suggest_timeout) {
            println!("\t[suggestion] {}", hint);
        }

        self.dispatch(line)
    }

    /// Tokenizes and dispatches one trimmed, non-empty line. The line is
    /// logged here, before dispatch, so built-ins, spawn failures and
    /// background commands all leave exactly one record.
    pub(crate) fn dispatch(&mut self, line: &str) -> Flow {
        let command = match parser::parse(line) {
            Ok((_, command)) => command,
            Err(e) => {
                warn!("unparseable line: {}", e);
                return Flow::Continue;
            }
        };

        self.log_line(line);

        match command.program() {
            None => Flow::Continue,
            Some("exit") => Flow::Exit,
            Some("cd") => {
                self.builtin_cd(&command.argv[1..]);
                Flow::Continue
            }
            Some("history") => {
                self.builtin_history(&command.argv[1..]);
                Flow::Continue
            }
            Some(_) => {
                self.launch(line, &command);
                Flow::Continue
            }
        }
    }

    fn log_line(&mut self, line: &str) {
        if let Some(store) = &mut self.history {
            if let Err(e) = store.append(line) {
                warn!("history append failed: {}", e);
            }
        }
    }

    fn builtin_cd(&self, args: &[&str]) {
        let dir = match target_dir(args) {
            Some(dir) => dir,
            None => {
                eprintln!("ish: cd: HOME not set");
                return;
            }
        };

        if let Err(e) = env::set_current_dir(&dir) {
            eprintln!("ish: cd: {}: {}", dir, e);
        }
    }

    fn builtin_history(&self, args: &[&str]) {
        let limit = history_limit(args);

        match &self.history {
            Some(store) => match store.recent(limit) {
                Ok(records) => {
                    for record in records {
                        println!(
                            "{:4}  {}  {}",
                            record.id,
                            record.ts.format("%Y-%m-%d %H:%M:%S"),
                            record.cmd
                        );
                    }
                }
                Err(e) => eprintln!("ish: history: {}", e),
            },
            None => eprintln!("ish: history is disabled"),
        }
    }

    fn launch(&mut self, line: &str, command: &parser::Command) {
        match execution::run(&command.argv, command.background) {
            Ok(Outcome::Background(child)) => {
                let pid = child.id();
                let id = self.jobs.add(child, line);
                println!("[{}] pid {}", id, pid);
            }
            Ok(Outcome::Exited(code)) => {
                debug!("{} exited with status {}", command.argv[0], code)
            }
            Ok(Outcome::Signaled(signal)) => {
                debug!("{} terminated by signal {}", command.argv[0], signal)
            }
            Err(e) => eprintln!("ish: {}", e),
        }
    }
}

/// `cd` target: the explicit argument, or `$HOME` when none is given.
fn target_dir(args: &[&str]) -> Option<String> {
    args.first()
        .map(|dir| dir.to_string())
        .or_else(|| env::var("HOME").ok())
}

fn history_limit(args: &[&str]) -> usize {
    args.first()
        .and_then(|n| n.parse().ok())
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
}
