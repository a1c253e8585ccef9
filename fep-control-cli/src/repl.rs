//! Interactive terminal: banner, line editing with history and completion,
//! and the read-execute loop.

use anyhow::anyhow;
use fep_control_core::tokenizer::tokenize;
use fep_control_core::{OutputFormatter, Session};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Context, Editor};
use std::cell::RefCell;
use std::io::{BufRead, IsTerminal};
use std::rc::Rc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const PROMPT: &str = "fep> ";

const BANNER: [&str; 4] = [
    "******************************************************************",
    "* Welcome to FEP Control(c) 2021 VW Group                        *",
    "*  use help to print help                                        *",
    "******************************************************************",
];

pub fn banner() -> String {
    BANNER.iter().map(|line| format!("{line}\n")).collect()
}

/// Source of command lines.
pub trait LineReader {
    /// Next line, or `None` when the user is done (EOF, Ctrl-C).
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>>;

    /// Record an executed line in the history.
    fn remember(&mut self, _line: &str) {}
}

/// Completion through the session's own rules.
pub struct ConsoleHelper {
    session: Rc<RefCell<Session>>,
}

impl ConsoleHelper {
    pub fn new(session: Rc<RefCell<Session>>) -> Self {
        Self { session }
    }
}

impl rustyline::Helper for ConsoleHelper {}

impl rustyline::highlight::Highlighter for ConsoleHelper {}

impl rustyline::hint::Hinter for ConsoleHelper {
    type Hint = String;
    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl rustyline::validate::Validator for ConsoleHelper {}

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    /// Candidates replace the whole line up to the cursor.
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let Ok(session) = self.session.try_borrow() else {
            return Ok((pos, Vec::new()));
        };
        let pairs = session
            .complete(&line[..pos])
            .into_iter()
            .map(|candidate| Pair {
                display: candidate
                    .rsplit_once(' ')
                    .map_or(candidate.as_str(), |(_, word)| word)
                    .to_string(),
                replacement: candidate,
            })
            .collect();
        Ok((0, pairs))
    }
}

/// rustyline editor bound to a session.
pub struct ConsoleEditor {
    editor: Editor<ConsoleHelper, DefaultHistory>,
}

impl ConsoleEditor {
    pub fn new(session: Rc<RefCell<Session>>) -> anyhow::Result<Self> {
        let mut editor: Editor<ConsoleHelper, DefaultHistory> =
            Editor::new().map_err(|e| anyhow!("failed to init rustyline: {e}"))?;
        editor.set_helper(Some(ConsoleHelper::new(session)));
        Ok(Self { editor })
    }
}

impl LineReader for ConsoleEditor {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
            Err(e) => Err(anyhow!("readline error: {e}")),
        }
    }

    fn remember(&mut self, line: &str) {
        if let Err(e) = self.editor.add_history_entry(line) {
            tracing::debug!(error = %e, "failed to record history");
        }
    }
}

/// Line reader for non-interactive input (pipes, files). Writes the prompt
/// through the session's formatter since no line editor does it.
pub struct PipedReader<R> {
    input: R,
    out: Arc<OutputFormatter>,
}

impl<R: BufRead> PipedReader<R> {
    pub fn new(input: R, out: Arc<OutputFormatter>) -> Self {
        Self { input, out }
    }
}

impl<R: BufRead> LineReader for PipedReader<R> {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        self.out.write(prompt);
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

/// Terminal attributes of stdin saved before line editing starts.
///
/// The editor switches the tty to raw mode while it reads. A process that
/// exits from another thread must put the saved attributes back itself.
#[derive(Clone, Copy)]
pub struct TerminalMode {
    #[cfg(unix)]
    saved: Option<(std::os::fd::RawFd, libc::termios)>,
}

impl TerminalMode {
    pub fn capture_stdin() -> Self {
        #[cfg(unix)]
        {
            use std::os::fd::AsRawFd;
            Self::capture(std::io::stdin().as_raw_fd())
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }

    /// Snapshot of `fd`'s attributes; empty when `fd` is not a terminal.
    #[cfg(unix)]
    pub fn capture(fd: std::os::fd::RawFd) -> Self {
        let mut termios = std::mem::MaybeUninit::<libc::termios>::uninit();
        let saved = unsafe {
            if libc::tcgetattr(fd, termios.as_mut_ptr()) == 0 {
                Some((fd, termios.assume_init()))
            } else {
                None
            }
        };
        Self { saved }
    }

    /// Put the saved attributes back. Returns whether anything was restored.
    pub fn restore(&self) -> bool {
        #[cfg(unix)]
        {
            if let Some((fd, termios)) = &self.saved {
                return unsafe { libc::tcsetattr(*fd, libc::TCSANOW, termios) == 0 };
            }
        }
        false
    }
}

/// Execute lines from `reader` until it is exhausted, the session quits or
/// shutdown is requested. The goodbye is always written exactly once.
pub fn drive(
    session: &RefCell<Session>,
    reader: &mut impl LineReader,
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    let out = Arc::clone(session.borrow().out());
    let result = loop {
        if shutdown.is_cancelled() {
            break Ok(());
        }
        let line = match reader.read_line(PROMPT) {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };
        if tokenize(&line).is_empty() {
            continue;
        }
        reader.remember(&line);

        let mut current = session.borrow_mut();
        let status = current.execute_line(&line);
        tracing::debug!(?status, "command finished");
        if current.exit_requested() {
            break Ok(());
        }
    };
    out.goodbye();
    result
}

/// Interactive terminal mode.
pub fn run_terminal(session: Session, shutdown: CancellationToken) -> anyhow::Result<()> {
    session.out().write(&banner());
    if !(std::io::stdin().is_terminal() && std::io::stdout().is_terminal()) {
        let mut reader = PipedReader::new(std::io::stdin().lock(), Arc::clone(session.out()));
        return drive(&RefCell::new(session), &mut reader, &shutdown);
    }
    let session = Rc::new(RefCell::new(session));
    let mut editor = ConsoleEditor::new(Rc::clone(&session))?;
    drive(&session, &mut editor, &shutdown)
}
