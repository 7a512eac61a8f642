//! Read-eval-print loop against a remote agent
//!
//! The loop is a small state machine:
//!
//! ```text
//! AwaitingInput -> Dispatching -> Streaming -> AwaitingInput
//!       |
//!       +-> Closed (exit, save, end of input)
//! ```
//!
//! Only one turn is ever in flight: a reply stream is consumed to the end
//! before the next line is read. Turn failures are printed and the loop goes
//! back to waiting for input.

use colored::Color;
use std::io::{self, BufRead, Write};

use crate::error::ServiceError;
use crate::service::{AgentService, ConversationSession, FragmentStream, StreamFragment};

pub mod console;

pub use console::Console;

/// Why the loop closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The user typed `exit`
    Exit,
    /// The user typed `save`; the remote thread must be kept
    Save,
    /// Input was closed
    EndOfInput,
}

/// A line of user input, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Empty,
    Exit,
    Save,
    Message(String),
}

impl UserInput {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            UserInput::Empty
        } else if trimmed.eq_ignore_ascii_case("exit") {
            UserInput::Exit
        } else if trimmed.eq_ignore_ascii_case("save") {
            UserInput::Save
        } else {
            UserInput::Message(trimmed.to_string())
        }
    }
}

enum LoopState {
    /// `prompt` is false right after a discarded empty line
    AwaitingInput { prompt: bool },
    Dispatching(String),
    Streaming(FragmentStream),
    Closed(ExitReason),
}

/// Banner and prompt text shown by the loop
#[derive(Debug, Clone)]
pub struct UiMessages {
    pub welcome_message: String,
    pub prompt_message: String,
}

pub struct ConversationLoop<'a, S: AgentService + ?Sized> {
    service: &'a S,
    session: &'a ConversationSession,
    ui: UiMessages,
}

impl<'a, S: AgentService + ?Sized> ConversationLoop<'a, S> {
    pub fn new(service: &'a S, session: &'a ConversationSession, ui: UiMessages) -> Self {
        Self { service, session, ui }
    }

    /// Run until the user exits or input ends.
    ///
    /// Only console write failures are returned as errors.
    pub fn run<R: BufRead, W: Write>(&self, mut input: R, console: &mut Console<W>) -> io::Result<ExitReason> {
        console.print(&self.ui.welcome_message, Color::Cyan)?;
        console.print(&"-".repeat(self.ui.welcome_message.chars().count()), Color::Cyan)?;

        let mut state = LoopState::AwaitingInput { prompt: true };

        loop {
            state = match state {
                LoopState::AwaitingInput { prompt } => {
                    if prompt {
                        console.print(&format!("\n{}", self.ui.prompt_message), Color::Yellow)?;
                    }
                    self.await_input(&mut input, console)?
                }
                LoopState::Dispatching(text) => self.dispatch(&text, console)?,
                LoopState::Streaming(stream) => {
                    render_turn(stream, console)?;
                    LoopState::AwaitingInput { prompt: true }
                }
                LoopState::Closed(reason) => {
                    log::info!("Conversation closed: {:?}", reason);
                    return Ok(reason);
                }
            };
        }
    }

    fn await_input<R: BufRead, W: Write>(&self, input: &mut R, console: &mut Console<W>) -> io::Result<LoopState> {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(LoopState::Closed(ExitReason::EndOfInput));
        }

        let next = match UserInput::parse(&line) {
            UserInput::Empty => LoopState::AwaitingInput { prompt: false },
            UserInput::Exit => LoopState::Closed(ExitReason::Exit),
            UserInput::Save => {
                console.print(
                    &format!(
                        "Saving thread with ID: {} for agent ID: {}. It will not be deleted on exit.",
                        self.session.thread.id, self.session.agent.id
                    ),
                    Color::Green,
                )?;
                LoopState::Closed(ExitReason::Save)
            }
            UserInput::Message(text) => LoopState::Dispatching(text),
        };
        Ok(next)
    }

    fn dispatch<W: Write>(&self, text: &str, console: &mut Console<W>) -> io::Result<LoopState> {
        log::info!("Dispatching turn ({} chars) on thread {}", text.len(), self.session.thread.id);

        match self.service.send_turn(self.session, text) {
            Ok(stream) => Ok(LoopState::Streaming(stream)),
            Err(e) => {
                log::warn!("Failed to dispatch turn: {}", e);
                report_turn_error(&e, console)?;
                Ok(LoopState::AwaitingInput { prompt: true })
            }
        }
    }
}

/// Render one reply; exactly one newline ends the turn
fn render_turn<W: Write>(stream: FragmentStream, console: &mut Console<W>) -> io::Result<()> {
    let mut line_open = false;

    for item in stream {
        match item {
            Ok(StreamFragment::Delta(text)) => {
                console.fragment(&text, Color::White)?;
                line_open = true;
            }
            Ok(StreamFragment::Completed) => {
                return console.newline();
            }
            Ok(StreamFragment::Failed { message, code }) => {
                log::warn!("Run failed: {} ({})", message, code);
                if line_open {
                    console.newline()?;
                }
                return console.print(&format!("Error: {} (code: {})", message, code), Color::Red);
            }
            Err(e) => {
                log::warn!("Stream failed: {}", e);
                if line_open {
                    console.newline()?;
                }
                return report_turn_error(&e, console);
            }
        }
    }

    // Stream ended without a completion signal
    console.newline()
}

fn report_turn_error<W: Write>(error: &ServiceError, console: &mut Console<W>) -> io::Result<()> {
    console.print(&format!("Error during agent run: {}", error), Color::Red)
}

/// What happened to the remote session after the loop closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    Kept,
    Deleted,
}

/// Delete the thread and then the agent, unless the conversation was saved or
/// `keep_on_exit` is set. Both deletions are attempted; the first error wins.
pub fn cleanup<S: AgentService + ?Sized>(
    service: &S,
    session: &ConversationSession,
    reason: ExitReason,
    keep_on_exit: bool,
) -> Result<Cleanup, ServiceError> {
    if reason == ExitReason::Save || keep_on_exit {
        log::info!(
            "Keeping thread {} and agent {} ({:?}, keep_on_exit={})",
            session.thread.id,
            session.agent.id,
            reason,
            keep_on_exit
        );
        return Ok(Cleanup::Kept);
    }

    let thread = service.delete_session(&session.thread);
    let agent = service.delete_agent(&session.agent);
    thread.and(agent).map(|_| Cleanup::Deleted)
}
