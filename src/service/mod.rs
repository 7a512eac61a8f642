//! Remote agent service
//!
//! The conversation only needs five operations from the service: create an
//! agent, open a thread, send a turn, and delete both again. A turn's reply is
//! a pull-based, single-pass sequence of [`StreamFragment`]s.

use crate::error::ServiceError;

pub mod assistants;
pub mod sse;

/// Opaque handle to a remote agent
#[derive(Debug, Clone, PartialEq)]
pub struct AgentHandle {
    pub id: String,
    pub name: String,
    /// Parameters the agent was created with, reused for every run
    pub parameters: ModelParameters,
}

/// Opaque handle to a remote conversation thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: String,
}

/// An agent paired with the thread the conversation runs on
#[derive(Debug, Clone)]
pub struct ConversationSession {
    pub agent: AgentHandle,
    pub thread: SessionHandle,
}

/// Sampling and budget parameters for the model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParameters {
    pub temperature: f32,
    pub top_p: f32,
    pub max_completion_tokens: u32,
    pub max_prompt_tokens: u32,
}

/// Everything needed to create an agent
#[derive(Debug, Clone)]
pub struct AgentSpec {
    pub name: String,
    pub instructions: String,
    pub parameters: ModelParameters,
}

/// One unit of a streamed reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFragment {
    /// Text to render as-is
    Delta(String),
    /// The run finished normally
    Completed,
    /// The run failed on the service side
    Failed { message: String, code: String },
}

impl StreamFragment {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamFragment::Delta(_))
    }
}

/// Finite, single-pass, not restartable
pub type FragmentStream = Box<dyn Iterator<Item = Result<StreamFragment, ServiceError>>>;

/// The capabilities the conversation needs from the remote service
pub trait AgentService {
    fn create_agent(&self, spec: &AgentSpec) -> Result<AgentHandle, ServiceError>;

    fn create_session(&self, agent: &AgentHandle) -> Result<SessionHandle, ServiceError>;

    /// Submit `text` as a new turn and return the reply stream
    fn send_turn(&self, session: &ConversationSession, text: &str) -> Result<FragmentStream, ServiceError>;

    fn delete_session(&self, session: &SessionHandle) -> Result<(), ServiceError>;

    fn delete_agent(&self, agent: &AgentHandle) -> Result<(), ServiceError>;
}
