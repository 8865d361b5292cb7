//! Agent session management.

use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::events::{ErrorChunk, ParsedChunk, ToolUseChunk};
use crate::interpreter::StreamInterpreter;
use crate::process::ProcessHandle;
use crate::store::SessionStore;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

struct ThreadBinding {
    store: Arc<dyn SessionStore>,
    thread_id: String,
    resource_id: String,
}

/// A conversation with the agent.
///
/// The session owns the agent process for the current turn, the interpreter
/// decoding its output, and the upstream session id used to resume later
/// turns.
pub struct AgentSession {
    config: AgentConfig,
    process: Option<ProcessHandle>,
    receiver: Option<Receiver<Value>>,
    session_id: Option<String>,
    interpreter: StreamInterpreter,
    binding: Option<ThreadBinding>,
}

impl AgentSession {
    /// Spawns a new agent session with the given prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent binary is not found, the API key is
    /// missing, or the process fails to spawn.
    pub fn spawn(config: AgentConfig, prompt: &str) -> Result<Self> {
        Self::start(config, prompt, None)
    }

    /// Spawns a session bound to a local conversation thread.
    ///
    /// A session id stored for the thread is resumed, and the id announced
    /// by the agent is written back to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or the agent cannot be
    /// spawned.
    pub fn spawn_for_thread(
        mut config: AgentConfig,
        prompt: &str,
        store: Arc<dyn SessionStore>,
        thread_id: &str,
        resource_id: &str,
    ) -> Result<Self> {
        if config.session_id.is_none() {
            config.session_id = store.session_id(thread_id, resource_id)?;
        }
        let binding = ThreadBinding {
            store,
            thread_id: thread_id.to_string(),
            resource_id: resource_id.to_string(),
        };
        Self::start(config, prompt, Some(binding))
    }

    fn start(config: AgentConfig, prompt: &str, binding: Option<ThreadBinding>) -> Result<Self> {
        Self::validate_environment(&config)?;
        let (process, receiver) = ProcessHandle::spawn(&config, prompt)?;
        Ok(Self {
            session_id: config.session_id.clone(),
            config,
            process: Some(process),
            receiver: Some(receiver),
            interpreter: StreamInterpreter::new(),
            binding,
        })
    }

    /// Returns an iterator over decoded events for the current turn.
    ///
    /// This consumes the receiver, so it can only be called once per turn.
    ///
    /// # Errors
    ///
    /// Returns an error if the receiver has already been consumed.
    pub fn events(&mut self) -> Result<EventIterator<'_>> {
        let receiver = self.receiver.take().ok_or(Error::ReceiverDisconnected)?;
        Ok(EventIterator {
            receiver,
            pending: VecDeque::new(),
            completed: false,
            finished: false,
            session: self,
        })
    }

    /// Sends a follow-up prompt, resuming the recorded session.
    ///
    /// Starts a new turn: the interpreter's text and tool calls are cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if no session ID is available or the process fails
    /// to spawn.
    pub fn send_input(&mut self, prompt: &str) -> Result<()> {
        let session_id = self.session_id.clone().ok_or(Error::NoSessionId)?;
        let config = AgentConfig {
            session_id: Some(session_id),
            ..self.config.clone()
        };
        Self::validate_environment(&config)?;
        self.receiver = None;
        self.process = None;
        let (process, receiver) = ProcessHandle::spawn(&config, prompt)?;
        self.process = Some(process);
        self.receiver = Some(receiver);
        self.interpreter.reset();
        Ok(())
    }

    /// Returns the upstream session ID if known.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns the assistant text of the current turn so far.
    #[must_use]
    pub fn accumulated_text(&self) -> &str {
        self.interpreter.accumulated_text()
    }

    /// Returns the tool calls announced in the current turn.
    #[must_use]
    pub fn active_tool_calls(&self) -> Vec<ToolUseChunk> {
        self.interpreter.active_tool_calls()
    }

    fn observe(&mut self, chunk: &ParsedChunk) {
        match chunk {
            ParsedChunk::System(system) => {
                if let Some(ref id) = system.session_id {
                    self.record_session_id(id);
                }
            }
            ParsedChunk::ToolUse(tool) => {
                if !self.config.tool_policy.permits(&tool.name) {
                    log::warn!("agent called {} which the tool policy denies", tool.name);
                }
            }
            _ => {}
        }
    }

    fn record_session_id(&mut self, id: &str) {
        self.session_id = Some(id.to_string());
        if let Some(ref binding) = self.binding {
            match binding
                .store
                .save_session_id(&binding.thread_id, &binding.resource_id, id)
            {
                Ok(()) => log::info!("thread {} now resumes session {id}", binding.thread_id),
                Err(e) => log::warn!("could not save session id for {}: {e}", binding.thread_id),
            }
        }
    }

    fn exit_failure(&mut self) -> Option<ParsedChunk> {
        let code = self.process.as_mut()?.wait()?;
        if code == 0 {
            return None;
        }
        Some(ParsedChunk::Error(ErrorChunk {
            message: format!("Agent process exited with code {code}"),
            details: Some(json!({ "exitCode": code })),
        }))
    }

    fn validate_environment(config: &AgentConfig) -> Result<()> {
        if !Self::binary_exists(&config.binary) {
            return Err(Error::BinaryNotFound {
                cli_name: config.binary.clone(),
            });
        }
        if let Some(ref env_var) = config.api_key_env_var {
            if std::env::var(env_var).is_err() {
                return Err(Error::ApiKeyMissing {
                    env_var: env_var.clone(),
                });
            }
        }
        Ok(())
    }

    fn binary_exists(name: &str) -> bool {
        let path = Path::new(name);
        if path.components().count() > 1 {
            return path.is_file();
        }
        std::env::var_os("PATH").is_some_and(|paths| {
            std::env::split_paths(&paths).any(|dir| dir.join(name).is_file())
        })
    }
}

impl Drop for AgentSession {
    fn drop(&mut self) {
        // The stdout reader may be parked on a full channel; closing the
        // receiver first lets it exit before the process handle joins it.
        self.receiver = None;
        self.process = None;
    }
}

/// An iterator over decoded events from one agent turn.
pub struct EventIterator<'a> {
    receiver: Receiver<Value>,
    pending: VecDeque<ParsedChunk>,
    completed: bool,
    finished: bool,
    session: &'a mut AgentSession,
}

impl Iterator for EventIterator<'_> {
    type Item = ParsedChunk;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                self.session.observe(&chunk);
                self.completed |= chunk.is_complete();
                return Some(chunk);
            }
            if self.finished {
                return None;
            }
            if let Ok(raw) = self.receiver.recv() {
                let events = self.session.interpreter.interpret_all(&raw);
                self.pending.extend(events);
            } else {
                self.finished = true;
                if !self.completed {
                    return self.session.exit_failure();
                }
                return None;
            }
        }
    }
}
