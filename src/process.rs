//! Spawning and managing the agent CLI process.

use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::stream::{read_stderr, StreamReader};
use serde_json::Value;
use std::ffi::OsString;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread;

/// Handle to a running agent process.
pub struct ProcessHandle {
    child: Option<Child>,
    stdout_thread: Option<thread::JoinHandle<()>>,
    stderr_thread: Option<thread::JoinHandle<()>>,
}

impl ProcessHandle {
    /// Spawns the agent for `prompt` and returns a receiver of raw chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started.
    pub fn spawn(config: &AgentConfig, prompt: &str) -> Result<(Self, Receiver<Value>)> {
        let mut cmd = Command::new(&config.binary);
        cmd.args(build_args(config, prompt));
        if let Some(ref dir) = config.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        log::info!(
            "spawning {} (resume: {})",
            config.binary,
            config.session_id.as_deref().unwrap_or("none")
        );
        let mut child = cmd.spawn().map_err(|e| Error::SpawnFailed { source: e })?;
        let buffer_size = config.channel_buffer_size;
        let (sender, receiver) = if buffer_size == 0 {
            let (tx, rx) = std::sync::mpsc::channel();
            (SyncSenderWrapper::Unbounded(tx), rx)
        } else {
            let (tx, rx) = sync_channel(buffer_size);
            (SyncSenderWrapper::Bounded(tx), rx)
        };
        let stdout_thread = child.stdout.take().map(|out| {
            thread::spawn(move || {
                StreamReader::new(out).read_to_channel(&sender);
            })
        });
        let stderr_thread = child
            .stderr
            .take()
            .map(|err| thread::spawn(move || read_stderr(err)));
        let handle = Self {
            child: Some(child),
            stdout_thread,
            stderr_thread,
        };
        Ok((handle, receiver))
    }

    /// Waits for the process to complete and returns the exit code.
    pub fn wait(&mut self) -> Option<i32> {
        self.child
            .as_mut()
            .and_then(|child| child.wait().ok())
            .and_then(|s| s.code())
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if let Some(ref mut child) = self.child {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stdout_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.stderr_thread.take() {
            let _ = handle.join();
        }
    }
}

/// Builds the agent command line for `config` and `prompt`.
#[must_use]
pub fn build_args(config: &AgentConfig, prompt: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--print".into(),
        "--output-format".into(),
        "stream-json".into(),
        "--verbose".into(),
    ];
    if config.skip_permissions {
        args.push("--dangerously-skip-permissions".into());
    }
    if let Some(ref model) = config.model {
        push_flag(&mut args, "--model", model);
    }
    if let Some(ref session_id) = config.session_id {
        push_flag(&mut args, "--resume", session_id);
        if config.fork_session {
            args.push("--fork-session".into());
        }
    }
    if let Some(ref prompt) = config.system_prompt {
        push_flag(&mut args, "--system-prompt", prompt);
    }
    if let Some(ref prompt) = config.append_system_prompt {
        push_flag(&mut args, "--append-system-prompt", prompt);
    }
    if let Some(ref path) = config.mcp_config {
        push_flag(&mut args, "--mcp-config", path);
    }
    if !config.tool_policy.allowed.is_empty() {
        push_flag(&mut args, "--allowedTools", config.tool_policy.allowed.join(","));
    }
    if !config.tool_policy.denied.is_empty() {
        push_flag(&mut args, "--disallowedTools", config.tool_policy.denied.join(","));
    }
    args.push(prompt.into());
    args
}

fn push_flag(args: &mut Vec<OsString>, flag: &str, value: impl Into<OsString>) {
    args.push(flag.into());
    args.push(value.into());
}

/// Wrapper to support both bounded and unbounded channels.
#[derive(Clone)]
pub enum SyncSenderWrapper {
    /// Bounded sync channel.
    Bounded(SyncSender<Value>),
    /// Unbounded channel.
    Unbounded(std::sync::mpsc::Sender<Value>),
}

impl SyncSenderWrapper {
    /// Sends a raw chunk through the channel.
    ///
    /// # Errors
    ///
    /// Returns the chunk back if the receiver has been dropped.
    pub fn send(&self, chunk: Value) -> std::result::Result<(), Value> {
        match self {
            Self::Bounded(tx) => tx.send(chunk).map_err(|e| e.0),
            Self::Unbounded(tx) => tx.send(chunk).map_err(|e| e.0),
        }
    }
}
