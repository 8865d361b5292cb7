//! Configuration for agent runs.

use std::path::PathBuf;

/// Binary launched when no override is configured.
pub const DEFAULT_BINARY: &str = "claude";

/// Environment variable the agent CLI reads its API key from.
pub const API_KEY_ENV_VAR: &str = "ANTHROPIC_API_KEY";

/// Which tools the agent may call.
///
/// A rule matches a tool name exactly, or by prefix when it ends in `*`
/// (`mcp__omni-api__*`). Deny rules win over allow rules; an empty allow
/// list allows every tool that is not denied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolPolicy {
    /// Tools the agent may call.
    pub allowed: Vec<String>,
    /// Tools the agent must not call.
    pub denied: Vec<String>,
}

impl ToolPolicy {
    /// Creates a policy that permits everything.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allowed: Vec::new(),
            denied: Vec::new(),
        }
    }

    /// Adds an allow rule.
    #[must_use]
    pub fn allow(mut self, rule: impl Into<String>) -> Self {
        self.allowed.push(rule.into());
        self
    }

    /// Adds a deny rule.
    #[must_use]
    pub fn deny(mut self, rule: impl Into<String>) -> Self {
        self.denied.push(rule.into());
        self
    }

    /// Returns whether the policy lets the agent call `tool_name`.
    #[must_use]
    pub fn permits(&self, tool_name: &str) -> bool {
        if self.denied.iter().any(|rule| rule_matches(rule, tool_name)) {
            return false;
        }
        self.allowed.is_empty() || self.allowed.iter().any(|rule| rule_matches(rule, tool_name))
    }
}

fn rule_matches(rule: &str, tool_name: &str) -> bool {
    rule.strip_suffix('*')
        .map_or_else(|| rule == tool_name, |prefix| tool_name.starts_with(prefix))
}

/// Configuration for an agent run.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Agent CLI binary name or path.
    pub binary: String,
    /// Working directory for the agent process.
    pub working_dir: Option<PathBuf>,
    /// Whether to skip permission prompts (dangerous mode).
    pub skip_permissions: bool,
    /// Optional model override.
    pub model: Option<String>,
    /// Session ID to resume.
    pub session_id: Option<String>,
    /// Resume into a new session instead of continuing the old one.
    pub fork_session: bool,
    /// Replaces the agent's system prompt.
    pub system_prompt: Option<String>,
    /// Appended to the agent's default system prompt.
    pub append_system_prompt: Option<String>,
    /// MCP server configuration file.
    pub mcp_config: Option<PathBuf>,
    /// Tool allow/deny rules.
    pub tool_policy: ToolPolicy,
    /// Environment variable that must hold an API key before spawning, if any.
    pub api_key_env_var: Option<String>,
    /// Channel buffer size for raw chunks (0 = unbounded).
    pub channel_buffer_size: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            working_dir: None,
            skip_permissions: false,
            model: None,
            session_id: None,
            fork_session: false,
            system_prompt: None,
            append_system_prompt: None,
            mcp_config: None,
            tool_policy: ToolPolicy::new(),
            api_key_env_var: Some(API_KEY_ENV_VAR.to_string()),
            channel_buffer_size: 100,
        }
    }

    /// Sets the agent binary.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Sets the working directory for the agent process.
    #[must_use]
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    /// Enables dangerous mode to skip permission prompts.
    #[must_use]
    pub const fn with_skip_permissions(mut self) -> Self {
        self.skip_permissions = true;
        self
    }

    /// Sets the model to use.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the session ID to resume.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Forks the resumed session instead of continuing it.
    #[must_use]
    pub const fn with_fork_session(mut self) -> Self {
        self.fork_session = true;
        self
    }

    /// Replaces the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Appends to the default system prompt.
    #[must_use]
    pub fn with_append_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.append_system_prompt = Some(prompt.into());
        self
    }

    /// Sets the MCP server configuration file.
    #[must_use]
    pub fn with_mcp_config(mut self, path: PathBuf) -> Self {
        self.mcp_config = Some(path);
        self
    }

    /// Sets the tool allow/deny policy.
    #[must_use]
    pub fn with_tool_policy(mut self, policy: ToolPolicy) -> Self {
        self.tool_policy = policy;
        self
    }

    /// Skips the API key check, for agents authenticated some other way.
    #[must_use]
    pub fn without_api_key_check(mut self) -> Self {
        self.api_key_env_var = None;
        self
    }

    /// Sets the channel buffer size for raw chunks.
    #[must_use]
    pub const fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }
}
