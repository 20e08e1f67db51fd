//! Server configuration

use serde::Deserialize;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server host (http MCP mode)
    #[serde(default = "default_http_host")]
    pub http_host: String,

    /// HTTP server port (http MCP mode)
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// MCP transport: "stdio" or "http"
    #[serde(default = "default_mcp_mode")]
    pub mcp_mode: String,

    /// Path the streamable HTTP MCP endpoint is mounted at
    #[serde(default = "default_mcp_path")]
    pub mcp_path: String,

    /// Shell used to interpret commands
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Timeout applied when a caller does not pass one
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Upper bound on caller supplied timeouts
    #[serde(default = "default_max_timeout_secs")]
    pub max_timeout_secs: u64,

    /// Per-stream capture cap; output past this is drained and discarded
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Finished background jobs retained before the oldest are evicted
    #[serde(default = "default_max_finished_jobs")]
    pub max_finished_jobs: usize,

    /// How long to keep draining pipes after the process group was killed
    #[serde(default = "default_drain_grace_ms")]
    pub drain_grace_ms: u64,
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8000
}

fn default_mcp_mode() -> String {
    "stdio".to_string()
}

fn default_mcp_path() -> String {
    "/mcp".to_string()
}

#[cfg(unix)]
fn default_shell() -> String {
    "/bin/sh".to_string()
}

#[cfg(not(unix))]
fn default_shell() -> String {
    "cmd".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_timeout_secs() -> u64 {
    3600 // 1 hour
}

fn default_max_output_bytes() -> usize {
    1024 * 1024
}

fn default_max_finished_jobs() -> usize {
    crate::infra::job_registry::DEFAULT_MAX_FINISHED
}

fn default_drain_grace_ms() -> u64 {
    1000
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> anyhow::Result<Self> {
        // Start with default config as base
        let mut config = Config::default();

        // Override with environment variables
        if let Ok(val) = std::env::var("SHELL_TOOLS_HTTP_HOST") {
            config.http_host = val;
        }
        if let Ok(val) = std::env::var("SHELL_TOOLS_HTTP_PORT") {
            config.http_port = val
                .parse()
                .map_err(|e| anyhow::anyhow!("SHELL_TOOLS_HTTP_PORT: {}", e))?;
        }
        if let Ok(val) = std::env::var("SHELL_TOOLS_MCP_MODE") {
            config.mcp_mode = val;
        }
        if let Ok(val) = std::env::var("SHELL_TOOLS_MCP_PATH") {
            config.mcp_path = val;
        }
        if let Ok(val) = std::env::var("SHELL_TOOLS_SHELL") {
            config.shell = val;
        }
        if let Ok(val) = std::env::var("SHELL_TOOLS_DEFAULT_TIMEOUT") {
            if let Ok(secs) = val.parse() {
                config.default_timeout_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("SHELL_TOOLS_MAX_TIMEOUT") {
            if let Ok(secs) = val.parse() {
                config.max_timeout_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("SHELL_TOOLS_MAX_OUTPUT_BYTES") {
            if let Ok(bytes) = val.parse() {
                config.max_output_bytes = bytes;
            }
        }
        if let Ok(val) = std::env::var("SHELL_TOOLS_MAX_FINISHED_JOBS") {
            if let Ok(count) = val.parse() {
                config.max_finished_jobs = count;
            }
        }
        if let Ok(val) = std::env::var("SHELL_TOOLS_DRAIN_GRACE_MS") {
            if let Ok(ms) = val.parse() {
                config.drain_grace_ms = ms;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the supervisor cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        if !matches!(self.mcp_mode.as_str(), "stdio" | "http") {
            anyhow::bail!(
                "unsupported MCP mode '{}', expected 'stdio' or 'http'",
                self.mcp_mode
            );
        }
        if self.default_timeout_secs == 0 {
            anyhow::bail!("default timeout must be positive");
        }
        if self.default_timeout_secs > self.max_timeout_secs {
            anyhow::bail!(
                "default timeout {}s exceeds maximum {}s",
                self.default_timeout_secs,
                self.max_timeout_secs
            );
        }
        if !self.mcp_path.starts_with('/') {
            anyhow::bail!("MCP path must start with '/': {}", self.mcp_path);
        }
        Ok(())
    }

    /// Address the HTTP transport binds to
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_host: default_http_host(),
            http_port: default_http_port(),
            mcp_mode: default_mcp_mode(),
            mcp_path: default_mcp_path(),
            shell: default_shell(),
            default_timeout_secs: default_timeout_secs(),
            max_timeout_secs: default_max_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
            max_finished_jobs: default_max_finished_jobs(),
            drain_grace_ms: default_drain_grace_ms(),
        }
    }
}
