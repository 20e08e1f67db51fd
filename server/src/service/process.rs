//! Process service
//!
//! Runs shell command strings as child processes. Every child is started in
//! its own process group so a timeout can take down everything the command
//! spawned, not just the shell. Foreground runs block the calling task until
//! exit or deadline; background runs hand the child to a watcher task and
//! return a job id straight away.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::job::{ExitOutcome, JobSnapshot, JobSummary};
use crate::domain::types::{CommandRequest, CommandResult};
use crate::error::{Error, Result};
use crate::infra::job_registry::{Job, JobRegistry};
use crate::infra::output_buffer::OutputBuffer;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// A spawned child plus the tasks pumping its output
struct Execution {
    child: Child,
    pid: Option<u32>,
    stdout: OutputBuffer,
    stderr: OutputBuffer,
    readers: JoinSet<()>,
}

/// Process service for executing shell commands
pub struct ProcessService {
    registry: Arc<JobRegistry>,
    shell: String,
    default_timeout_secs: u64,
    max_timeout_secs: u64,
    max_output_bytes: usize,
    drain_grace: Duration,
}

impl ProcessService {
    /// Create a new process service
    pub fn new(registry: Arc<JobRegistry>, config: &Config) -> Self {
        Self {
            registry,
            shell: config.shell.clone(),
            default_timeout_secs: config.default_timeout_secs,
            max_timeout_secs: config.max_timeout_secs,
            max_output_bytes: config.max_output_bytes,
            drain_grace: Duration::from_millis(config.drain_grace_ms),
        }
    }

    /// Run a command, in the foreground or as a background job
    pub async fn run(&self, req: CommandRequest) -> Result<CommandResult> {
        let timeout_secs = self.resolve_timeout(req.timeout_secs)?;
        if req.command.trim().is_empty() {
            return Err(Error::InvalidArgument("command must not be empty".to_string()));
        }
        let cwd = resolve_cwd(req.cwd.as_deref()).await?;

        info!(
            "Running shell command: {} in {} with timeout = {}s run_in_bg = {}",
            req.command,
            cwd.display(),
            timeout_secs,
            req.background
        );

        let exec = self.spawn(&req.command, &cwd)?;
        let timeout = Duration::from_secs(timeout_secs);

        if req.background {
            return Ok(self.detach(exec, req.command, cwd, timeout_secs));
        }

        let stdout = exec.stdout.clone();
        let stderr = exec.stderr.clone();
        let outcome = supervise(exec, timeout, self.drain_grace).await;

        let (stdout, stdout_truncated) = stdout.text().await;
        let (stderr, stderr_truncated) = stderr.text().await;

        let (exit_code, timed_out) = match outcome {
            ExitOutcome::Exited(code) => (Some(code), false),
            ExitOutcome::TimedOut => {
                warn!("Command timed out after {}s: {}", timeout_secs, req.command);
                (None, true)
            }
            ExitOutcome::Failed(message) => {
                error!("Command supervision failed: {}", message);
                return Err(Error::Internal(message));
            }
        };

        Ok(CommandResult {
            exit_code,
            stdout,
            stderr,
            timed_out,
            job_id: None,
            truncated: stdout_truncated || stderr_truncated,
        })
    }

    /// Snapshot of a background job
    pub async fn job_status(&self, job_id: &str) -> Result<JobSnapshot> {
        self.registry.get(job_id).await
    }

    /// All background jobs, oldest first
    pub fn job_list(&self) -> Vec<JobSummary> {
        self.registry.list()
    }

    /// Drop a finished background job from the registry
    pub async fn job_reap(&self, job_id: &str) -> Result<JobSnapshot> {
        self.registry.reap(job_id).await
    }

    /// The job registry backing this service
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    fn resolve_timeout(&self, requested: Option<u64>) -> Result<u64> {
        let secs = requested.unwrap_or(self.default_timeout_secs);
        if secs == 0 {
            return Err(Error::InvalidArgument(
                "timeout must be a positive number of seconds".to_string(),
            ));
        }
        if secs > self.max_timeout_secs {
            return Err(Error::InvalidArgument(format!(
                "timeout {}s exceeds maximum of {}s",
                secs, self.max_timeout_secs
            )));
        }
        Ok(secs)
    }

    fn spawn(&self, command: &str, cwd: &Path) -> Result<Execution> {
        let mut cmd = Command::new(&self.shell);
        #[cfg(unix)]
        cmd.arg("-c");
        #[cfg(windows)]
        cmd.arg("/C");
        cmd.arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // New group led by the shell, so killpg reaches its children too
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::LaunchError(format!("{}: {}", self.shell, e)))?;
        let pid = child.id();
        debug!("Spawned pid {:?} for: {}", pid, command);

        let stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("stdout not captured".to_string()))?;
        let stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| Error::Internal("stderr not captured".to_string()))?;

        let stdout = OutputBuffer::new(self.max_output_bytes);
        let stderr = OutputBuffer::new(self.max_output_bytes);

        let mut readers = JoinSet::new();
        readers.spawn(pump(stdout_pipe, stdout.clone()));
        readers.spawn(pump(stderr_pipe, stderr.clone()));

        Ok(Execution {
            child,
            pid,
            stdout,
            stderr,
            readers,
        })
    }

    /// Register the execution as a job and leave it to a watcher task
    fn detach(&self, exec: Execution, command: String, cwd: PathBuf, timeout_secs: u64) -> CommandResult {
        let job_id = Uuid::new_v4().to_string();
        let job = Job::running(
            job_id.clone(),
            command,
            cwd,
            exec.pid,
            timeout_secs,
            exec.stdout.clone(),
            exec.stderr.clone(),
        );
        self.registry.insert(job);

        let registry = self.registry.clone();
        let id = job_id.clone();
        let grace = self.drain_grace;
        tokio::spawn(async move {
            let outcome = supervise(exec, Duration::from_secs(timeout_secs), grace).await;
            registry.finish(&id, &outcome);
        });

        info!("Process started in background as job {}", job_id);
        CommandResult::launched(job_id)
    }
}

/// Validate the requested working directory, defaulting to our own
async fn resolve_cwd(cwd: Option<&Path>) -> Result<PathBuf> {
    let Some(dir) = cwd else {
        return std::env::current_dir()
            .map_err(|e| Error::Internal(format!("Failed to get current directory: {}", e)));
    };

    match tokio::fs::metadata(dir).await {
        Ok(metadata) if metadata.is_dir() => Ok(dir.to_path_buf()),
        Ok(_) => Err(Error::InvalidArgument(format!(
            "working directory is not a directory: {}",
            dir.display()
        ))),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::InvalidArgument(format!(
            "working directory does not exist: {}",
            dir.display()
        ))),
        Err(e) => Err(Error::InvalidArgument(format!(
            "working directory {} is not accessible: {}",
            dir.display(),
            e
        ))),
    }
}

/// Copy a pipe into a buffer until EOF or read error
async fn pump<R>(mut pipe: R, buffer: OutputBuffer)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buffer.append(&chunk[..n]).await,
            Err(e) => {
                debug!("Output pipe read failed: {}", e);
                break;
            }
        }
    }
}

/// Wait for the child under a deadline, then drain its output.
///
/// After a normal exit the pipes may still be held by leftover group
/// members; they get until the deadline (at least one grace period) to
/// close, then whatever is left of the group is killed. Descendants that
/// left the group (setsid) are out of reach; their readers are abandoned.
async fn supervise(mut exec: Execution, timeout: Duration, grace: Duration) -> ExitOutcome {
    let deadline = Instant::now() + timeout;

    let outcome = match time::timeout_at(deadline, exec.child.wait()).await {
        Ok(Ok(status)) => ExitOutcome::Exited(exit_code(status)),
        Ok(Err(e)) => {
            kill_group(&mut exec.child, exec.pid);
            ExitOutcome::Failed(format!("Failed to wait for process: {}", e))
        }
        Err(_) => {
            debug!("Deadline hit for pid {:?}, killing process group", exec.pid);
            kill_group(&mut exec.child, exec.pid);
            if let Err(e) = exec.child.wait().await {
                warn!("Failed to reap timed out process: {}", e);
            }
            ExitOutcome::TimedOut
        }
    };

    let drain_deadline = match outcome {
        ExitOutcome::Exited(_) => deadline.max(Instant::now() + grace),
        _ => Instant::now() + grace,
    };

    if time::timeout_at(drain_deadline, drain(&mut exec.readers))
        .await
        .is_err()
    {
        debug!("Output still open for pid {:?}", exec.pid);
        kill_leftover_group(exec.pid);
        if time::timeout(grace, drain(&mut exec.readers)).await.is_err() {
            warn!("Abandoning output readers for pid {:?}", exec.pid);
            exec.readers.abort_all();
        }
    }

    outcome
}

async fn drain(readers: &mut JoinSet<()>) {
    while readers.join_next().await.is_some() {}
}

/// SIGKILL what remains of a group whose leader was already reaped.
///
/// A pgid stays reserved while any member is alive. Once the group is empty
/// the number can be handed out again, so only signal a group that still
/// answers.
fn kill_leftover_group(pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let pgid = Pid::from_raw(pid as i32);
        match killpg(pgid, None) {
            Ok(()) => {
                debug!("Killing leftover members of process group {}", pid);
                if let Err(e) = killpg(pgid, Signal::SIGKILL) {
                    if e != Errno::ESRCH {
                        warn!("Failed to kill process group {}: {}", pid, e);
                    }
                }
            }
            Err(Errno::ESRCH) => debug!("Process group {} is already empty", pid),
            Err(e) => warn!("Failed to probe process group {}: {}", pid, e),
        }
    }
    #[cfg(not(unix))]
    let _ = pid;
}

/// Exit code, or 128 + signal for a signal death
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

/// SIGKILL the child's process group, falling back to the child alone
fn kill_group(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => warn!("Failed to kill process group {}: {}", pid, e),
        }
    }

    if let Err(e) = child.start_kill() {
        debug!("start_kill: {}", e);
    }
}
