//! Subprocess helpers shared by the producer and query-tool adapters.
use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured result of a finished child process.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Split a configured command string into program and arguments.
pub fn split_command(command: &str) -> Result<Vec<String>> {
    let parts = shell_words::split(command).with_context(|| format!("parse command: {command}"))?;
    if parts.is_empty() {
        return Err(anyhow!("command is empty"));
    }
    Ok(parts)
}

/// Resolve a bare program name on `PATH`; anything with a separator is used
/// as given.
pub fn resolve_program(program: &str) -> Result<PathBuf> {
    if program.contains('/') {
        return Ok(PathBuf::from(program));
    }
    which::which(program).with_context(|| format!("find {program} on PATH"))
}

/// Run `argv` to completion with `env` added to the inherited environment,
/// capturing stdout and stderr.
///
/// With a timeout, the child runs in its own process group and the whole
/// group is killed once the deadline passes. Exit status is reported, not
/// interpreted.
pub fn run_captured(
    argv: &[String],
    env: &[(&str, &str)],
    timeout: Option<Duration>,
) -> Result<CommandOutput> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("missing command"))?;
    let resolved = resolve_program(program)?;

    let start = Instant::now();
    let mut command = Command::new(&resolved);
    command
        .args(args)
        .envs(env.iter().copied())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if timeout.is_some() {
        command.process_group(0);
    }
    let mut child = command
        .spawn()
        .with_context(|| format!("spawn {}", resolved.display()))?;

    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let status = match timeout {
        None => child
            .wait()
            .with_context(|| format!("wait for {program}"))?,
        Some(limit) => loop {
            if let Some(status) = child
                .try_wait()
                .with_context(|| format!("poll {program}"))?
            {
                break status;
            }
            if start.elapsed() >= limit {
                kill_process_group(&child).with_context(|| format!("kill {program}"))?;
                child.wait().with_context(|| format!("reap {program}"))?;
                // The group is gone, so the pipes are closed and the readers finish.
                join_reader(stdout_reader).ok();
                join_reader(stderr_reader).ok();
                return Err(anyhow!(
                    "{program} timed out after {}s",
                    limit.as_secs_f64()
                ));
            }
            thread::sleep(POLL_INTERVAL);
        },
    };

    let stdout = join_reader(stdout_reader).with_context(|| format!("read {program} stdout"))?;
    let stderr = join_reader(stderr_reader).with_context(|| format!("read {program} stderr"))?;

    tracing::info!(
        program = program.as_str(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        stdout_bytes = stdout.len(),
        status = %status,
        "command complete"
    );

    let stdout = String::from_utf8(stdout).with_context(|| format!("decode {program} stdout as UTF-8"))?;
    let stderr = String::from_utf8_lossy(&stderr).to_string();
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
    })
}

/// Like [`run_captured`], but a non-zero exit is an error carrying the first
/// line of stderr.
pub fn run_checked(
    argv: &[String],
    env: &[(&str, &str)],
    timeout: Option<Duration>,
) -> Result<String> {
    let output = run_captured(argv, env, timeout)?;
    if !output.status.success() {
        let stderr_line = output.stderr.trim().lines().next().unwrap_or_default();
        let detail = if stderr_line.is_empty() {
            format!("status {}", output.status)
        } else {
            format!("status {}: {stderr_line}", output.status)
        };
        return Err(anyhow!("{} failed with {detail}", argv[0]));
    }
    Ok(output.stdout)
}

/// SIGKILL the process group led by `child`. A group that already exited
/// is not an error.
fn kill_process_group(child: &Child) -> std::io::Result<()> {
    let pgid = libc::pid_t::try_from(child.id())
        .map_err(|_| std::io::Error::other("child pid out of range"))?;
    // SAFETY: killpg only sends a signal to the group this child leads.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Ok(());
    }
    Err(err)
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join_reader(reader: Option<thread::JoinHandle<std::io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    let Some(reader) = reader else {
        return Ok(Vec::new());
    };
    let bytes = reader
        .join()
        .map_err(|_| anyhow!("output reader thread panicked"))??;
    Ok(bytes)
}
