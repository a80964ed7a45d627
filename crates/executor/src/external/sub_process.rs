//! A single engine process and the loop feeding it commands.

use std::borrow::Cow;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::{broadcast, mpsc};
use tracing::Instrument;

use super::de::{ChildResponse, Status, Timings};
use super::ser::ChildCommand;
use super::{
    Command,
    EngineFailure,
    LaunchResult,
    SharedReceiver,
    SubProcessEvent,
    SubprocessError,
    SubprocessExitReason,
};

/// How long a process may take to exit by itself once its stdin is closed.
const EXIT_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Span of the request being served, so that stderr lines end up next to
/// the request that caused them. `Span::none()` while idle.
type RequestSpan = Arc<Mutex<tracing::Span>>;

/// Starts an engine process and serves commands from the shared queue until
/// shutdown, the process dies, or the pipes get out of sync.
///
/// Replacing a process that exited is up to [`super::start`].
#[tracing::instrument(name = "engine", skip_all, fields(pid))]
pub(super) async fn launch(
    program: Arc<std::path::PathBuf>,
    database_path: Arc<std::path::PathBuf>,
    commands: SharedReceiver<(Command, tracing::Span)>,
    events: mpsc::Sender<SubProcessEvent>,
    mut shutdown: broadcast::Receiver<()>,
) -> LaunchResult {
    let mut process = EngineProcess::spawn(&program, &database_path)
        .await
        .context("Starting engine process")?;
    let pid = process.pid;

    events
        .send(SubProcessEvent::ProcessLaunched(pid))
        .await
        .context("Reporting engine process launch")?;
    tracing::info!("Engine process ready");

    let reason = loop {
        let next = async { commands.lock().await.recv().await };

        // Losing the race for the queue lock is harmless since we exit anyway.
        let (command, span) = tokio::select! {
            next = next => match next {
                Some(next) => next,
                None => break SubprocessExitReason::Shutdown,
            },
            _ = process.child.wait() => break SubprocessExitReason::Death,
            _ = shutdown.recv() => break SubprocessExitReason::Shutdown,
        };

        // Nobody is waiting for the answer anymore.
        if command.is_closed() {
            continue;
        }

        span.record("pid", pid);

        let outcome = tokio::select! {
            outcome = process.handle(command).instrument(span) => outcome,
            _ = shutdown.recv() => break SubprocessExitReason::Shutdown,
        };
        process.idle();

        match outcome {
            Ok((timings, status)) => {
                // Dropped events only cost us a log line.
                let _ = events
                    .send(SubProcessEvent::CommandHandled(pid, timings, status))
                    .await;
            }
            Err(None) => continue,
            Err(Some(reason)) => break reason,
        }

        if !process.stdout.buffer().is_empty() {
            tracing::warn!("Engine process wrote more than one response line");
            break SubprocessExitReason::UnrecoverableIO;
        }
    };

    tracing::trace!(?reason, "Stopping engine process");
    let exit_status = process.stop().await;

    Ok((pid, exit_status, reason))
}

struct EngineProcess {
    child: Child,
    pid: u32,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    /// Last line read from stdout, kept around for error reports.
    line: String,
    /// Serialized command, reused between calls.
    request: Vec<u8>,
    request_span: RequestSpan,
}

impl EngineProcess {
    /// Spawns the program with the database path as its only argument and
    /// waits for it to print `ready`.
    async fn spawn(program: &Path, database_path: &Path) -> anyhow::Result<Self> {
        let mut child = tokio::process::Command::new(program)
            .arg(database_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Spawning {}", program.display()))?;

        let pid = child.id().context("Engine process exited immediately")?;
        tracing::Span::current().record("pid", pid);

        let stdin = child.stdin.take().context("Engine stdin is not piped")?;
        let stdout = child.stdout.take().context("Engine stdout is not piped")?;
        let stderr = child.stderr.take().context("Engine stderr is not piped")?;

        let request_span = RequestSpan::new(Mutex::new(tracing::Span::none()));
        tokio::spawn(forward_stderr(stderr, Arc::clone(&request_span)));

        let mut process = Self {
            child,
            pid,
            stdin,
            stdout: BufReader::new(stdout),
            line: String::new(),
            request: Vec::new(),
            request_span,
        };

        // An engine which cannot use the database, or a program which is no
        // engine at all, fails here.
        process
            .stdout
            .read_line(&mut process.line)
            .await
            .context("Reading engine handshake")?;
        anyhow::ensure!(
            process.line.trim() == "ready",
            "Expected 'ready' from engine process, got {:?}",
            process.line
        );

        Ok(process)
    }

    /// Runs one command and answers the caller.
    ///
    /// `Err(None)` means the command was dropped and the process is still
    /// usable, `Err(Some(_))` that the process must be replaced.
    async fn handle(
        &mut self,
        mut command: Command,
    ) -> Result<(Timings, Status), Option<SubprocessExitReason>> {
        self.set_request_span(tracing::info_span!("stderr"));

        self.request.clear();
        if let Err(error) =
            serde_json::to_writer(&mut self.request, &ChildCommand::from(&command.call))
        {
            tracing::error!(%error, "Serializing engine command");
            command.fail(EngineFailure::Internal(anyhow::anyhow!(
                "Failed to serialize engine command"
            )));
            return Err(None);
        }

        // Abandoning a half written request leaves the pipe unusable, which
        // is fine since the process is killed in that case.
        let exchanged = tokio::select! {
            exchanged = self.exchange() => exchanged,
            _ = command.closed() => return Err(Some(SubprocessExitReason::Cancellation)),
        };

        let (timings, status, output) = match exchanged {
            Ok(response) => response,
            Err(SubprocessError::IO) => {
                command.fail(EngineFailure::Internal(anyhow::anyhow!(
                    "Engine process input/output failed"
                )));
                return Err(Some(SubprocessExitReason::UnrecoverableIO));
            }
            Err(SubprocessError::InvalidJson(error)) => {
                tracing::error!(%error, line=?self.line, "Engine response is not json");
                bad_response("Invalid json received from engine")
            }
            Err(SubprocessError::InvalidResponse) => {
                tracing::error!(line=?self.line, "Engine response has an unexpected shape");
                bad_response("Invalid response received from engine")
            }
        };

        // The caller may have gone already.
        let _ = command.response.send(output);

        Ok((timings, status))
    }

    /// Writes the serialized request as one line and reads one line back.
    async fn exchange(
        &mut self,
    ) -> Result<(Timings, Status, Result<Vec<lantern_common::CallResultValue>, EngineFailure>), SubprocessError>
    {
        self.stdin.write_all(&self.request).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;

        self.line.clear();
        if self.stdout.read_line(&mut self.line).await? == 0 {
            return Err(SubprocessError::IO);
        }

        let response = serde_json::from_str::<ChildResponse<'_>>(&self.line)
            .map_err(SubprocessError::InvalidJson)?;

        Ok(response.refine()?.into_messages())
    }

    fn set_request_span(&self, span: tracing::Span) {
        *self
            .request_span
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = span;
    }

    fn idle(&self) {
        self.set_request_span(tracing::Span::none());
    }

    /// Closes the pipes and waits for the process to exit, killing it after
    /// the grace period.
    async fn stop(self) -> Option<ExitStatus> {
        self.idle();

        let Self {
            mut child,
            stdin,
            stdout,
            ..
        } = self;
        drop(stdin);
        drop(stdout);

        if let Ok(exited) = tokio::time::timeout(EXIT_GRACE_PERIOD, child.wait()).await {
            return exited.ok();
        }

        if let Err(error) = child.kill().await {
            tracing::warn!(%error, "Killing engine process");
        }
        child
            .wait()
            .await
            .inspect_err(|error| tracing::warn!(%error, "Waiting for engine process"))
            .ok()
    }
}

fn bad_response(
    reason: &'static str,
) -> (Timings, Status, Result<Vec<lantern_common::CallResultValue>, EngineFailure>) {
    (
        Timings::default(),
        Status::Failed,
        Err(EngineFailure::Internal(anyhow::anyhow!(reason))),
    )
}

/// Re-emits the engine's stderr as tracing events until the pipe closes.
async fn forward_stderr(stderr: ChildStderr, request_span: RequestSpan) {
    let idle_span = tracing::info_span!("stderr");
    let mut lines = BufReader::new(stderr).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                tracing::debug!(%error, "Reading engine stderr");
                break;
            }
        };

        let Some((level, message)) = parse_stderr_line(&line) else {
            continue;
        };

        let current = request_span
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let span = if current.is_none() { &idle_span } else { &*current };
        let _entered = span.enter();

        match level {
            tracing::Level::ERROR => tracing::error!("{message}"),
            tracing::Level::WARN => tracing::warn!("{message}"),
            tracing::Level::INFO => tracing::info!("{message}"),
            tracing::Level::DEBUG => tracing::debug!("{message}"),
            tracing::Level::TRACE => tracing::trace!("{message}"),
        }
    }
}

/// Splits a stderr line into its level and message.
///
/// A leading digit selects the level, `0` being error and `4` trace, and a
/// message starting with a quote is a json string so that it can span
/// lines. Anything else did not come from the engine's own logging and is
/// reported as an error.
fn parse_stderr_line(line: &str) -> Option<(tracing::Level, Cow<'_, str>)> {
    let line = line.trim();
    let first = line.chars().next()?;

    let level = match first {
        '0' => tracing::Level::ERROR,
        '1' => tracing::Level::WARN,
        '2' => tracing::Level::INFO,
        '3' => tracing::Level::DEBUG,
        '4' => tracing::Level::TRACE,
        _ => return Some((tracing::Level::ERROR, Cow::Borrowed(line))),
    };

    let message = &line[1..];
    let message = message
        .starts_with('"')
        .then(|| serde_json::from_str::<String>(message).ok())
        .flatten()
        .map_or(Cow::Borrowed(message), Cow::Owned);

    Some((level, message))
}

#[cfg(test)]
mod tests {
    use pretty_assertions_sorted::assert_eq;

    use super::*;

    #[rstest::rstest]
    #[case::error("0boom", tracing::Level::ERROR, "boom")]
    #[case::trace("4details", tracing::Level::TRACE, "details")]
    #[case::json_string("2\"multi\\nline\"", tracing::Level::INFO, "multi\nline")]
    #[case::broken_json_string("3\"unterminated", tracing::Level::DEBUG, "\"unterminated")]
    #[case::foreign(
        "Traceback (most recent call last):",
        tracing::Level::ERROR,
        "Traceback (most recent call last):"
    )]
    fn stderr_levels(#[case] line: &str, #[case] level: tracing::Level, #[case] message: &str) {
        let (parsed_level, parsed) = parse_stderr_line(line).unwrap();
        assert_eq!(parsed_level, level);
        assert_eq!(parsed, message);
    }

    #[test]
    fn blank_stderr_line_is_skipped() {
        assert!(parse_stderr_line("  \n").is_none());
    }
}
