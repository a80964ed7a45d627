//! External engine process pool for executing calls.
//!
//! Each engine process is started from a configured executable with the
//! database path as its only argument, and communicates by sending and
//! receiving json + `'\n'`. Main entry point is [`start`] which keeps the
//! given number of processes running, respawning the ones that die.
//!
//! Use of the call functionality happens through [`Handle::call`], or through
//! the [`ExecutionEngine`] implementation of [`Handle`].
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lantern_common::CallResultValue;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinSet;

use crate::engine::{EntryPointCall, ExecutionEngine};
use crate::error::EngineFailure;

mod de;
use de::{Status, Timings};

mod ser;
mod sub_process;

/// Delay before replacing an engine process which exited unexpectedly.
const RESPAWN_DELAY: Duration = Duration::from_secs(1);

/// Handle to the engine processes' work queue. Cloneable and shareable.
#[derive(Clone, Debug)]
pub struct Handle {
    command_tx: mpsc::Sender<(Command, tracing::Span)>,
}

impl Handle {
    /// Execute the given call on one of the engine processes.
    pub async fn call(&self, call: EntryPointCall) -> Result<Vec<CallResultValue>, EngineFailure> {
        use tracing::field::Empty;
        let (response, rx) = oneshot::channel();

        let continued_span = tracing::info_span!("engine_call", pid = Empty);

        self.command_tx
            .send((Command { call, response }, continued_span))
            .await
            .map_err(|_| shutdown())?;

        match rx.await {
            Ok(x) => x,
            Err(_closed) => Err(shutdown()),
        }
    }
}

#[async_trait::async_trait]
impl ExecutionEngine for Handle {
    async fn run(&self, call: EntryPointCall) -> Result<Vec<CallResultValue>, EngineFailure> {
        self.call(call).await
    }
}

fn shutdown() -> EngineFailure {
    EngineFailure::Internal(anyhow::anyhow!("Engine pool is shutting down"))
}

/// Alias for the "mpmc" queue.
type SharedReceiver<T> = Arc<Mutex<mpsc::Receiver<T>>>;

/// A call waiting for an engine process, together with where to send the
/// outcome.
#[derive(Debug)]
struct Command {
    call: EntryPointCall,
    response: oneshot::Sender<Result<Vec<CallResultValue>, EngineFailure>>,
}

impl Command {
    fn is_closed(&self) -> bool {
        self.response.is_closed()
    }

    fn fail(self, err: EngineFailure) {
        // The caller may have gone already, which is fine.
        let _ = self.response.send(Err(err));
    }

    async fn closed(&mut self) {
        self.response.closed().await
    }
}

/// Informational events from engine processes.
#[derive(Debug)]
enum SubProcessEvent {
    ProcessLaunched(u32),
    CommandHandled(u32, Timings, Status),
}

/// The reason [`sub_process::launch`] exited.
#[derive(Debug, PartialEq)]
enum SubprocessExitReason {
    UnrecoverableIO,
    Shutdown,
    Death,
    Cancellation,
}

/// Errors which can happen during an RPC alike round with the subprocess.
#[derive(Debug)]
enum SubprocessError {
    /// Input or output related issues; most likely a broken pipe due to child process dying.
    IO,
    /// The engine sent us invalid json
    InvalidJson(serde_json::Error),
    /// The engine sent us a response we couldn't understand
    InvalidResponse,
}

impl From<std::io::Error> for SubprocessError {
    fn from(_: std::io::Error) -> Self {
        SubprocessError::IO
    }
}

type LaunchResult = anyhow::Result<(u32, Option<std::process::ExitStatus>, SubprocessExitReason)>;

/// Everything needed to launch one more engine process.
struct Launcher {
    program: Arc<PathBuf>,
    database_path: Arc<PathBuf>,
    commands: SharedReceiver<(Command, tracing::Span)>,
    status_tx: mpsc::Sender<SubProcessEvent>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Launcher {
    fn spawn(&self, processes: &mut JoinSet<LaunchResult>) {
        processes.spawn(sub_process::launch(
            Arc::clone(&self.program),
            Arc::clone(&self.database_path),
            Arc::clone(&self.commands),
            self.status_tx.clone(),
            self.shutdown_tx.subscribe(),
        ));
    }
}

/// Starts `count` engine processes and a supervisor task which replaces the
/// ones that exit.
///
/// Returns once the first process has reported ready. Every process is shut
/// down when `stop_flag` completes or when all [Handle]s have been dropped.
pub async fn start(
    program: PathBuf,
    database_path: PathBuf,
    count: NonZeroUsize,
    stop_flag: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<(Handle, tokio::task::JoinHandle<()>)> {
    let (command_tx, command_rx) = mpsc::channel(1);
    let (status_tx, mut status_rx) = mpsc::channel(count.get());
    let (shutdown_tx, _) = broadcast::channel(1);

    let launcher = Launcher {
        program: Arc::new(program),
        database_path: Arc::new(database_path),
        commands: Arc::new(Mutex::new(command_rx)),
        status_tx,
        shutdown_tx,
    };

    let mut processes = JoinSet::new();
    for _ in 0..count.get() {
        launcher.spawn(&mut processes);
    }

    // Wait for the first process so that a broken engine is reported here.
    tokio::select! {
        Some(SubProcessEvent::ProcessLaunched(pid)) = status_rx.recv() => {
            tracing::info!(pid, processes=%count, "Execution engine started");
        }
        Some(joined) = processes.join_next() => {
            let _ = launcher.shutdown_tx.send(());
            return Err(match joined {
                Ok(Err(e)) => e,
                Ok(Ok((pid, status, reason))) => anyhow::anyhow!(
                    "Engine process {pid} exited during startup: {reason:?}, {status:?}"
                ),
                Err(e) => e.into(),
            });
        }
        else => anyhow::bail!("Engine processes exited during startup"),
    }

    let supervisor = tokio::spawn(async move {
        tokio::pin!(stop_flag);
        let mut stopping = false;

        loop {
            tokio::select! {
                _ = &mut stop_flag, if !stopping => {
                    tracing::info!("Shutting down execution engine");
                    stopping = true;
                    let _ = launcher.shutdown_tx.send(());
                }
                Some(event) = status_rx.recv() => match event {
                    SubProcessEvent::ProcessLaunched(pid) => {
                        tracing::debug!(pid, "Engine process launched");
                    }
                    SubProcessEvent::CommandHandled(pid, timings, status) => {
                        tracing::trace!(pid, ?timings, ?status, "Engine command handled");
                    }
                },
                joined = processes.join_next() => {
                    let respawn = match joined {
                        None => break,
                        Some(Ok(Ok((pid, exit_status, reason)))) => {
                            tracing::debug!(pid, ?exit_status, ?reason, "Engine process exited");
                            reason != SubprocessExitReason::Shutdown
                        }
                        Some(Ok(Err(error))) => {
                            tracing::error!(?error, "Engine process failed");
                            true
                        }
                        Some(Err(error)) => {
                            tracing::error!(%error, "Engine process task failed");
                            true
                        }
                    };

                    if respawn && !stopping {
                        tokio::time::sleep(RESPAWN_DELAY).await;
                        launcher.spawn(&mut processes);
                    }
                }
            }
        }
    });

    Ok((Handle { command_tx }, supervisor))
}
