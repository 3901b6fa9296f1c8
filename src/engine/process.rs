use std::{io, process::Stdio, time::Duration};

use tokio::{
    io::AsyncReadExt,
    process::{Child, Command},
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};

/// How long the output drains may keep reading after the child is gone.
/// Descendants that inherited the pipes can hold them open past the kill;
/// the drains stop at this bound and return what they have.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Outcome of a bounded child process invocation. `status` is `None` when
/// the deadline elapsed and the process group was killed.
pub(super) struct BoundedOutput {
    pub status: Option<std::process::ExitStatus>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
}

impl BoundedOutput {
    pub fn success(&self) -> bool {
        self.status.is_some_and(|status| status.success())
    }
}

/// Spawns `cmd` as the leader of its own process group with stdin closed
/// and both output pipes captured. If `deadline` elapses before the child
/// exits, the whole group is killed so nothing the child spawned survives
/// the call. Output written before the kill is still returned, and
/// dropping the returned future mid-flight kills the group too.
pub(super) async fn run_bounded(
    mut cmd: Command,
    deadline: Duration,
) -> io::Result<BoundedOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn()?;
    let mut group = GroupKill::arm(&child);
    let (stdout_stop, stdout_stop_rx) = oneshot::channel();
    let (stderr_stop, stderr_stop_rx) = oneshot::channel();
    let stdout_task = tokio::spawn(drain(child.stdout.take(), stdout_stop_rx));
    let stderr_task = tokio::spawn(drain(child.stderr.take(), stderr_stop_rx));

    let (status, timed_out) = match timeout(deadline, child.wait()).await {
        Ok(Ok(status)) => {
            group.disarm();
            (Some(status), false)
        }
        Ok(Err(err)) => {
            group.fire();
            let _ = child.kill().await;
            return Err(err);
        }
        Err(_) => {
            group.fire();
            let _ = child.kill().await;
            (None, true)
        }
    };

    let stdout = finish_drain(stdout_task, stdout_stop).await;
    let stderr = finish_drain(stderr_task, stderr_stop).await;

    Ok(BoundedOutput {
        status,
        stdout,
        stderr,
        timed_out,
    })
}

/// Sends SIGKILL to the child's whole process group, so descendants that
/// inherited the output pipes die with the child. Fired on deadline expiry
/// and when the run future is dropped mid-flight. A clean exit disarms it,
/// since a reaped pid may be reused.
struct GroupKill {
    pgid: Option<u32>,
}

impl GroupKill {
    fn arm(child: &Child) -> Self {
        Self { pgid: child.id() }
    }

    fn fire(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for GroupKill {
    fn drop(&mut self) {
        self.fire();
    }
}

fn kill_process_group(pgid: u32) {
    #[cfg(unix)]
    let _ = unsafe { libc::kill(-(pgid as i32), libc::SIGKILL) };
    #[cfg(not(unix))]
    let _ = pgid;
}

/// Waits for a drain task, giving it at most `DRAIN_GRACE` once the child
/// is gone; past that the task is told to stop and hands back whatever it
/// has captured so far.
async fn finish_drain(mut task: JoinHandle<Vec<u8>>, stop: oneshot::Sender<()>) -> Vec<u8> {
    match timeout(DRAIN_GRACE, &mut task).await {
        Ok(captured) => captured.unwrap_or_default(),
        Err(_) => {
            let _ = stop.send(());
            task.await.unwrap_or_default()
        }
    }
}

async fn drain<R>(pipe: Option<R>, mut stop: oneshot::Receiver<()>) -> Vec<u8>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let Some(mut pipe) = pipe else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        tokio::select! {
            read = pipe.read(&mut chunk) => match read {
                Ok(0) | Err(_) => break,
                Ok(n) => out.extend_from_slice(&chunk[..n]),
            },
            _ = &mut stop => break,
        }
    }
    out
}
