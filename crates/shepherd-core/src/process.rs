use std::{io, process::Stdio};

use libc::{killpg, setsid};
use tokio::process::{Child, Command};

/// OS process id. Children call `setsid` at spawn, so a child's pid doubles
/// as its process-group id.
pub type Pid = libc::pid_t;

const SHELL: &str = "sh";

/// Spawn `sh -c <cmd>` as the leader of a fresh process group.
///
/// Group containment is what lets a single `killpg` take down the whole
/// shell pipeline a service may have forked. Child stdio goes to /dev/null;
/// the supervisor emits only its own status lines.
pub(crate) fn spawn_in_group(cmd: &str) -> io::Result<(Child, Pid)> {
    let mut command = Command::new(SHELL);
    command
        .arg("-c")
        .arg(cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    #[allow(unsafe_code)]
    unsafe {
        command.pre_exec(|| {
            if setsid() == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = command.spawn()?;
    let pid = child
        .id()
        .ok_or_else(|| io::Error::other("spawned process has no pid"))?;
    let pid = Pid::try_from(pid).map_err(|_| io::Error::other("pid out of range"))?;

    Ok((child, pid))
}

/// Run a health command under the shell and report its exit status.
pub(crate) async fn run_check(cmd: &str) -> io::Result<std::process::ExitStatus> {
    Command::new(SHELL)
        .arg("-c")
        .arg(cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
}

/// Send `signal` to the whole process group led by `pgid`.
pub(crate) fn signal_group(pgid: Pid, signal: libc::c_int) -> io::Result<()> {
    #[allow(unsafe_code)]
    let rc = unsafe { killpg(pgid, signal) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
