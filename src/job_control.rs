//! Low-level process-group and terminal hand-off primitives used by the
//! executor (component F) to implement spec §4.F step 4 and §5's terminal
//! hand-off discipline. No job-control builtins (`jobs`/`fg`/`bg`) consume
//! these — they exist purely to let a foreground pipeline own the terminal
//! while it runs, and hand it back to the shell afterward.

#[cfg(unix)]
use std::io;

#[cfg(unix)]
pub(crate) fn set_process_group(pid: libc::pid_t, pgid: libc::pid_t) -> io::Result<()> {
    loop {
        let rc = unsafe { libc::setpgid(pid, pgid) };
        if rc == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(code) if code == libc::EINTR => continue,
            // Already exec'd or gone; caller can proceed with best-effort behavior.
            Some(code) if code == libc::EACCES || code == libc::ESRCH => return Ok(()),
            _ => return Err(err),
        }
    }
}

#[cfg(unix)]
pub(crate) struct ForegroundTerminalGuard {
    tty_fd: Option<libc::c_int>,
    shell_pgid: libc::pid_t,
}

#[cfg(unix)]
impl ForegroundTerminalGuard {
    pub(crate) fn new(target_pgid: libc::pid_t) -> io::Result<Self> {
        let tty_fd = if unsafe { libc::isatty(libc::STDIN_FILENO) } == 1 {
            Some(libc::STDIN_FILENO)
        } else {
            None
        };

        let shell_pgid = unsafe { libc::getpgrp() };
        let guard = Self { tty_fd, shell_pgid };

        if let Some(fd) = guard.tty_fd {
            set_terminal_foreground(fd, target_pgid)?;
        }

        Ok(guard)
    }
}

#[cfg(unix)]
impl Drop for ForegroundTerminalGuard {
    fn drop(&mut self) {
        if let Some(fd) = self.tty_fd {
            let _ = set_terminal_foreground(fd, self.shell_pgid);
        }
    }
}

/// Outcome of waiting on a foreground process group.
#[cfg(unix)]
pub(crate) enum WaitOutcome {
    Exited(i32),
    /// One member of the group was stopped (`SIGTSTP`/Ctrl-Z) rather than
    /// exited. There is no job table to park it in, so the caller reports
    /// the stop and moves on; the stopped process is left in its process
    /// group, off the terminal, until it exits or is killed some other way.
    Stopped,
}

/// Blocking wait for every pid in a process group to exit, or for any one
/// of them to stop. Any pid not in `remaining` (e.g. a grandchild
/// reparented into the group) is ignored.
///
/// Uses `WUNTRACED` so a `SIGTSTP` delivered to the group (children reset it
/// to `SIG_DFL` before `exec`, see `signals::reset_child_signals`) makes this
/// `waitpid` return instead of blocking forever — without it the shell would
/// deadlock on a merely-stopped child with nothing left to read more input.
#[cfg(unix)]
pub(crate) fn wait_for_process_group(
    pgid: libc::pid_t,
    remaining: &mut std::collections::HashSet<libc::pid_t>,
    last_pid: Option<libc::pid_t>,
) -> io::Result<WaitOutcome> {
    let mut last_exit_code = 0;

    while !remaining.is_empty() {
        let mut raw_status: libc::c_int = 0;
        let waited = unsafe { libc::waitpid(-pgid, &mut raw_status, libc::WUNTRACED) };

        if waited < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(err);
        }

        if !remaining.contains(&waited) {
            continue;
        }

        if libc::WIFSTOPPED(raw_status) {
            return Ok(WaitOutcome::Stopped);
        }
        remaining.remove(&waited);

        if let Some(code) = crate::status::exit_code_from_wait_status(raw_status)
            && Some(waited) == last_pid
        {
            last_exit_code = code;
        }
    }

    Ok(WaitOutcome::Exited(last_exit_code))
}

#[cfg(unix)]
struct SignalIgnoreGuard {
    signal: libc::c_int,
    previous: libc::sighandler_t,
}

#[cfg(unix)]
impl SignalIgnoreGuard {
    fn ignore(signal: libc::c_int) -> io::Result<Self> {
        let previous = unsafe { libc::signal(signal, libc::SIG_IGN) };
        if previous == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { signal, previous })
    }
}

#[cfg(unix)]
impl Drop for SignalIgnoreGuard {
    fn drop(&mut self) {
        unsafe {
            libc::signal(self.signal, self.previous);
        }
    }
}

#[cfg(unix)]
fn set_terminal_foreground(fd: libc::c_int, pgid: libc::pid_t) -> io::Result<()> {
    if pgid <= 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid process group id",
        ));
    }

    // SIGTTOU is sent to a background process that calls tcsetpgrp; the shell
    // itself is about to become background relative to `pgid`, so ignore it
    // for the duration of the call.
    let _sigttou = SignalIgnoreGuard::ignore(libc::SIGTTOU)?;
    loop {
        let rc = unsafe { libc::tcsetpgrp(fd, pgid) };
        if rc == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(err);
    }
}
