//! Component G: process-wide signal disposition.
//!
//! Installed once at shell startup. `SIGCHLD`'s handler reaps every
//! currently-terminated background child so none become zombies; `SIGINT`,
//! `SIGQUIT`, and `SIGTSTP` are ignored by the shell itself (children reset
//! them to default before `exec`, since `SIG_IGN` survives `exec`).

#[cfg(unix)]
use std::io;

#[cfg(unix)]
extern "C" fn reap_children(_signum: libc::c_int) {
    loop {
        let mut status: libc::c_int = 0;
        let pid = unsafe { libc::waitpid(-1, &mut status, libc::WNOHANG) };
        if pid <= 0 {
            break;
        }
    }
}

#[cfg(unix)]
fn install(signal: libc::c_int, handler: libc::sighandler_t, flags: libc::c_int) -> io::Result<()> {
    let action = libc::sigaction {
        sa_sigaction: handler,
        sa_mask: unsafe { std::mem::zeroed() },
        sa_flags: flags,
        #[cfg(target_os = "linux")]
        sa_restorer: None,
    };
    let rc = unsafe { libc::sigaction(signal, &action, std::ptr::null_mut()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Installs the shell's process-wide signal dispositions. Call once at
/// startup, before the first prompt is read.
#[cfg(unix)]
pub fn install_shell_signals() -> io::Result<()> {
    // No SA_NOCLDSTOP: some implementations only keep a child's stopped
    // status available to waitpid(WUNTRACED) when stop notifications
    // aren't suppressed at the sigaction level, and
    // job_control::wait_for_process_group relies on WUNTRACED to detect a
    // SIGTSTP'd foreground job instead of blocking forever.
    install(
        libc::SIGCHLD,
        reap_children as *const () as usize,
        libc::SA_RESTART,
    )?;

    for &sig in &[libc::SIGINT, libc::SIGQUIT, libc::SIGTSTP] {
        unsafe {
            if libc::signal(sig, libc::SIG_IGN) == libc::SIG_ERR {
                return Err(io::Error::last_os_error());
            }
        }
    }

    Ok(())
}

#[cfg(not(unix))]
pub fn install_shell_signals() -> std::io::Result<()> {
    Ok(())
}

/// Resets the four signals the shell ignores back to their default
/// disposition in a freshly forked child, before `exec`.
#[cfg(unix)]
pub fn reset_child_signals() -> io::Result<()> {
    for &sig in &[libc::SIGINT, libc::SIGQUIT, libc::SIGTSTP, libc::SIGPIPE] {
        unsafe {
            if libc::signal(sig, libc::SIG_DFL) == libc::SIG_ERR {
                return Err(io::Error::last_os_error());
            }
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn reset_child_signals() -> std::io::Result<()> {
    Ok(())
}

/// Blocks `SIGCHLD` for the calling thread so an explicit foreground
/// `waitid` cannot race with the asynchronous reaper.
#[cfg(unix)]
pub fn block_sigchld() -> io::Result<()> {
    let mut set: libc::sigset_t = unsafe { std::mem::zeroed() };
    unsafe {
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, libc::SIGCHLD);
        if libc::pthread_sigmask(libc::SIG_BLOCK, &set, std::ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(unix)]
pub fn unblock_sigchld() -> io::Result<()> {
    let mut set: libc::sigset_t = unsafe { std::mem::zeroed() };
    unsafe {
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, libc::SIGCHLD);
        if libc::pthread_sigmask(libc::SIG_UNBLOCK, &set, std::ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn block_sigchld() -> std::io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
pub fn unblock_sigchld() -> std::io::Result<()> {
    Ok(())
}
