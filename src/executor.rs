//! Component F: runs the AST produced by the parser — pipes, redirections,
//! process groups, and the terminal/job hand-off described in spec §4.F/§5.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::process::{Command, Stdio};

use os_pipe::{PipeReader, PipeWriter, pipe};

use crate::ast::{Cmd, CommandLine, JobDesc, JobKind, Redir, RedirKind, Root};
use crate::builtins;
use crate::error::{ExecError, report};
#[cfg(unix)]
use crate::job_control;
use crate::lexer;
use crate::parser;
use crate::shell_state::ShellState;
#[cfg(unix)]
use crate::signals;

/// Lexes, parses, then executes one input line. Lex/parse failures are
/// reported to stderr and otherwise consume the line.
pub fn run_line(shell: &mut ShellState, line: &str) {
    run_line_inner(shell, line, true);
}

/// `record_history` is false for the line a `!query` recall replays: that
/// line was already resolved out of history, not freshly typed, so running
/// it again must not duplicate (or re-add) an entry.
fn run_line_inner(shell: &mut ShellState, line: &str, record_history: bool) {
    let tokens = match lexer::lex(line) {
        Ok(tokens) => tokens,
        Err(e) => {
            report("jsh", format!("error: {e}"));
            return;
        }
    };

    let root = match parser::parse(&tokens) {
        Ok(root) => root,
        Err(e) => {
            report("jsh", e);
            return;
        }
    };

    execute_root(shell, root, line, record_history);
}

fn execute_root(shell: &mut ShellState, root: Root, line: &str, record_history: bool) {
    let Root::NonEmpty(cmd_line) = root else {
        return;
    };

    match cmd_line {
        CommandLine::Repeat(query) => {
            let Some(matched) = shell.recall(&query).map(|s| s.to_string()) else {
                report("jsh", "no such command in history");
                return;
            };
            println!("{matched}");
            run_line_inner(shell, &matched, false);
        }
        CommandLine::Jobs(jobs) => {
            if record_history {
                shell.push_history(line.to_string());
            }
            for job_desc in jobs {
                if shell.should_exit {
                    break;
                }
                run_job_desc(shell, &job_desc);
            }
        }
    }
}

fn run_job_desc(shell: &mut ShellState, job_desc: &JobDesc) {
    #[cfg(unix)]
    if let Err(e) = signals::block_sigchld() {
        report("jsh", format!("failed to block SIGCHLD: {e}"));
    }

    let result = run_pipeline(shell, &job_desc.job, job_desc.kind);

    #[cfg(unix)]
    if let Err(e) = signals::unblock_sigchld() {
        report("jsh", format!("failed to unblock SIGCHLD: {e}"));
    }

    if let Err(e) = result {
        report("jsh", e);
    }
}

// ── I/O handle abstraction shared by external spawns and in-process builtins ──

enum InputHandle {
    Inherit,
    Pipe(PipeReader),
    File(File),
}

enum OutputHandle {
    Inherit,
    Pipe(PipeWriter),
    File(File),
}

impl InputHandle {
    fn into_stdio(self) -> Stdio {
        match self {
            InputHandle::Inherit => Stdio::inherit(),
            InputHandle::Pipe(r) => Stdio::from(r),
            InputHandle::File(f) => Stdio::from(f),
        }
    }

    fn into_reader(self) -> Box<dyn Read> {
        match self {
            InputHandle::Inherit => Box::new(io::stdin()),
            InputHandle::Pipe(r) => Box::new(r),
            InputHandle::File(f) => Box::new(f),
        }
    }
}

impl OutputHandle {
    fn into_stdio(self) -> Stdio {
        match self {
            OutputHandle::Inherit => Stdio::inherit(),
            OutputHandle::Pipe(w) => Stdio::from(w),
            OutputHandle::File(f) => Stdio::from(f),
        }
    }

    fn into_writer(self, stderr: bool) -> Box<dyn Write> {
        match self {
            OutputHandle::Inherit if stderr => Box::new(io::stderr()),
            OutputHandle::Inherit => Box::new(io::stdout()),
            OutputHandle::Pipe(w) => Box::new(w),
            OutputHandle::File(f) => Box::new(f),
        }
    }
}

/// Applies explicit redirections over the pipe-derived defaults, in order;
/// the last redirection of a given kind wins (spec §9 open question).
fn apply_redirections(
    redirs: &[Redir],
    mut stdin: InputHandle,
    mut stdout: OutputHandle,
    mut stderr: OutputHandle,
) -> Result<(InputHandle, OutputHandle, OutputHandle), ExecError> {
    for redir in redirs {
        match redir.kind {
            RedirKind::Stdin => {
                let file = File::open(&redir.file)
                    .map_err(|e| ExecError::Message(format!("jsh: {}: {e}", redir.file)))?;
                stdin = InputHandle::File(file);
            }
            RedirKind::Stdout => {
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&redir.file)
                    .map_err(|e| ExecError::Message(format!("jsh: {}: {e}", redir.file)))?;
                stdout = OutputHandle::File(file);
            }
            RedirKind::Stderr => {
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&redir.file)
                    .map_err(|e| ExecError::Message(format!("jsh: {}: {e}", redir.file)))?;
                stderr = OutputHandle::File(file);
            }
        }
    }
    Ok((stdin, stdout, stderr))
}

fn run_pipeline(shell: &mut ShellState, job: &[Cmd], kind: JobKind) -> Result<(), ExecError> {
    let n = job.len();

    // Foreground single-command builtin: run in-process, no fork. Still
    // honors redirections (e.g. `pwd > /tmp/x`) the same way the general
    // pipeline loop below does.
    if n == 1 && kind == JobKind::Fg && builtins::is_builtin(&job[0].simple.argv[0]) {
        let (stdin, stdout, stderr) = apply_redirections(
            &job[0].redirections,
            InputHandle::Inherit,
            OutputHandle::Inherit,
            OutputHandle::Inherit,
        )?;
        return run_builtin(shell, &job[0], stdin, stdout, stderr);
    }

    let mut readers: Vec<Option<PipeReader>> = Vec::with_capacity(n.saturating_sub(1));
    let mut writers: Vec<Option<PipeWriter>> = Vec::with_capacity(n.saturating_sub(1));
    for _ in 0..n.saturating_sub(1) {
        let (r, w) = pipe()?;
        readers.push(Some(r));
        writers.push(Some(w));
    }

    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut pgid: Option<libc::pid_t> = None;
    let mut children: Vec<std::process::Child> = Vec::new();

    for (idx, cmd) in job.iter().enumerate() {
        let is_first = idx == 0;
        let is_last = idx + 1 == n;

        let stdin_default = if is_first {
            InputHandle::Inherit
        } else {
            InputHandle::Pipe(readers[idx - 1].take().unwrap())
        };
        let stdout_default = if is_last {
            OutputHandle::Inherit
        } else {
            OutputHandle::Pipe(writers[idx].take().unwrap())
        };

        let (stdin, stdout, stderr) = apply_redirections(
            &cmd.redirections,
            stdin_default,
            stdout_default,
            OutputHandle::Inherit,
        )?;

        if builtins::is_builtin(&cmd.simple.argv[0]) {
            run_builtin(shell, cmd, stdin, stdout, stderr)?;
            continue;
        }

        let mut process = Command::new(&cmd.simple.argv[0]);
        process.args(&cmd.simple.argv[1..]);
        process
            .stdin(stdin.into_stdio())
            .stdout(stdout.into_stdio())
            .stderr(stderr.into_stdio());

        #[cfg(unix)]
        {
            let target_pgid = pgid.unwrap_or(0);
            unsafe {
                use std::os::unix::process::CommandExt;
                process.pre_exec(move || {
                    signals::reset_child_signals()?;
                    signals::unblock_sigchld()?;
                    if libc::setpgid(0, target_pgid) != 0 {
                        return Err(io::Error::last_os_error());
                    }
                    Ok(())
                });
            }
        }

        let child = match process.spawn() {
            Ok(child) => child,
            Err(e) => {
                let code = command_error(&cmd.simple.argv[0], &e);
                reap_remaining(&mut children);
                if is_last {
                    shell.exit_code = code;
                }
                return Ok(());
            }
        };

        #[cfg(unix)]
        {
            let child_pid = child.id() as libc::pid_t;
            let target_pgid = pgid.unwrap_or(child_pid);
            let _ = job_control::set_process_group(child_pid, target_pgid);
            pgid = Some(target_pgid);
        }

        children.push(child);
    }

    if children.is_empty() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        let pgid = pgid.unwrap();
        let last_pid = children.last().map(|c| c.id() as libc::pid_t);
        let pids: std::collections::HashSet<libc::pid_t> =
            children.iter().map(|c| c.id() as libc::pid_t).collect();

        match kind {
            JobKind::Bg => {
                println!("[bg] {}", children.last().unwrap().id());
                // SIGCHLD's handler reaps these; the shell does not wait.
                Ok(())
            }
            JobKind::Fg => {
                let mut remaining = pids;
                let terminal_guard = match job_control::ForegroundTerminalGuard::new(pgid) {
                    Ok(guard) => Some(guard),
                    Err(e) => {
                        report("jsh", format!("failed to move terminal to job: {e}"));
                        None
                    }
                };

                let outcome = job_control::wait_for_process_group(pgid, &mut remaining, last_pid)?;
                drop(terminal_guard);
                match outcome {
                    job_control::WaitOutcome::Exited(code) => shell.exit_code = code,
                    job_control::WaitOutcome::Stopped => {
                        report("jsh", format!("[{pgid}] stopped"));
                        shell.exit_code = 128 + libc::SIGTSTP;
                    }
                }
                Ok(())
            }
        }
    }

    #[cfg(not(unix))]
    {
        let mut last_code = 0;
        for mut child in children {
            if let Ok(status) = child.wait() {
                last_code = crate::status::exit_code(status);
            }
        }
        shell.exit_code = last_code;
        Ok(())
    }
}

fn reap_remaining(children: &mut Vec<std::process::Child>) {
    for mut child in children.drain(..) {
        let _ = child.wait();
    }
}

fn command_error(program: &str, e: &io::Error) -> i32 {
    if e.kind() == io::ErrorKind::NotFound {
        eprintln!("{program}: command not found");
        127
    } else {
        eprintln!("jsh: {program}: {e}");
        126
    }
}

/// Runs a builtin in-process, routing its I/O through the resolved handles.
/// Used both for the common single-command foreground case and for a
/// builtin that happens to sit mid-pipeline.
fn run_builtin(
    shell: &mut ShellState,
    cmd: &Cmd,
    stdin: InputHandle,
    stdout: OutputHandle,
    stderr: OutputHandle,
) -> Result<(), ExecError> {
    let _stdin_reader = stdin.into_reader(); // builtins take no stdin today
    let mut stdout_writer = stdout.into_writer(false);
    let mut stderr_writer = stderr.into_writer(true);

    let action = builtins::execute(
        &cmd.simple.argv[0],
        &cmd.simple.argv[1..],
        stdout_writer.as_mut(),
        stderr_writer.as_mut(),
        shell,
    );
    let _ = stdout_writer.flush();
    let _ = stderr_writer.flush();

    match action {
        builtins::BuiltinAction::Continue(code) => shell.exit_code = code,
        builtins::BuiltinAction::Exit(code) => {
            shell.should_exit = true;
            shell.exit_code = code;
        }
    }

    Ok(())
}
