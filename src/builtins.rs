//! Component F's built-in dispatch. Exactly the five builtins spec'd in
//! §6: `exit`, `history`, `prompt`, `pwd`, `cd`. Argument-count and
//! range-checking for `exit` are grounded on `original_source/src/builtins.c`.

use std::fmt;
use std::io::Write;

use crate::shell_state::ShellState;

/// `exit`'s distinct failure modes, grounded on `original_source/src/builtins.c`.
#[derive(Debug, PartialEq, Eq)]
pub enum ExitError {
    TooManyArgs,
    NonInteger(String),
    OutOfRange(String),
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitError::TooManyArgs => write!(f, "exit: too many arguments"),
            ExitError::NonInteger(arg) => write!(f, "exit: {arg}: numeric argument required"),
            ExitError::OutOfRange(arg) => write!(f, "exit: {arg}: exit code out of range"),
        }
    }
}

const BUILTINS: &[&str] = &["exit", "history", "prompt", "pwd", "cd"];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

pub enum BuiltinAction {
    Continue(i32),
    Exit(i32),
}

pub fn execute(
    program: &str,
    args: &[String],
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
    shell: &mut ShellState,
) -> BuiltinAction {
    match program {
        "exit" => run_exit(args, stderr),
        "history" => BuiltinAction::Continue(run_history(args, stdout, stderr, shell)),
        "prompt" => BuiltinAction::Continue(run_prompt(args, stderr, shell)),
        "pwd" => BuiltinAction::Continue(run_pwd(args, stdout, stderr)),
        "cd" => BuiltinAction::Continue(run_cd(args, stdout, stderr)),
        _ => {
            let _ = writeln!(stderr, "jsh: unknown builtin: {program}");
            BuiltinAction::Continue(1)
        }
    }
}

/// `exit [N]` — sets the shell's exit flag/code. Fails (without exiting) if
/// more than one argument is given, the argument isn't an integer, or the
/// integer is out of `i32` range.
fn run_exit(args: &[String], stderr: &mut dyn Write) -> BuiltinAction {
    match parse_exit_args(args) {
        Ok(code) => BuiltinAction::Exit(code),
        Err(e) => {
            let _ = writeln!(stderr, "{e}");
            BuiltinAction::Continue(1)
        }
    }
}

fn parse_exit_args(args: &[String]) -> Result<i32, ExitError> {
    if args.len() > 1 {
        return Err(ExitError::TooManyArgs);
    }

    let Some(arg) = args.first() else {
        return Ok(0);
    };

    match arg.trim().parse::<i64>() {
        Ok(code) if code >= i32::MIN as i64 && code <= i32::MAX as i64 => Ok(code as i32),
        Ok(_) => Err(ExitError::OutOfRange(arg.clone())),
        Err(_) => Err(ExitError::NonInteger(arg.clone())),
    }
}

/// `history` — prints every history entry, 1-based, in insertion order.
fn run_history(
    args: &[String],
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
    shell: &ShellState,
) -> i32 {
    if !args.is_empty() {
        let _ = writeln!(stderr, "history: too many arguments");
        return 1;
    }

    for (idx, line) in shell.history().iter().enumerate() {
        let _ = writeln!(stdout, "{}  {}", idx + 1, line);
    }
    0
}

/// `prompt <text>` — replaces the prompt string wholesale.
fn run_prompt(args: &[String], stderr: &mut dyn Write, shell: &mut ShellState) -> i32 {
    if args.len() != 1 {
        let _ = writeln!(stderr, "prompt: usage: prompt <text>");
        return 1;
    }
    shell.prompt = args[0].clone();
    0
}

/// `pwd` — prints the current working directory.
fn run_pwd(args: &[String], stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
    if !args.is_empty() {
        let _ = writeln!(stderr, "pwd: too many arguments");
        return 1;
    }
    match std::env::current_dir() {
        Ok(path) => {
            let _ = writeln!(stdout, "{}", path.display());
            0
        }
        Err(e) => {
            let _ = writeln!(stderr, "pwd: {e}");
            1
        }
    }
}

/// `cd [dir|-]` — changes directory. No argument goes to `$HOME`; `-` goes
/// to `$OLDPWD` and echoes the new directory. Updates `OLDPWD`/`PWD`.
fn run_cd(args: &[String], stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
    if args.len() > 1 {
        let _ = writeln!(stderr, "cd: too many arguments");
        return 1;
    }

    let echo_target;
    let target = match args.first() {
        Some(dir) if dir == "-" => {
            echo_target = true;
            match std::env::var("OLDPWD") {
                Ok(prev) => prev,
                Err(_) => {
                    let _ = writeln!(stderr, "cd: OLDPWD not set");
                    return 1;
                }
            }
        }
        Some(dir) => {
            echo_target = false;
            dir.clone()
        }
        None => {
            echo_target = false;
            match std::env::var("HOME") {
                Ok(home) => home,
                Err(_) => {
                    let _ = writeln!(stderr, "cd: HOME not set");
                    return 1;
                }
            }
        }
    };

    let old_cwd = std::env::current_dir().ok();

    if let Err(e) = std::env::set_current_dir(&target) {
        let _ = writeln!(stderr, "cd: {target}: {e}");
        return 1;
    }

    // SAFETY: env var mutation happens only on the shell's single thread.
    if let Some(old_cwd) = old_cwd {
        unsafe { std::env::set_var("OLDPWD", old_cwd) };
    }
    if let Ok(new_cwd) = std::env::current_dir() {
        unsafe { std::env::set_var("PWD", &new_cwd) };
        if echo_target {
            let _ = writeln!(stdout, "{}", new_cwd.display());
        }
    }

    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(program: &str, args: &[&str], shell: &mut ShellState) -> (BuiltinAction, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let action = execute(program, &args, &mut out, &mut err, shell);
        (
            action,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn exit_defaults_to_zero() {
        let mut shell = ShellState::new_without_persistence();
        let (action, _, _) = run("exit", &[], &mut shell);
        assert!(matches!(action, BuiltinAction::Exit(0)));
    }

    #[test]
    fn exit_parses_code() {
        let mut shell = ShellState::new_without_persistence();
        let (action, _, _) = run("exit", &["42"], &mut shell);
        assert!(matches!(action, BuiltinAction::Exit(42)));
    }

    #[test]
    fn exit_rejects_non_integer() {
        let mut shell = ShellState::new_without_persistence();
        let (action, _, err) = run("exit", &["nope"], &mut shell);
        assert!(matches!(action, BuiltinAction::Continue(1)));
        assert!(err.contains("numeric argument required"));
    }

    #[test]
    fn exit_rejects_too_many_args() {
        let mut shell = ShellState::new_without_persistence();
        let (action, _, err) = run("exit", &["1", "2"], &mut shell);
        assert!(matches!(action, BuiltinAction::Continue(1)));
        assert!(err.contains("too many arguments"));
    }

    #[test]
    fn exit_rejects_out_of_range() {
        let mut shell = ShellState::new_without_persistence();
        let (action, _, err) = run("exit", &["99999999999"], &mut shell);
        assert!(matches!(action, BuiltinAction::Continue(1)));
        assert!(err.contains("out of range"));
    }

    #[test]
    fn history_prints_one_based() {
        let mut shell = ShellState::new_without_persistence();
        shell.push_history("echo a".to_string());
        shell.push_history("echo b".to_string());
        let (_, out, _) = run("history", &[], &mut shell);
        assert_eq!(out, "1  echo a\n2  echo b\n");
    }

    #[test]
    fn prompt_replaces_prompt_string() {
        let mut shell = ShellState::new_without_persistence();
        run("prompt", &["$ "], &mut shell);
        assert_eq!(shell.prompt, "$ ");
    }
}
