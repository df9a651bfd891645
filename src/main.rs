mod ast;
mod builtins;
mod editor;
mod error;
mod executor;
mod job_control;
mod lexer;
mod parser;
mod raw_lexer;
mod shell_state;
#[cfg(unix)]
mod signals;
mod status;

use editor::LineEditor;
use shell_state::ShellState;

fn main() {
    #[cfg(unix)]
    if let Err(e) = signals::install_shell_signals() {
        error::report("jsh", format!("failed to install signal handlers: {e}"));
    }

    let mut shell = ShellState::new();
    let mut editor = LineEditor::new();

    loop {
        match editor.read_line(&shell, &shell.prompt.clone()) {
            Ok(Some(line)) => {
                executor::run_line(&mut shell, &line);
                if shell.should_exit {
                    break;
                }
            }
            Ok(None) => {
                println!();
                break;
            }
            Err(e) => {
                error::report("jsh", e);
                break;
            }
        }
    }

    std::process::exit(shell.exit_code);
}
