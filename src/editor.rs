//! Component B: a raw-mode line editor with history navigation.
//!
//! Operates directly on `libc` termios and raw bytes (spec §4.B is defined
//! at that level), rather than through a terminal-event abstraction —
//! grounded on `original_source/src/input.c`'s raw-mode + per-byte read
//! loop, extended with the distilled spec's cursor/line-wrap tracking via
//! Device-Status-Report round-trips.

use std::io::{self, Read, Write};

use crate::shell_state::ShellState;

#[cfg(unix)]
struct RawModeGuard {
    orig: libc::termios,
}

#[cfg(unix)]
impl RawModeGuard {
    fn enter() -> io::Result<Self> {
        unsafe {
            let mut orig: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(libc::STDIN_FILENO, &mut orig) != 0 {
                return Err(io::Error::last_os_error());
            }
            let mut raw = orig;
            raw.c_lflag &= !(libc::ECHO | libc::ICANON);
            if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(RawModeGuard { orig })
        }
    }
}

#[cfg(unix)]
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        unsafe {
            libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &self.orig);
        }
    }
}

#[cfg(unix)]
fn terminal_width() -> Option<usize> {
    unsafe {
        let mut ws: libc::winsize = std::mem::zeroed();
        if libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) == 0 && ws.ws_col > 0 {
            Some(ws.ws_col as usize)
        } else {
            None
        }
    }
}

#[cfg(unix)]
fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) == 1 }
}

#[cfg(not(unix))]
fn is_tty() -> bool {
    false
}

enum KeyAction {
    Continue,
    Submit(String),
}

pub struct LineEditor {
    buffer: Vec<char>,
    cursor: usize,
    history_idx: usize,
    saved_buffer: String,
    col: usize,
    width: usize,
}

impl LineEditor {
    pub fn new() -> Self {
        LineEditor {
            buffer: Vec::new(),
            cursor: 0,
            history_idx: 0,
            saved_buffer: String::new(),
            col: 0,
            width: 80,
        }
    }

    /// Reads one edited line. Returns `Ok(None)` on EOF (no trailing
    /// newline ever seen).
    pub fn read_line(&mut self, shell: &ShellState, prompt: &str) -> io::Result<Option<String>> {
        if !is_tty() {
            return self.read_line_fallback(prompt);
        }

        #[cfg(unix)]
        {
            self.reset_state(shell);
            print!("{prompt}");
            io::stdout().flush()?;
            self.col = prompt.chars().count();
            self.width = terminal_width().unwrap_or(80);

            let _guard = RawModeGuard::enter()?;
            let mut stdin = io::stdin();

            loop {
                let mut byte = [0u8; 1];
                match stdin.read_exact(&mut byte) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                        return Ok(None);
                    }
                    Err(e) => return Err(e),
                }

                match self.handle_byte(byte[0], shell, &mut stdin)? {
                    KeyAction::Submit(line) => return Ok(Some(line)),
                    KeyAction::Continue => {}
                }
            }
        }

        #[cfg(not(unix))]
        {
            self.read_line_fallback(prompt)
        }
    }

    fn reset_state(&mut self, shell: &ShellState) {
        self.buffer.clear();
        self.cursor = 0;
        self.history_idx = shell.history_count();
        self.saved_buffer.clear();
    }

    fn read_line_fallback(&mut self, prompt: &str) -> io::Result<Option<String>> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        let n = io::stdin().read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    #[cfg(unix)]
    fn handle_byte(
        &mut self,
        byte: u8,
        shell: &ShellState,
        stdin: &mut io::Stdin,
    ) -> io::Result<KeyAction> {
        match byte {
            b'\n' => {
                println!();
                let line: String = self.buffer.iter().collect();
                return Ok(KeyAction::Submit(line));
            }
            0x7f | 0x08 => self.backspace(),
            0x1b => self.handle_escape(shell, stdin)?,
            0x00..=0x1f => {} // other control bytes ignored
            _ => {
                if let Ok(s) = std::str::from_utf8(&[byte])
                    && let Some(c) = s.chars().next()
                {
                    self.insert_char(c);
                }
            }
        }
        Ok(KeyAction::Continue)
    }

    /// Requests a Cursor Position Report (`ESC[6n`) from the terminal. The
    /// reply arrives as `ESC[row;colR` through the ordinary read loop and is
    /// consumed by `dispatch_csi`'s `'R'` arm, resynchronizing `self.col`
    /// against the terminal's own idea of the cursor after a visible change.
    #[cfg(unix)]
    fn request_cursor_position(&self) {
        print!("\x1b[6n");
        let _ = io::stdout().flush();
    }

    #[cfg(unix)]
    fn insert_char(&mut self, c: char) {
        self.buffer.push(c);
        self.cursor += 1;
        print!("{c}");
        let _ = io::stdout().flush();
        self.col += 1;
        if self.col >= self.width {
            println!();
            self.col = 0;
        }
        self.request_cursor_position();
    }

    #[cfg(unix)]
    fn backspace(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        self.buffer.pop();
        self.cursor -= 1;

        if self.col == 0 {
            // Wrapped onto the previous row: move up, then to the far right
            // (terminals clamp cursor-forward at the last column).
            print!("\x1b[A\x1b[999C");
            self.col = self.width.saturating_sub(1);
        } else {
            print!("\x08 \x08");
            self.col -= 1;
        }
        let _ = io::stdout().flush();
        self.request_cursor_position();
    }

    #[cfg(unix)]
    fn handle_escape(&mut self, shell: &ShellState, stdin: &mut io::Stdin) -> io::Result<()> {
        let mut introducer = [0u8; 1];
        if stdin.read_exact(&mut introducer).is_err() {
            return Ok(());
        }
        if introducer[0] != b'[' {
            return Ok(());
        }

        let mut params = String::new();
        loop {
            let mut b = [0u8; 1];
            if stdin.read_exact(&mut b).is_err() {
                return Ok(());
            }
            let c = b[0] as char;
            if c.is_ascii_alphabetic() {
                self.dispatch_csi(c, &params, shell);
                return Ok(());
            }
            params.push(c);
        }
    }

    #[cfg(unix)]
    fn dispatch_csi(&mut self, terminator: char, params: &str, shell: &ShellState) {
        match terminator {
            'A' => self.history_prev(shell),
            'B' => self.history_next(shell),
            'R' => {
                // Cursor Position Report: "row;col". Resynchronize our
                // tracked column (1-based) against the terminal's own idea
                // of where the cursor is.
                if let Some((_, col)) = params.split_once(';')
                    && let Ok(col) = col.parse::<usize>()
                {
                    self.col = col.saturating_sub(1);
                }
            }
            _ => {}
        }
    }

    #[cfg(unix)]
    fn history_prev(&mut self, shell: &ShellState) {
        if self.history_idx == 0 {
            return;
        }
        if self.history_idx == shell.history_count() {
            self.saved_buffer = self.buffer.iter().collect();
        }
        self.history_idx -= 1;
        let text = shell.history()[self.history_idx].clone();
        self.replace_buffer(&text);
    }

    #[cfg(unix)]
    fn history_next(&mut self, shell: &ShellState) {
        if self.history_idx >= shell.history_count() {
            return;
        }
        self.history_idx += 1;
        if self.history_idx == shell.history_count() {
            let text = self.saved_buffer.clone();
            self.replace_buffer(&text);
        } else {
            let text = shell.history()[self.history_idx].clone();
            self.replace_buffer(&text);
        }
    }

    #[cfg(unix)]
    fn replace_buffer(&mut self, text: &str) {
        while !self.buffer.is_empty() {
            self.backspace();
        }
        for c in text.chars() {
            self.insert_char(c);
        }
    }
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_state_starts_at_live_history_index() {
        let mut shell = ShellState::new_without_persistence();
        shell.push_history("a".to_string());
        shell.push_history("b".to_string());
        let mut editor = LineEditor::new();
        editor.reset_state(&shell);
        assert_eq!(editor.history_idx, 2);
        assert!(editor.buffer.is_empty());
    }

    #[test]
    fn new_editor_has_empty_buffer() {
        let editor = LineEditor::new();
        assert_eq!(editor.cursor, 0);
        assert!(editor.buffer.is_empty());
    }
}
