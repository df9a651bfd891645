use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

const DEFAULT_PROMPT: &str = "%";

/// Component A: process-wide state threaded through the editor and executor.
pub struct ShellState {
    pub prompt: String,
    history: Vec<String>,
    history_path: Option<PathBuf>,
    pub should_exit: bool,
    pub exit_code: i32,
}

impl ShellState {
    pub fn new() -> Self {
        let history_path = history_file_path();
        let history = history_path.as_deref().map(load_history).unwrap_or_default();
        ShellState {
            prompt: DEFAULT_PROMPT.to_string(),
            history,
            history_path,
            should_exit: false,
            exit_code: 0,
        }
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn history_count(&self) -> usize {
        self.history.len()
    }

    /// Appends to the in-memory history and to `~/.jsh_history` on disk.
    /// Blank lines never reach here (callers filter at the parse boundary).
    pub fn push_history(&mut self, line: String) {
        if let Some(ref path) = self.history_path {
            append_to_history_file(path, &line);
        }
        self.history.push(line);
    }

    /// Resolves a `!query` history-recall argument: a 1-based decimal index
    /// if `query` parses completely as one, else the most recent entry whose
    /// text starts with `query`.
    pub fn recall(&self, query: &str) -> Option<&str> {
        if let Ok(index) = query.parse::<usize>() {
            if index >= 1 && index <= self.history.len() {
                return Some(self.history[index - 1].as_str());
            }
            return None;
        }

        self.history
            .iter()
            .rev()
            .find(|line| line.starts_with(query))
            .map(|line| line.as_str())
    }
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new()
    }
}

fn history_file_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .map(|home| PathBuf::from(home).join(".jsh_history"))
}

fn load_history(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn append_to_history_file(path: &std::path::Path, line: &str) {
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(f, "{line}");
    }
}

#[cfg(test)]
impl ShellState {
    /// Builds state with history persistence disabled, so unit tests across
    /// the crate never touch the real `~/.jsh_history`.
    pub fn new_without_persistence() -> Self {
        let mut state = Self::new();
        state.history.clear();
        state.history_path = None;
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recall_by_index_is_one_based() {
        let mut state = ShellState::new_without_persistence();
        state.push_history("echo one".to_string());
        state.push_history("echo two".to_string());
        assert_eq!(state.recall("1"), Some("echo one"));
        assert_eq!(state.recall("2"), Some("echo two"));
        assert_eq!(state.recall("3"), None);
        assert_eq!(state.recall("0"), None);
    }

    #[test]
    fn recall_by_prefix_finds_most_recent() {
        let mut state = ShellState::new_without_persistence();
        state.push_history("echo old".to_string());
        state.push_history("echo new".to_string());
        assert_eq!(state.recall("ec"), Some("echo new"));
        assert_eq!(state.recall("nope"), None);
    }
}
