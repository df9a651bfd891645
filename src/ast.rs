//! Component E's data types: the parsed shape of a command line.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Root {
    Empty,
    NonEmpty(CommandLine),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    Repeat(String),
    Jobs(Vec<JobDesc>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Fg,
    Bg,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDesc {
    pub kind: JobKind,
    pub job: Job,
}

/// A pipeline of one or more commands. Always non-empty.
pub type Job = Vec<Cmd>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    pub simple: SimpleCmd,
    pub redirections: Vec<Redir>,
}

/// Always has at least one argument (argv[0]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleCmd {
    pub argv: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirKind {
    Stdin,
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redir {
    pub kind: RedirKind,
    pub file: String,
}
