use std::fmt;

/// Failure producing a single logical token from the refining lexer.
#[derive(Debug, PartialEq, Eq)]
pub enum LexError {
    UnterminatedQuote,
    GlobError(String),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnterminatedQuote => write!(f, "unterminated quote"),
            LexError::GlobError(msg) => write!(f, "glob error: {msg}"),
        }
    }
}

/// Failure producing an AST from a logical token stream.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    UnexpectedTokens,
    CommandLineFail,
    JobFail,
    CommandFail,
    SimpleCommandFail,
    UnexpectedEnd,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ParseError::UnexpectedTokens => "unexpected tokens after command line",
            ParseError::CommandLineFail => "expected a word after '!'",
            ParseError::JobFail => "expected a command after '|'",
            ParseError::CommandFail => "expected a word after redirection operator",
            ParseError::SimpleCommandFail => "expected a command word",
            ParseError::UnexpectedEnd => "unexpected end of input",
        };
        write!(f, "{msg}")
    }
}

/// Failure executing a parsed job.
#[derive(Debug)]
pub enum ExecError {
    Io(std::io::Error),
    Message(String),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::Io(e) => write!(f, "{e}"),
            ExecError::Message(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e)
    }
}

/// Prints a single diagnostic line prefixed with the originating component,
/// matching the shell's convention of `"<component>: <message>"`.
pub fn report(component: &str, message: impl fmt::Display) {
    eprintln!("{component}: {message}");
}
