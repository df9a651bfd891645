//! Component E's recursive-descent implementation.
//!
//! Grammar (never backtracks):
//! ```text
//! root         := End | cmd_line End
//! cmd_line     := '!' WORD | job_seq
//! job_seq      := job (terminator job)* terminator?
//! terminator   := '&' (Bg) | ';' (Fg)
//! job          := cmd ('|' cmd)*
//! cmd          := simple_cmd redirection*
//! simple_cmd   := WORD+
//! redirection  := ('<' | '>' | '2>') WORD
//! ```

use crate::ast::{Cmd, CommandLine, JobDesc, JobKind, Redir, RedirKind, Root, SimpleCmd};
use crate::error::ParseError;
use crate::lexer::Token;

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos];
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn word_text(&mut self) -> Option<String> {
        if let Token::Word(text) = self.peek() {
            let text = text.clone();
            self.advance();
            Some(text)
        } else {
            None
        }
    }

    fn parse_root(&mut self) -> Result<Root, ParseError> {
        if *self.peek() == Token::End {
            return Ok(Root::Empty);
        }

        let cmd_line = self.parse_cmd_line()?;

        if *self.peek() != Token::End {
            return Err(ParseError::UnexpectedTokens);
        }

        Ok(Root::NonEmpty(cmd_line))
    }

    fn parse_cmd_line(&mut self) -> Result<CommandLine, ParseError> {
        if *self.peek() == Token::Exclam {
            self.advance();
            let query = self.word_text().ok_or(ParseError::CommandLineFail)?;
            return Ok(CommandLine::Repeat(query));
        }

        self.parse_job_seq()
    }

    fn parse_job_seq(&mut self) -> Result<CommandLine, ParseError> {
        let mut jobs = Vec::new();

        loop {
            let job = self.parse_job()?;

            let kind = match self.peek() {
                Token::Amp => {
                    self.advance();
                    Some(JobKind::Bg)
                }
                Token::Semicolon => {
                    self.advance();
                    Some(JobKind::Fg)
                }
                _ => None,
            };

            match kind {
                Some(kind) => {
                    jobs.push(JobDesc { kind, job });
                    if *self.peek() == Token::End {
                        break;
                    }
                }
                None => {
                    // No terminator: the last job in the line, implicitly Fg.
                    jobs.push(JobDesc {
                        kind: JobKind::Fg,
                        job,
                    });
                    break;
                }
            }
        }

        Ok(CommandLine::Jobs(jobs))
    }

    fn parse_job(&mut self) -> Result<Vec<Cmd>, ParseError> {
        let mut cmds = vec![self.parse_cmd()?];

        while *self.peek() == Token::Pipe {
            self.advance();
            cmds.push(self.parse_cmd().map_err(|_| ParseError::JobFail)?);
        }

        Ok(cmds)
    }

    fn parse_cmd(&mut self) -> Result<Cmd, ParseError> {
        let simple = self.parse_simple_cmd()?;
        let mut redirections = Vec::new();

        loop {
            let kind = match self.peek() {
                Token::AngleL => RedirKind::Stdin,
                Token::AngleR => RedirKind::Stdout,
                Token::AngleRR => RedirKind::Stderr,
                _ => break,
            };
            self.advance();
            let file = self.word_text().ok_or(ParseError::CommandFail)?;
            redirections.push(Redir { kind, file });
        }

        Ok(Cmd {
            simple,
            redirections,
        })
    }

    fn parse_simple_cmd(&mut self) -> Result<SimpleCmd, ParseError> {
        let mut argv = Vec::new();
        while let Some(word) = self.word_text() {
            argv.push(word);
        }
        if argv.is_empty() {
            return Err(ParseError::SimpleCommandFail);
        }
        Ok(SimpleCmd { argv })
    }
}

pub fn parse(tokens: &[Token]) -> Result<Root, ParseError> {
    if tokens.is_empty() || *tokens.last().unwrap() != Token::End {
        return Err(ParseError::UnexpectedEnd);
    }
    Parser::new(tokens).parse_root()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_str(input: &str) -> Result<Root, ParseError> {
        let tokens = lex(input).expect("lex should succeed");
        parse(&tokens)
    }

    #[test]
    fn empty_line_is_empty_root() {
        assert_eq!(parse_str("").unwrap(), Root::Empty);
        assert_eq!(parse_str("   ").unwrap(), Root::Empty);
    }

    #[test]
    fn simple_command() {
        let root = parse_str("echo hello world").unwrap();
        let Root::NonEmpty(CommandLine::Jobs(jobs)) = root else {
            panic!("expected Jobs");
        };
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].kind, JobKind::Fg);
        assert_eq!(jobs[0].job.len(), 1);
        assert_eq!(
            jobs[0].job[0].simple.argv,
            vec!["echo", "hello", "world"]
        );
    }

    #[test]
    fn pipeline() {
        let root = parse_str("ls | wc -l").unwrap();
        let Root::NonEmpty(CommandLine::Jobs(jobs)) = root else {
            panic!("expected Jobs");
        };
        assert_eq!(jobs[0].job.len(), 2);
        assert_eq!(jobs[0].job[0].simple.argv, vec!["ls"]);
        assert_eq!(jobs[0].job[1].simple.argv, vec!["wc", "-l"]);
    }

    #[test]
    fn background_job() {
        let root = parse_str("sleep 1 &").unwrap();
        let Root::NonEmpty(CommandLine::Jobs(jobs)) = root else {
            panic!("expected Jobs");
        };
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].kind, JobKind::Bg);
    }

    #[test]
    fn redirections() {
        let root = parse_str("cat < in.txt > out.txt").unwrap();
        let Root::NonEmpty(CommandLine::Jobs(jobs)) = root else {
            panic!("expected Jobs");
        };
        let cmd = &jobs[0].job[0];
        assert_eq!(cmd.redirections.len(), 2);
        assert_eq!(cmd.redirections[0].kind, RedirKind::Stdin);
        assert_eq!(cmd.redirections[0].file, "in.txt");
        assert_eq!(cmd.redirections[1].kind, RedirKind::Stdout);
        assert_eq!(cmd.redirections[1].file, "out.txt");
    }

    #[test]
    fn stderr_redirection() {
        let root = parse_str("cmd 2> err.log").unwrap();
        let Root::NonEmpty(CommandLine::Jobs(jobs)) = root else {
            panic!("expected Jobs");
        };
        assert_eq!(jobs[0].job[0].redirections[0].kind, RedirKind::Stderr);
    }

    #[test]
    fn two_jobs_on_one_line() {
        let root = parse_str("cd /tmp ; pwd").unwrap();
        let Root::NonEmpty(CommandLine::Jobs(jobs)) = root else {
            panic!("expected Jobs");
        };
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].kind, JobKind::Fg);
        assert_eq!(jobs[1].kind, JobKind::Fg);
    }

    #[test]
    fn history_repeat() {
        let root = parse_str("!ec").unwrap();
        assert_eq!(
            root,
            Root::NonEmpty(CommandLine::Repeat("ec".to_string()))
        );
    }

    #[test]
    fn bang_without_word_fails() {
        assert_eq!(parse_str("!").unwrap_err(), ParseError::CommandLineFail);
    }

    #[test]
    fn redirection_without_word_fails() {
        assert_eq!(parse_str("cmd >").unwrap_err(), ParseError::CommandFail);
    }

    #[test]
    fn dangling_pipe_fails() {
        assert_eq!(parse_str("ls |").unwrap_err(), ParseError::JobFail);
    }
}
