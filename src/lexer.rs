//! Component D: the refining lexer. Consumes the raw-token stream and emits
//! logical tokens, resolving quoting, backslash escaping, and glob expansion
//! along the way.

use crate::error::LexError;
use crate::raw_lexer::{RawLexer, RawToken};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Amp,
    Semicolon,
    Exclam,
    Pipe,
    AngleL,
    AngleR,
    AngleRR,
    Word(String),
    End,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Dull,
    WordUnquoted,
    WordQuoted,
    WordQuotedEnd,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum QuoteKind {
    Single,
    Double,
}

/// Runs the refining lexer to completion, returning logical tokens ending in
/// [`Token::End`], or the first [`LexError`] encountered.
pub fn lex(input: &str) -> Result<Vec<Token>, LexError> {
    let mut raw = RawLexer::new(input);
    let mut state = State::Dull;
    let mut escape = false;
    let mut quote_kind = QuoteKind::Single;
    let mut accumulator = String::new();
    let mut tokens = Vec::new();

    loop {
        let raw_tok = raw.next();

        if escape {
            accumulator.push_str(&raw_tok.text());
            escape = false;
            // A `2>` swallowed by a preceding backslash degrades to a
            // literal "2" in the word, followed by a fresh `>` operator.
            if state == State::WordUnquoted && raw_tok == RawToken::AngleRR {
                accumulator.pop();
                accumulator.pop();
                accumulator.push('2');
                finalize_word(&mut accumulator, &mut tokens)?;
                tokens.push(Token::AngleR);
                state = State::Dull;
            }
            continue;
        }

        match state {
            State::WordQuoted => match (&raw_tok, quote_kind) {
                (RawToken::SQuote, QuoteKind::Single) | (RawToken::DQuote, QuoteKind::Double) => {
                    state = State::WordQuotedEnd;
                }
                (RawToken::End, _) => return Err(LexError::UnterminatedQuote),
                _ => {
                    append_quoted(&mut accumulator, &raw_tok);
                }
            },
            _ => {
                let starts_word = matches!(
                    raw_tok,
                    RawToken::Text(_)
                        | RawToken::Backslash
                        | RawToken::Asterisk
                        | RawToken::Question
                        | RawToken::LBracket
                );

                if starts_word {
                    if raw_tok == RawToken::Backslash {
                        accumulator.push('\\');
                        escape = true;
                    } else {
                        accumulator.push_str(&raw_tok.text());
                    }
                    state = State::WordUnquoted;
                    continue;
                }

                if raw_tok == RawToken::SQuote || raw_tok == RawToken::DQuote {
                    quote_kind = if raw_tok == RawToken::SQuote {
                        QuoteKind::Single
                    } else {
                        QuoteKind::Double
                    };
                    state = State::WordQuoted;
                    continue;
                }

                // Any other token ends a word-in-progress, then is handled
                // at Dull.
                if state == State::WordUnquoted || state == State::WordQuotedEnd {
                    finalize_word(&mut accumulator, &mut tokens)?;
                }
                state = State::Dull;

                match raw_tok {
                    RawToken::Amp => tokens.push(Token::Amp),
                    RawToken::Semicolon => tokens.push(Token::Semicolon),
                    RawToken::Exclam => tokens.push(Token::Exclam),
                    RawToken::Pipe => tokens.push(Token::Pipe),
                    RawToken::AngleL => tokens.push(Token::AngleL),
                    RawToken::AngleR => tokens.push(Token::AngleR),
                    RawToken::AngleRR => tokens.push(Token::AngleRR),
                    RawToken::Whitespace(_) => {}
                    RawToken::End => {
                        tokens.push(Token::End);
                        return Ok(tokens);
                    }
                    _ => {}
                }
            }
        }
    }
}

fn append_quoted(accumulator: &mut String, raw_tok: &RawToken) {
    let text = raw_tok.text();
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[') {
            accumulator.push('\\');
        }
        accumulator.push(c);
    }
}

/// Expands `accumulator` via glob, emitting one `Word` token per match, or a
/// single backslash-stripped `Word` on no match. Resets `accumulator`.
fn finalize_word(accumulator: &mut String, tokens: &mut Vec<Token>) -> Result<(), LexError> {
    let pattern = std::mem::take(accumulator);

    if !contains_glob_chars(&pattern) {
        tokens.push(Token::Word(strip_backslashes(&pattern)));
        return Ok(());
    }

    match glob::glob(&pattern) {
        Ok(paths) => {
            let mut matches: Vec<String> = paths
                .filter_map(|entry| entry.ok())
                .map(|path| path.to_string_lossy().into_owned())
                .collect();

            if matches.is_empty() {
                tokens.push(Token::Word(strip_backslashes(&pattern)));
            } else {
                matches.sort();
                for m in matches {
                    tokens.push(Token::Word(m));
                }
            }
            Ok(())
        }
        Err(e) => Err(LexError::GlobError(e.to_string())),
    }
}

fn contains_glob_chars(s: &str) -> bool {
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
            continue;
        }
        if matches!(c, '*' | '?' | '[') {
            return true;
        }
    }
    false
}

fn strip_backslashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
