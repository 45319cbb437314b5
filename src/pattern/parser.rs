//! Path DSL tokenizer.
//!
//! # Grammar
//! ```text
//! path     <- '/' token*
//! token    <- '/' | capture | optional | literal
//! capture  <- '{' name (':' option ('|' option)*)? '}'
//! optional <- '[' token+ ']'
//! name     <- [A-Za-z] [A-Za-z0-9_]*
//! ```
//!
//! `*` is only meaningful as a trailing `/*` mount marker, which the caller
//! strips before tokenizing; anywhere else it is rejected.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::pattern::PatternError;

/// One element of a tokenized registration path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Slash,
    Literal(String),
    Capture { name: String, options: Vec<String> },
    Optional(Vec<Token>),
}

impl Token {
    /// True for tokens that match exactly one fixed string.
    pub fn is_literal(&self) -> bool {
        matches!(self, Token::Slash | Token::Literal(_))
    }
}

/// Tokenize a registration path.
pub fn parse(path: &str) -> Result<Vec<Token>, PatternError> {
    if path.is_empty() {
        return Err(PatternError::Empty);
    }
    if !path.starts_with('/') {
        return Err(PatternError::MissingLeadingSlash(path.to_string()));
    }

    let mut parser = Parser {
        path,
        chars: path.char_indices().peekable(),
    };
    parser.sequence(None)
}

struct Parser<'a> {
    path: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl Parser<'_> {
    /// Parse tokens until the end of input, or until the `]` closing the
    /// optional group opened at `open`.
    fn sequence(&mut self, open: Option<usize>) -> Result<Vec<Token>, PatternError> {
        let mut tokens = Vec::new();
        let mut literal = String::new();

        while let Some((offset, c)) = self.chars.next() {
            match c {
                '/' => {
                    flush(&mut literal, &mut tokens);
                    tokens.push(Token::Slash);
                }
                '{' => {
                    flush(&mut literal, &mut tokens);
                    let capture = self.capture(offset)?;
                    tokens.push(capture);
                }
                '[' => {
                    flush(&mut literal, &mut tokens);
                    let inner = self.sequence(Some(offset))?;
                    if inner.is_empty() {
                        return Err(PatternError::EmptyOptional {
                            path: self.path.to_string(),
                            offset,
                        });
                    }
                    tokens.push(Token::Optional(inner));
                }
                ']' if open.is_some() => {
                    flush(&mut literal, &mut tokens);
                    return Ok(tokens);
                }
                ']' | '}' | '*' => return Err(self.unexpected(offset, c)),
                _ => literal.push(c),
            }
        }

        if let Some(offset) = open {
            return Err(PatternError::Unterminated {
                path: self.path.to_string(),
                offset,
                open: '[',
            });
        }

        flush(&mut literal, &mut tokens);
        Ok(tokens)
    }

    fn capture(&mut self, open: usize) -> Result<Token, PatternError> {
        let mut body = String::new();

        loop {
            match self.chars.next() {
                None => {
                    return Err(PatternError::Unterminated {
                        path: self.path.to_string(),
                        offset: open,
                        open: '{',
                    })
                }
                Some((_, '}')) => break,
                Some((offset, c @ ('/' | '{' | '[' | ']' | '*'))) => {
                    return Err(self.unexpected(offset, c))
                }
                Some((_, c)) => body.push(c),
            }
        }

        let (name, options) = match body.split_once(':') {
            Some((name, options)) => (name, Some(options)),
            None => (body.as_str(), None),
        };

        if name.is_empty() {
            return Err(PatternError::EmptyCaptureName {
                path: self.path.to_string(),
                offset: open,
            });
        }
        if !is_valid_name(name) {
            return Err(PatternError::InvalidCaptureName {
                path: self.path.to_string(),
                name: name.to_string(),
            });
        }

        let options = match options {
            None => Vec::new(),
            Some(list) => list
                .split('|')
                .map(|option| {
                    if option.is_empty() {
                        Err(PatternError::EmptyOption {
                            path: self.path.to_string(),
                            name: name.to_string(),
                        })
                    } else {
                        Ok(option.to_string())
                    }
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(Token::Capture {
            name: name.to_string(),
            options,
        })
    }

    fn unexpected(&self, offset: usize, found: char) -> PatternError {
        PatternError::Unexpected {
            path: self.path.to_string(),
            offset,
            found,
        }
    }
}

fn flush(literal: &mut String, tokens: &mut Vec<Token>) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
