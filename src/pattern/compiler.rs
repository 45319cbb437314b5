//! Token list → regex source.

use crate::pattern::parser::Token;

/// Regex source for a non-literal pattern, with its parameter table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSource {
    pub source: String,
    /// Parameter name for capture group `p{index}`.
    pub params: Vec<String>,
    pub leaf: bool,
}

/// Name of the regex group holding the `index`-th capture.
pub fn group_name(index: usize) -> String {
    format!("p{index}")
}

pub fn compile(tokens: &[Token]) -> CompiledSource {
    let mut source = String::from("^");
    let mut params = Vec::new();
    emit(tokens, &mut source, &mut params);

    // A trailing slash turns the pattern into a mount: the slash is optional
    // at the end of input and is handed back as the start of the remainder.
    let leaf = if matches!(tokens.last(), Some(Token::Slash)) {
        source.pop();
        source.push_str("(/|$)");
        false
    } else {
        source.push('$');
        true
    };

    CompiledSource {
        source,
        params,
        leaf,
    }
}

fn emit(tokens: &[Token], out: &mut String, params: &mut Vec<String>) {
    let mut after_slash = false;

    for token in tokens {
        match token {
            Token::Slash => out.push('/'),
            Token::Literal(text) => out.push_str(&regex::escape(text)),
            Token::Capture { name, options } => {
                let group = group_name(params.len());
                params.push(name.clone());
                if options.is_empty() {
                    out.push_str(&format!("(?P<{group}>[^/]+)"));
                } else {
                    let alternation = options
                        .iter()
                        .map(|option| regex::escape(option))
                        .collect::<Vec<_>>()
                        .join("|");
                    out.push_str(&format!("(?P<{group}>{alternation})"));
                }
            }
            Token::Optional(inner) => {
                if after_slash && !matches!(inner.first(), Some(Token::Slash)) {
                    out.pop();
                    out.push_str("(/");
                } else {
                    out.push('(');
                }
                emit(inner, out, params);
                out.push_str(")?");
            }
        }
        after_slash = matches!(token, Token::Slash);
    }
}
