//! Invertible shell-style command tokenization.
//!
//! The canonical model stores a command as a single printable string;
//! list-valued schemas (ECS `command`, compose list form) convert through
//! these two functions. POSIX word-splitting with single-quote grouping:
//! any token containing whitespace or a shell metacharacter is wrapped in
//! single quotes on join, and quoted spans survive splitting as one token.
//!
//! Round-trip law: for any token sequence with no literal single-quote
//! characters, `split_tokens(&join_tokens(tokens)) == tokens`.

/// Characters (besides whitespace) that force a token to be quoted.
const METACHARACTERS: &str = "|&;<>()$`\\\"'*?[]#~";

fn needs_quoting(token: &str) -> bool {
    token.is_empty()
        || token
            .chars()
            .any(|c| c.is_whitespace() || METACHARACTERS.contains(c))
}

/// Joins argv tokens into one printable command string.
///
/// Plain tokens are emitted bare; tokens with special characters are
/// wrapped in single quotes; an empty token renders as `''`. An empty
/// token list joins to the empty string.
#[must_use]
pub fn join_tokens(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|token| {
            if needs_quoting(token) {
                format!("'{token}'")
            } else {
                token.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits a command string into argv tokens.
///
/// Whitespace separates tokens except inside single-quoted spans; a
/// quoted span becomes one token with the quotes stripped, regardless of
/// internal spaces. The empty string splits to an empty list; `''` yields
/// one empty token. An unterminated quote spans to the end of input.
#[must_use]
pub fn split_tokens(input: &str) -> Vec<String> {
    split_with_quote(input, '\'')
}

/// [`split_tokens`] generalized over the grouping quote character.
///
/// Schemas that group with double quotes (systemd `Environment="A=1"`)
/// share the splitter instead of re-implementing it.
#[must_use]
pub fn split_with_quote(input: &str, quote: char) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    // True once the current token saw a quote, so an empty quoted span
    // survives as a token.
    let mut quoted = false;

    for c in input.chars() {
        match c {
            c if c == quote => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() || quoted {
                    tokens.push(std::mem::take(&mut current));
                    quoted = false;
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() || quoted {
        tokens.push(current);
    }
    tokens
}
