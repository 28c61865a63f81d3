//! Build option string parsing
//!
//! Option strings are shell-like: tokens are separated by whitespace, but
//! whitespace inside quotes or inside `{...}` does not split, so values such
//! as `-DVAR={"key": "value"}` stay in one piece. Quotes only group text
//! outside braces; inside `{...}` they are ordinary characters, so an
//! apostrophe in `-DC={it's x}` does not swallow the following options.
//! Parsing never fails; an unbalanced quote or brace swallows the rest of the
//! input into the current token.

/// Separator used when sorted options are folded into a cache key
pub const OPTION_SEPARATOR: &str = ",";

/// Split a raw options string into tokens
pub fn parse_options(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;

    for c in raw.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' if depth == 0 => {
                quote = Some(c);
                current.push(c);
            }
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => push_token(&mut tokens, &mut current),
            c => current.push(c),
        }
    }
    push_token(&mut tokens, &mut current);

    tokens
}

fn push_token(tokens: &mut Vec<String>, current: &mut String) {
    if current.is_empty() {
        return;
    }
    let token = strip_surrounding_quotes(current);
    if !token.is_empty() {
        tokens.push(token.to_string());
    }
    current.clear();
}

fn strip_surrounding_quotes(token: &str) -> &str {
    for q in ['"', '\''] {
        if token.len() >= 2 && token.starts_with(q) && token.ends_with(q) {
            return &token[1..token.len() - 1];
        }
    }
    token
}

/// Parse, sort and join options into their order-independent form
///
/// Absent or empty input yields an empty string.
pub fn normalize_options(raw: Option<&str>) -> String {
    let mut tokens = raw.map(parse_options).unwrap_or_default();
    tokens.sort();
    tokens.join(OPTION_SEPARATOR)
}
