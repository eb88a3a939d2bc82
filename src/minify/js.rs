//! Comment and whitespace stripping for JavaScript.
//!
//! Tokens are never rewritten: string, template and regex literals are copied
//! byte for byte, and everything else only loses comments and the whitespace
//! between tokens. A whitespace run that held a line break keeps one `\n`
//! unless the characters around it make the break meaningless, so automatic
//! semicolon insertion (`return\nvalue`, `a\n++b`) sees the same lines.
//!
//! Any literal or comment that doesn't terminate is an error; callers fall
//! back to the input.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum JsMinifyError {
    #[error("unterminated {what} at offset {offset}")]
    Unterminated { what: &'static str, offset: usize },
}

/// What separated the previous token from the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Gap {
    None,
    Space,
    Newline,
}

/// Keywords after which `/` starts a regex literal rather than a division.
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

pub fn minify(src: &str) -> Result<String, JsMinifyError> {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::with_capacity(src.len());
    let mut gap = Gap::None;
    let mut i = 0;

    if src.starts_with("#!") {
        while i < chars.len() && !is_line_break(chars[i]) {
            out.push(chars[i]);
            i += 1;
        }
    }

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if is_line_break(c) {
            gap = Gap::Newline;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            gap = gap.max(Gap::Space);
            i += 1;
            continue;
        }
        if c == '/' && next == Some('/') {
            while i < chars.len() && !is_line_break(chars[i]) {
                i += 1;
            }
            gap = gap.max(Gap::Space);
            continue;
        }
        if c == '/' && next == Some('*') {
            let start = i;
            i += 2;
            let mut broke_line = false;
            loop {
                match chars.get(i) {
                    None => return Err(unterminated("block comment", start)),
                    Some('*') if chars.get(i + 1) == Some(&'/') => {
                        i += 2;
                        break;
                    }
                    Some(&ch) => {
                        broke_line |= is_line_break(ch);
                        i += 1;
                    }
                }
            }
            gap = gap.max(if broke_line { Gap::Newline } else { Gap::Space });
            continue;
        }

        push_gap(&mut out, gap, c);
        gap = Gap::None;

        i = match c {
            '"' | '\'' => copy_string(&chars, i, &mut out)?,
            '`' => copy_template(&chars, i, &mut out)?,
            '/' if regex_allowed(&out) => copy_regex(&chars, i, &mut out)?,
            _ => {
                out.push(c);
                i + 1
            }
        };
    }

    Ok(out)
}

fn unterminated(what: &'static str, offset: usize) -> JsMinifyError {
    JsMinifyError::Unterminated { what, offset }
}

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '\\' || !c.is_ascii()
}

/// Write what's left of a whitespace run before the token starting with `next`.
fn push_gap(out: &mut String, gap: Gap, next: char) {
    let Some(prev) = out.chars().next_back() else {
        return;
    };
    if gap == Gap::None {
        return;
    }
    if gap == Gap::Newline && !break_is_insignificant(prev, next) {
        out.push('\n');
    } else if needs_space(prev, next) {
        out.push(' ');
    }
}

/// A line break between these two characters can never end a statement.
fn break_is_insignificant(prev: char, next: char) -> bool {
    matches!(
        prev,
        '{' | '(' | '[' | ',' | ';' | ':' | '?' | '=' | '&' | '|' | '!' | '~' | '<' | '>' | '*'
            | '%' | '^'
    ) || matches!(next, ')' | ']' | '}' | ',' | ';')
}

/// Tokens that would merge, or turn into something else, without a space.
fn needs_space(prev: char, next: char) -> bool {
    (is_word(prev) && is_word(next))
        || (prev == '+' && next == '+')
        || (prev == '-' && next == '-')
        || (prev == '/' && matches!(next, '/' | '*'))
        || (prev.is_ascii_digit() && next == '.')
        || (prev == '<' && next == '!')
        || (prev == '-' && next == '>')
}

/// Whether a `/` after `out` opens a regex literal. Copying a regex verbatim
/// is always safe, so only a preceding operand rules it out.
fn regex_allowed(out: &str) -> bool {
    let code = out.trim_end();
    let Some(last) = code.chars().next_back() else {
        return true;
    };
    if is_word(last) {
        let word_start = code
            .char_indices()
            .rev()
            .take_while(|(_, c)| is_word(*c))
            .last()
            .map_or(0, |(pos, _)| pos);
        return REGEX_KEYWORDS.contains(&&code[word_start..]);
    }
    !matches!(last, ')' | ']' | '}' | '"' | '\'' | '`')
}

/// Copy a quoted string starting at `start`; returns the index after it.
fn copy_string(chars: &[char], start: usize, out: &mut String) -> Result<usize, JsMinifyError> {
    let quote = chars[start];
    out.push(quote);
    let mut i = start + 1;
    loop {
        let Some(&c) = chars.get(i) else {
            return Err(unterminated("string", start));
        };
        out.push(c);
        i += 1;
        if c == '\\' {
            let Some(&escaped) = chars.get(i) else {
                return Err(unterminated("string", start));
            };
            out.push(escaped);
            i += 1;
        } else if c == quote {
            return Ok(i);
        } else if is_line_break(c) {
            return Err(unterminated("string", start));
        }
    }
}

/// Copy a template literal verbatim, including any `${...}` expressions.
fn copy_template(chars: &[char], start: usize, out: &mut String) -> Result<usize, JsMinifyError> {
    out.push('`');
    let mut i = start + 1;
    loop {
        let Some(&c) = chars.get(i) else {
            return Err(unterminated("template literal", start));
        };
        out.push(c);
        i += 1;
        match c {
            '\\' => {
                let Some(&escaped) = chars.get(i) else {
                    return Err(unterminated("template literal", start));
                };
                out.push(escaped);
                i += 1;
            }
            '`' => return Ok(i),
            '$' if chars.get(i) == Some(&'{') => {
                out.push('{');
                i = copy_template_expr(chars, i + 1, out)?;
            }
            _ => {}
        }
    }
}

/// Copy the inside of a `${...}` up to and including its closing brace.
fn copy_template_expr(chars: &[char], start: usize, out: &mut String) -> Result<usize, JsMinifyError> {
    let mut depth = 1usize;
    let mut i = start;
    loop {
        let Some(&c) = chars.get(i) else {
            return Err(unterminated("template expression", start));
        };
        i = match c {
            '"' | '\'' => copy_string(chars, i, out)?,
            '`' => copy_template(chars, i, out)?,
            _ => {
                out.push(c);
                if c == '{' {
                    depth += 1;
                } else if c == '}' {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i + 1);
                    }
                }
                i + 1
            }
        };
    }
}

/// Copy a regex literal body up to its closing `/`. Flags follow as ordinary
/// word characters.
fn copy_regex(chars: &[char], start: usize, out: &mut String) -> Result<usize, JsMinifyError> {
    out.push('/');
    let mut i = start + 1;
    let mut in_class = false;
    loop {
        let Some(&c) = chars.get(i) else {
            return Err(unterminated("regex", start));
        };
        if is_line_break(c) {
            return Err(unterminated("regex", start));
        }
        out.push(c);
        i += 1;
        match c {
            '\\' => {
                let Some(&escaped) = chars.get(i).filter(|e| !is_line_break(**e)) else {
                    return Err(unterminated("regex", start));
                };
                out.push(escaped);
                i += 1;
            }
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => return Ok(i),
            _ => {}
        }
    }
}
