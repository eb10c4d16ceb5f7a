use super::*;

const MASK_CHAR: char = '*';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringAction {
    Keep,
    Mask,
    Strip,
}

// Block-comment state is not carried across lines: a `/*` left open swallows
// the rest of its own line only. Continuation lines are caught by the leading
// `*` fast-reject in the extractor.
pub(crate) fn strip_comments(line: &str) -> String {
    scan_line(line, true, StringAction::Keep)
}

// Filler replaces string interiors byte-for-byte, so match positions on the
// masked twin line up with the unmasked line.
pub(crate) fn mask_strings(line: &str) -> String {
    scan_line(line, false, StringAction::Mask)
}

pub(crate) fn strip_strings(line: &str) -> String {
    scan_line(line, false, StringAction::Strip)
}

fn scan_line(line: &str, drop_comments: bool, strings: StringAction) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut last_significant: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' || c == '"' {
            consume_quoted(&chars, &mut i, &mut out, c, strings);
            last_significant = Some(c);
            continue;
        }

        if c == '`' {
            consume_template(&chars, &mut i, &mut out, strings);
            last_significant = Some('`');
            continue;
        }

        if drop_comments && c == '/' && i + 1 < chars.len() {
            if chars[i + 1] == '/' {
                break;
            }
            if chars[i + 1] == '*' {
                i += 2;
                let mut closed = false;
                while i + 1 < chars.len() {
                    if chars[i] == '*' && chars[i + 1] == '/' {
                        i += 2;
                        closed = true;
                        break;
                    }
                    i += 1;
                }
                if !closed {
                    break;
                }
                continue;
            }
        }

        if c == '/' && opens_regex_literal(last_significant) {
            consume_regex_literal(&chars, &mut i, &mut out);
            last_significant = Some('/');
            continue;
        }

        out.push(c);
        if !c.is_whitespace() {
            last_significant = Some(c);
        }
        i += 1;
    }

    out
}

// A slash starts a regex literal only where an expression is expected.
fn opens_regex_literal(previous: Option<char>) -> bool {
    matches!(
        previous,
        None | Some('=' | '(' | '[' | '!' | '&' | '|' | ',' | ';' | ':' | '?')
    )
}

fn consume_quoted(chars: &[char], i: &mut usize, out: &mut String, quote: char, strings: StringAction) {
    out.push(quote);
    *i += 1;

    while *i < chars.len() {
        let c = chars[*i];

        if c == '\\' {
            emit_interior(out, c, strings);
            *i += 1;
            if *i < chars.len() {
                emit_interior(out, chars[*i], strings);
                *i += 1;
            }
            continue;
        }

        if c == quote {
            out.push(quote);
            *i += 1;
            return;
        }

        emit_interior(out, c, strings);
        *i += 1;
    }
}

fn consume_template(chars: &[char], i: &mut usize, out: &mut String, strings: StringAction) {
    out.push('`');
    *i += 1;

    while *i < chars.len() {
        let c = chars[*i];

        if c == '\\' {
            emit_interior(out, c, strings);
            *i += 1;
            if *i < chars.len() {
                emit_interior(out, chars[*i], strings);
                *i += 1;
            }
            continue;
        }

        if c == '`' {
            out.push('`');
            *i += 1;
            return;
        }

        if c == '$' && *i + 1 < chars.len() && chars[*i + 1] == '{' {
            consume_interpolation(chars, i, out, strings);
            continue;
        }

        emit_interior(out, c, strings);
        *i += 1;
    }
}

// Interpolated expressions are live code: copied through verbatim with
// brace-depth tracking so nested blocks and nested template literals stay
// balanced instead of desynchronizing the scanner.
fn consume_interpolation(chars: &[char], i: &mut usize, out: &mut String, strings: StringAction) {
    out.push('$');
    out.push('{');
    *i += 2;
    let mut depth = 1usize;

    while *i < chars.len() {
        let c = chars[*i];

        if c == '`' {
            consume_template(chars, i, out, strings);
            continue;
        }

        // Quoted strings inside the interpolation are part of the live code;
        // braces in their interiors must not move the depth counter.
        if c == '\'' || c == '"' {
            consume_quoted(chars, i, out, c, StringAction::Keep);
            continue;
        }

        if c == '\\' {
            out.push(c);
            *i += 1;
            if *i < chars.len() {
                out.push(chars[*i]);
                *i += 1;
            }
            continue;
        }

        if c == '{' {
            depth += 1;
        } else if c == '}' {
            depth -= 1;
            if depth == 0 {
                out.push('}');
                *i += 1;
                return;
            }
        }

        out.push(c);
        *i += 1;
    }
}

fn consume_regex_literal(chars: &[char], i: &mut usize, out: &mut String) {
    let start = *i;
    let mut j = *i + 1;
    let mut in_class = false;
    let mut closed = false;

    while j < chars.len() {
        let c = chars[j];
        if c == '\\' {
            j += 2;
            continue;
        }
        if c == '[' {
            in_class = true;
        } else if c == ']' {
            in_class = false;
        } else if c == '/' && !in_class {
            closed = true;
            break;
        }
        j += 1;
    }

    if !closed {
        // No closing delimiter on this line; treat the slash as a plain character.
        out.push('/');
        *i += 1;
        return;
    }

    // The whole literal passes through untouched so its contents are never
    // mistaken for strings or flag syntax.
    for c in &chars[start..=j] {
        out.push(*c);
    }
    *i = j + 1;
}

fn emit_interior(out: &mut String, c: char, strings: StringAction) {
    match strings {
        StringAction::Keep => out.push(c),
        StringAction::Mask => {
            for _ in 0..c.len_utf8() {
                out.push(MASK_CHAR);
            }
        }
        StringAction::Strip => {}
    }
}
