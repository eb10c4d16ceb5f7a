use super::*;

// Aliased entries report the source field, not the local binding; spreads
// carry no field name and are skipped.
pub(crate) fn destructured_flag_names(interior: &str) -> Vec<String> {
    let mut out = Vec::new();

    for raw in interior.split([',', ';']) {
        let part = raw.trim();
        if part.is_empty() || part.starts_with("...") {
            continue;
        }

        let bound = part
            .split_once(':')
            .map(|(left, _)| left.trim())
            .unwrap_or(part);

        let name = leading_identifier(bound);
        if is_likely_flag_name(name) {
            out.push(name.to_string());
        }
    }

    out
}

// For each line carrying the accessor call, walk backwards within the chunk
// (bounded by DESTRUCTURE_LOOKBACK_LINES) until a line with an opening brace
// has been collected, then run the destructuring patterns over the sanitized
// concatenation. Blocks wrapping further than the window are not detected.
pub(crate) fn extract_multiline_destructuring(chunk: &[String], file_path: &str) -> Vec<FlagReference> {
    let mut out = Vec::new();

    for (idx, line) in chunk.iter().enumerate() {
        if !line.contains(FLAG_BAG_GETTER)
            && !line.contains(FLAG_BAG_SELECTOR)
            && !line.contains(&format!("= {FLAG_BAG_IDENT}"))
        {
            continue;
        }

        let mut collected = vec![strip_comments(line)];
        let mut cursor = idx;
        let mut back = 0usize;
        while cursor > 0 && back < DESTRUCTURE_LOOKBACK_LINES {
            if collected.iter().any(|l| l.contains('{')) {
                break;
            }
            cursor -= 1;
            back += 1;
            collected.push(strip_comments(&chunk[cursor]));
        }

        collected.reverse();
        let sanitized = strip_strings(&collected.join(" "));

        for matcher in FLAG_MATCHERS {
            if matcher.kind != MatcherKind::Destructure {
                continue;
            }
            for caps in matcher.pattern.captures_iter(&sanitized) {
                let interior = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                for flag_name in destructured_flag_names(interior) {
                    out.push(FlagReference {
                        flag_name,
                        file_path: file_path.to_string(),
                    });
                }
            }
        }
    }

    out
}

fn leading_identifier(part: &str) -> &str {
    let mut end = 0;
    for (idx, c) in part.char_indices() {
        let valid = if idx == 0 {
            c.is_ascii_alphabetic() || c == '_' || c == '$'
        } else {
            c.is_ascii_alphanumeric() || c == '_' || c == '$'
        };
        if !valid {
            break;
        }
        end = idx + c.len_utf8();
    }
    &part[..end]
}
