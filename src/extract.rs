use super::*;

pub(crate) struct LineForms {
    pub(crate) stripped: String,
    pub(crate) masked: String,
    pub(crate) sanitized: String,
}

pub(crate) fn derive_forms(line: &str) -> LineForms {
    let stripped = strip_comments(line);
    let masked = mask_strings(&stripped);
    let sanitized = strip_strings(&stripped);
    LineForms {
        stripped,
        masked,
        sanitized,
    }
}

pub(crate) fn extract_from_line(
    line: &str,
    file_path: &str,
    skip_destructuring: bool,
    constants: &ConstantTable,
) -> Vec<FlagReference> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("//") || trimmed.starts_with('*') {
        return Vec::new();
    }

    let forms = derive_forms(line);
    let mut names: Vec<String> = Vec::new();

    for matcher in FLAG_MATCHERS {
        match matcher.kind {
            // Quoted flag names are only visible on the unsanitized line; the
            // masked twin rejects matches that started inside an outer string.
            MatcherKind::BracketLiteral => {
                for caps in matcher.pattern.captures_iter(&forms.stripped) {
                    let Some(whole) = caps.get(0) else {
                        continue;
                    };
                    if !starts_outside_string(&forms.stripped, &forms.masked, whole.start()) {
                        continue;
                    }
                    let literal = caps
                        .get(1)
                        .or_else(|| caps.get(2))
                        .or_else(|| caps.get(3))
                        .map(|m| m.as_str())
                        .unwrap_or_default();
                    if is_likely_flag_name(literal) {
                        names.push(literal.to_string());
                    }
                }
            }
            MatcherKind::DotAccess => {
                for caps in matcher.pattern.captures_iter(&forms.sanitized) {
                    let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                    if is_likely_flag_name(name) {
                        names.push(name.to_string());
                    }
                }
            }
            MatcherKind::BracketConstant => {
                for caps in matcher.pattern.captures_iter(&forms.sanitized) {
                    let expression = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                    if expression.is_empty() {
                        continue;
                    }
                    match constants.resolve(expression) {
                        Some(resolved) => {
                            if is_likely_flag_name(resolved) {
                                names.push(resolved.to_string());
                            }
                        }
                        // Unmapped but static-looking: surface a synthetic name
                        // that can never be registered, forcing a mapping.
                        None if is_static_looking(expression) => {
                            names.push(format!("<unresolved constant: {expression}>"));
                        }
                        // Lowercase runtime variables cannot be resolved statically.
                        None => {}
                    }
                }
            }
            MatcherKind::Destructure => {
                if skip_destructuring {
                    continue;
                }
                for caps in matcher.pattern.captures_iter(&forms.sanitized) {
                    let interior = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                    names.extend(destructured_flag_names(interior));
                }
            }
        }
    }

    names
        .into_iter()
        .map(|flag_name| FlagReference {
            flag_name,
            file_path: file_path.to_string(),
        })
        .collect()
}

pub(crate) fn extract_from_chunk(
    chunk: &[String],
    file_path: &str,
    constants: &ConstantTable,
) -> Vec<FlagReference> {
    let mut out = Vec::new();

    for line in chunk {
        out.extend(extract_from_line(line, file_path, false, constants));
    }

    // Expressions can legally wrap across a line break; joined pairs and
    // triples of adjacent lines catch those. Chunks are contiguous by
    // construction, so joining never crosses a hunk boundary. Brace matching
    // across an artificial join is unreliable, so destructuring is skipped.
    for window in chunk.windows(2) {
        let joined = join_pair(&window[0], &window[1]);
        out.extend(extract_from_line(&joined, file_path, true, constants));
    }
    for window in chunk.windows(3) {
        let joined = join_triple(&window[0], &window[1], &window[2]);
        out.extend(extract_from_line(&joined, file_path, true, constants));
    }

    out.extend(extract_multiline_destructuring(chunk, file_path));

    out
}

fn starts_outside_string(stripped: &str, masked: &str, at: usize) -> bool {
    stripped.as_bytes().get(at) == masked.as_bytes().get(at)
}

fn join_pair(left: &str, right: &str) -> String {
    format!(
        "{}{}",
        strip_comments(left).trim_end(),
        strip_comments(right).trim_start()
    )
}

fn join_triple(first: &str, second: &str, third: &str) -> String {
    format!(
        "{}{}{}",
        strip_comments(first).trim_end(),
        strip_comments(second).trim(),
        strip_comments(third).trim_start()
    )
}

pub(crate) fn is_likely_flag_name(name: &str) -> bool {
    if name.len() < 3 {
        return false;
    }
    if RESERVED_FLAG_NAMES.contains(&name) {
        return false;
    }
    name.chars()
        .next()
        .map(|c| c.is_ascii_lowercase())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(references: Vec<FlagReference>) -> Vec<String> {
        references.into_iter().map(|r| r.flag_name).collect()
    }

    fn extract(line: &str) -> Vec<String> {
        names(extract_from_line(line, "app/a.ts", false, &ConstantTable::default()))
    }

    #[test]
    fn dot_access_yields_one_reference() {
        assert_eq!(extract("const x = remoteFeatureFlags.myCoolFlag;"), vec!["myCoolFlag"]);
    }

    #[test]
    fn optional_chain_and_getter_call_dot_access() {
        assert_eq!(extract("if (remoteFeatureFlags?.gatedThing) {"), vec!["gatedThing"]);
        assert_eq!(
            extract("return getRemoteFeatureFlags(state).walletRedesign;"),
            vec!["walletRedesign"]
        );
        assert_eq!(
            extract("const v = state.metamask.remoteFeatureFlags.deepFlag;"),
            vec!["deepFlag"]
        );
    }

    #[test]
    fn comment_lines_are_rejected_before_matching() {
        assert!(extract("// remoteFeatureFlags['ignoredFlag']").is_empty());
        assert!(extract("  * remoteFeatureFlags.blockCommentFlag").is_empty());
    }

    #[test]
    fn bracket_literal_yields_the_quoted_name() {
        assert_eq!(extract("const v = remoteFeatureFlags['realFlag'];"), vec!["realFlag"]);
        assert_eq!(extract("const v = remoteFeatureFlags?.[\"quotedFlag\"];"), vec![
            "quotedFlag"
        ]);
    }

    #[test]
    fn bracket_literal_inside_an_outer_string_is_rejected() {
        assert!(extract("const s = \"see remoteFeatureFlags['hidden'] docs\";").is_empty());
    }

    #[test]
    fn dot_access_inside_a_string_is_rejected() {
        assert!(extract("const s = 'remoteFeatureFlags.secretFlagName';").is_empty());
    }

    #[test]
    fn constant_in_brackets_resolves_through_the_table() {
        let mut entries = HashMap::new();
        entries.insert("FeatureFlagNames.Foo".to_string(), "fooFlag".to_string());
        let table = ConstantTable::from_map(entries);

        let refs = extract_from_line(
            "const on = remoteFeatureFlags[FeatureFlagNames.Foo];",
            "app/a.ts",
            false,
            &table,
        );
        assert_eq!(names(refs), vec!["fooFlag"]);
    }

    #[test]
    fn unresolved_uppercase_constant_becomes_a_synthetic_flag() {
        assert_eq!(
            extract("const on = remoteFeatureFlags[UNKNOWN_CONST];"),
            vec!["<unresolved constant: UNKNOWN_CONST>"]
        );
    }

    #[test]
    fn unresolved_lowercase_identifier_is_silently_ignored() {
        assert!(extract("const on = remoteFeatureFlags[runtimeKey];").is_empty());
    }

    #[test]
    fn longer_identifiers_containing_the_bag_name_do_not_match() {
        assert!(extract("const v = legacy_remoteFeatureFlags['notAFlag'];").is_empty());
        assert!(extract("const v = legacy_remoteFeatureFlags[SOME_CONST];").is_empty());
        assert!(extract("const v = legacy_remoteFeatureFlags.notAFlag;").is_empty());
    }

    #[test]
    fn reserved_names_never_become_references() {
        assert!(extract("remoteFeatureFlags.toString;").is_empty());
        assert!(extract("remoteFeatureFlags.hasOwnProperty('x');").is_empty());
    }

    #[test]
    fn single_line_destructuring_uses_source_names_not_aliases() {
        let found = extract("const { flagA, flagB: renamed } = getRemoteFeatureFlags();");
        assert_eq!(found, vec!["flagA", "flagB"]);
    }

    #[test]
    fn destructuring_is_skipped_on_joined_lines() {
        let refs = extract_from_line(
            "const { joinedFlag } = getRemoteFeatureFlags();",
            "app/a.ts",
            true,
            &ConstantTable::default(),
        );
        assert!(refs.is_empty());
    }

    #[test]
    fn wrapped_expression_is_caught_by_pair_joining() {
        let chunk = vec![
            "const enabled = remoteFeatureFlags".to_string(),
            "  .wrappedFlag;".to_string(),
        ];
        let found = names(extract_from_chunk(&chunk, "app/a.ts", &ConstantTable::default()));
        assert!(found.contains(&"wrappedFlag".to_string()));
    }

    #[test]
    fn wrapped_expression_is_caught_by_triple_joining() {
        let chunk = vec![
            "const enabled = remoteFeatureFlags[".to_string(),
            "  'spreadOutFlag'".to_string(),
            "];".to_string(),
        ];
        let found = names(extract_from_chunk(&chunk, "app/a.ts", &ConstantTable::default()));
        assert!(found.contains(&"spreadOutFlag".to_string()));
    }

    #[test]
    fn lines_in_different_chunks_are_never_joined() {
        let table = ConstantTable::default();
        let first = names(extract_from_chunk(
            &["const enabled = remoteFeatureFlags".to_string()],
            "app/a.ts",
            &table,
        ));
        let second = names(extract_from_chunk(
            &["  .distantFlag;".to_string()],
            "app/a.ts",
            &table,
        ));
        assert!(first.is_empty());
        assert!(second.is_empty());
    }

    #[test]
    fn plausibility_filter_is_deterministic() {
        for reserved in RESERVED_FLAG_NAMES {
            assert!(!is_likely_flag_name(reserved), "accepted reserved: {reserved}");
        }
        assert!(!is_likely_flag_name("ab"));
        assert!(!is_likely_flag_name("PascalCase"));
        assert!(!is_likely_flag_name("ALL_CAPS"));
        assert!(is_likely_flag_name("someFlag"));
        assert!(is_likely_flag_name("abc"));
    }
}
