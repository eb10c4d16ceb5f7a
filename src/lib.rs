use anyhow::{Context, Result};
use clap::Parser;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod constants;
mod destructure;
mod diff;
mod extract;
mod gitdiff;
mod orphans;
mod output;
mod registry;
mod sanitize;

use constants::{ConstantTable, is_static_looking};
use destructure::{destructured_flag_names, extract_multiline_destructuring};
use diff::parse_diff;
use extract::{extract_from_chunk, extract_from_line, is_likely_flag_name};
use gitdiff::obtain_diff;
use orphans::find_orphaned;
use output::print_human_report;
use registry::load_registered_flags;
use sanitize::{mask_strings, strip_comments, strip_strings};

const SCANNABLE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];
const DEFAULT_SCAN_DIRS: &[&str] = &["app", "shared", "ui"];
const DEFAULT_REGISTRY_FILE: &str = "shared/feature-flags/registry.json";
const DEFAULT_REGISTRY_DIR: &str = "shared/feature-flags";

const FLAG_BAG_IDENT: &str = "remoteFeatureFlags";
const FLAG_BAG_GETTER: &str = "getRemoteFeatureFlags";
const FLAG_BAG_SELECTOR: &str = "selectRemoteFeatureFlags";

// How many lines a destructuring block may wrap before the backward scan gives up.
const DESTRUCTURE_LOOKBACK_LINES: usize = 10;

// Identifiers that match the flag-access patterns syntactically but are never
// real flag names (language builtins, prototype methods, generic field names).
const RESERVED_FLAG_NAMES: &[&str] = &[
    "constructor",
    "prototype",
    "hasOwnProperty",
    "toString",
    "valueOf",
    "toJSON",
    "keys",
    "values",
    "entries",
    "length",
    "name",
    "type",
    "status",
    "default",
    "then",
    "catch",
    "finally",
    "map",
    "filter",
    "reduce",
    "forEach",
    "find",
    "some",
    "every",
    "includes",
    "undefined",
    "bind",
    "call",
    "apply",
];

static BRACKET_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"\b(?:{bag}|{getter}\s*\([^)]*\))\??\.?\[\s*(?:'([^'\\]+)'|"([^"\\]+)"|`([^`\\]+)`)\s*\]"#,
        bag = FLAG_BAG_IDENT,
        getter = FLAG_BAG_GETTER,
    ))
    .unwrap()
});
static DOT_ACCESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(?:{bag}|{getter}\s*\([^)]*\))\??\.([A-Za-z_$][\w$]*)",
        bag = FLAG_BAG_IDENT,
        getter = FLAG_BAG_GETTER,
    ))
    .unwrap()
});
static BRACKET_CONSTANT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(?:{bag}|{getter}\s*\([^)]*\))\??\.?\[\s*([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)?)\s*\]",
        bag = FLAG_BAG_IDENT,
        getter = FLAG_BAG_GETTER,
    ))
    .unwrap()
});
static DESTRUCTURE_ASSIGN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\{{([^{{}}]*)\}}\s*=\s*(?:await\s+)?(?:[\w$]+\s*\(\s*)?(?:{getter}\s*\(|{selector}\b|{bag}\b)",
        bag = FLAG_BAG_IDENT,
        getter = FLAG_BAG_GETTER,
        selector = FLAG_BAG_SELECTOR,
    ))
    .unwrap()
});
static DESTRUCTURE_PROP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"{bag}\s*:\s*\{{([^{{}}]*)\}}", bag = FLAG_BAG_IDENT)).unwrap()
});
static BASE_REF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w./-]+$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatcherKind {
    BracketLiteral,
    DotAccess,
    BracketConstant,
    Destructure,
}

pub(crate) struct FlagMatcher {
    pub(crate) kind: MatcherKind,
    pub(crate) pattern: &'static Lazy<Regex>,
}

// Applied in sequence per line; the kind decides which derived line form the
// pattern runs against and how captures become candidate flag names.
pub(crate) static FLAG_MATCHERS: &[FlagMatcher] = &[
    FlagMatcher {
        kind: MatcherKind::BracketLiteral,
        pattern: &BRACKET_LITERAL_RE,
    },
    FlagMatcher {
        kind: MatcherKind::DotAccess,
        pattern: &DOT_ACCESS_RE,
    },
    FlagMatcher {
        kind: MatcherKind::BracketConstant,
        pattern: &BRACKET_CONSTANT_RE,
    },
    FlagMatcher {
        kind: MatcherKind::Destructure,
        pattern: &DESTRUCTURE_ASSIGN_RE,
    },
    FlagMatcher {
        kind: MatcherKind::Destructure,
        pattern: &DESTRUCTURE_PROP_RE,
    },
];

#[derive(Parser, Debug)]
#[command(name = "flagscan")]
#[command(about = "Check changed code for unregistered and orphaned feature flags")]
struct Cli {
    /// Repository root
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Base branch to diff against (tried as origin/<base>, then <base>)
    #[arg(long, env = "FLAGSCAN_BASE", default_value = "main")]
    base: String,

    /// Read the unified diff from this file instead of invoking git ("-" for stdin)
    #[arg(long = "diff-file")]
    diff_file: Option<String>,

    /// Registry JSON file holding the known flags
    #[arg(long, default_value = DEFAULT_REGISTRY_FILE)]
    registry: PathBuf,

    /// Directory holding the registry definition; excluded from scanning and orphan search
    #[arg(long = "registry-dir", default_value = DEFAULT_REGISTRY_DIR)]
    registry_dir: String,

    /// Constants config JSON (enum maps plus file-source descriptors)
    #[arg(long)]
    constants: Option<PathBuf>,

    /// Top-level directories to scan (repeatable or comma-separated)
    #[arg(long = "scan-dirs", value_delimiter = ',')]
    scan_dirs: Vec<String>,

    /// Emit JSON output
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FlagReference {
    pub(crate) flag_name: String,
    pub(crate) file_path: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct UnregisteredFlag {
    flag: String,
    files: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Report {
    root: String,
    summary: ReportSummary,
    warnings: Vec<String>,
    unregistered_flags: Vec<UnregisteredFlag>,
    orphaned_flags: Vec<String>,
}

impl Report {
    // Orphans warn only; unregistered flags fail the check.
    fn exit_code(&self) -> u8 {
        if self.unregistered_flags.is_empty() { 0 } else { 1 }
    }
}

#[derive(Debug, Serialize)]
struct ReportSummary {
    changed_files: usize,
    scanned_files: usize,
    flags_discovered: usize,
    registered_count: usize,
    unregistered_count: usize,
    orphaned_count: usize,
}

pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let root = fs::canonicalize(&cli.root)
        .with_context(|| format!("Failed to access root: {}", cli.root.display()))?;

    let scan_dirs: Vec<String> = if cli.scan_dirs.is_empty() {
        DEFAULT_SCAN_DIRS.iter().map(|dir| dir.to_string()).collect()
    } else {
        cli.scan_dirs
            .iter()
            .map(|dir| normalize_scan_dir(dir))
            .filter(|dir| !dir.is_empty())
            .collect()
    };

    let diff_text = obtain_diff(&root, &cli.base, cli.diff_file.as_deref(), &scan_dirs)?;
    let diff = parse_diff(&diff_text);

    let registry = load_registered_flags(&root.join(&cli.registry))?;
    let constants = match &cli.constants {
        Some(path) => ConstantTable::build(&root, &root.join(path))?,
        None => ConstantTable::default(),
    };

    let mut warnings = Vec::new();
    if diff_text.trim().is_empty() {
        warnings.push("Diff is empty; nothing to scan.".to_string());
    }
    if cli.constants.is_none() {
        warnings.push(
            "No constants config provided; bracket access through named constants may report as unresolved."
                .to_string(),
        );
    }

    let mut flag_files: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut scanned_files = 0usize;
    for (file, chunks) in &diff.added {
        if !is_scannable_file(file, &scan_dirs, &cli.registry_dir) {
            continue;
        }
        scanned_files += 1;

        for chunk in chunks {
            for reference in extract_from_chunk(chunk, file, &constants) {
                flag_files
                    .entry(reference.flag_name)
                    .or_default()
                    .insert(reference.file_path);
            }
        }
    }

    let unresolved_count = flag_files
        .keys()
        .filter(|flag| flag.starts_with("<unresolved constant:"))
        .count();
    if unresolved_count > 0 {
        warnings.push(format!(
            "{unresolved_count} constant expression(s) could not be resolved statically; add them to the constants config."
        ));
    }

    let mut removed_flags: BTreeSet<String> = BTreeSet::new();
    for (file, lines) in &diff.removed {
        if !is_scannable_file(file, &scan_dirs, &cli.registry_dir) {
            continue;
        }
        for line in lines {
            for reference in extract_from_line(line, file, false, &constants) {
                removed_flags.insert(reference.flag_name);
            }
        }
    }

    let (registered_count, unregistered_flags) = partition_flags(&flag_files, &registry);

    let orphan_candidates: BTreeSet<String> = removed_flags
        .iter()
        .filter(|flag| registry.contains(*flag) && !flag_files.contains_key(*flag))
        .cloned()
        .collect();
    let orphaned_flags = find_orphaned(&root, &orphan_candidates, &scan_dirs, &cli.registry_dir);

    let report = Report {
        root: root.display().to_string(),
        summary: ReportSummary {
            changed_files: diff.added.len(),
            scanned_files,
            flags_discovered: flag_files.len(),
            registered_count,
            unregistered_count: unregistered_flags.len(),
            orphaned_count: orphaned_flags.len(),
        },
        warnings,
        unregistered_flags,
        orphaned_flags,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_human_report(&report);
    }

    Ok(ExitCode::from(report.exit_code()))
}

fn partition_flags(
    flag_files: &BTreeMap<String, BTreeSet<String>>,
    registry: &BTreeSet<String>,
) -> (usize, Vec<UnregisteredFlag>) {
    let mut registered_count = 0usize;
    let mut unregistered = Vec::new();

    for (flag, files) in flag_files {
        if registry.contains(flag) {
            registered_count += 1;
        } else {
            unregistered.push(UnregisteredFlag {
                flag: flag.clone(),
                files: files.iter().cloned().collect(),
            });
        }
    }

    (registered_count, unregistered)
}

fn is_scannable_file(path: &str, scan_dirs: &[String], registry_dir: &str) -> bool {
    let normalized = path.replace('\\', "/");

    if normalized == registry_dir || normalized.starts_with(&format!("{registry_dir}/")) {
        return false;
    }

    let has_scannable_extension = Path::new(&normalized)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SCANNABLE_EXTENSIONS.contains(&ext))
        .unwrap_or(false);
    if !has_scannable_extension {
        return false;
    }

    scan_dirs
        .iter()
        .any(|dir| normalized == *dir || normalized.starts_with(&format!("{dir}/")))
}

fn normalize_scan_dir(value: &str) -> String {
    value
        .trim()
        .replace('\\', "/")
        .trim_start_matches("./")
        .trim_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn partition_puts_every_flag_in_exactly_one_bucket() {
        let mut flag_files = BTreeMap::new();
        flag_files.insert("knownFlag".to_string(), files(&["app/a.ts"]));
        flag_files.insert("newFlag".to_string(), files(&["app/b.ts", "app/a.ts"]));
        flag_files.insert("otherFlag".to_string(), files(&["ui/c.tsx"]));
        let registry: BTreeSet<String> = ["knownFlag".to_string()].into_iter().collect();

        let (registered, unregistered) = partition_flags(&flag_files, &registry);

        assert_eq!(registered + unregistered.len(), flag_files.len());
        assert_eq!(registered, 1);
        assert_eq!(
            unregistered,
            vec![
                UnregisteredFlag {
                    flag: "newFlag".to_string(),
                    files: vec!["app/a.ts".to_string(), "app/b.ts".to_string()],
                },
                UnregisteredFlag {
                    flag: "otherFlag".to_string(),
                    files: vec!["ui/c.tsx".to_string()],
                },
            ]
        );
    }

    #[test]
    fn partition_sorts_unregistered_by_flag_name() {
        let mut flag_files = BTreeMap::new();
        flag_files.insert("zebraFlag".to_string(), files(&["app/z.ts"]));
        flag_files.insert("alphaFlag".to_string(), files(&["app/a.ts"]));
        let registry = BTreeSet::new();

        let (_, unregistered) = partition_flags(&flag_files, &registry);
        let names: Vec<&str> = unregistered.iter().map(|u| u.flag.as_str()).collect();
        assert_eq!(names, vec!["alphaFlag", "zebraFlag"]);
    }

    #[test]
    fn scannable_gate_checks_prefix_extension_and_registry_dir() {
        let dirs: Vec<String> = vec!["app".to_string(), "ui".to_string()];

        assert!(is_scannable_file(
            "app/components/toggle.tsx",
            &dirs,
            "shared/feature-flags"
        ));
        assert!(is_scannable_file("ui/pages/home.js", &dirs, "shared/feature-flags"));
        // Wrong top-level directory.
        assert!(!is_scannable_file("scripts/build.ts", &dirs, "shared/feature-flags"));
        // Non-scannable extension.
        assert!(!is_scannable_file("app/styles/main.css", &dirs, "shared/feature-flags"));
        assert!(!is_scannable_file("app/README.md", &dirs, "shared/feature-flags"));
        // Registry's own files never participate.
        assert!(!is_scannable_file("app/flags/registry.ts", &dirs, "app/flags"));
    }

    #[test]
    fn scannable_gate_does_not_match_directory_name_prefixes() {
        let dirs: Vec<String> = vec!["app".to_string()];
        assert!(!is_scannable_file("apple/juice.ts", &dirs, "shared/feature-flags"));
    }

    fn report_with(unregistered: Vec<UnregisteredFlag>, orphaned: Vec<String>) -> Report {
        Report {
            root: ".".to_string(),
            summary: ReportSummary {
                changed_files: 1,
                scanned_files: 1,
                flags_discovered: unregistered.len(),
                registered_count: 0,
                unregistered_count: unregistered.len(),
                orphaned_count: orphaned.len(),
            },
            warnings: Vec::new(),
            unregistered_flags: unregistered,
            orphaned_flags: orphaned,
        }
    }

    #[test]
    fn exit_code_scenario_known_and_new_flag() {
        let mut flag_files = BTreeMap::new();
        flag_files.insert("knownFlag".to_string(), files(&["app/a.ts"]));
        flag_files.insert("newFlag".to_string(), files(&["app/a.ts"]));
        let registry: BTreeSet<String> = ["knownFlag".to_string()].into_iter().collect();

        let (registered, unregistered) = partition_flags(&flag_files, &registry);
        assert_eq!(registered, 1);
        assert_eq!(unregistered.len(), 1);
        assert_eq!(unregistered[0].flag, "newFlag");
        assert_eq!(report_with(unregistered, Vec::new()).exit_code(), 1);
    }

    #[test]
    fn unregistered_flags_fail_the_check() {
        let report = report_with(
            vec![UnregisteredFlag {
                flag: "newFlag".to_string(),
                files: vec!["app/a.ts".to_string()],
            }],
            Vec::new(),
        );
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn orphans_alone_never_affect_the_exit_code() {
        let report = report_with(Vec::new(), vec!["retiredFlag".to_string()]);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn normalize_scan_dir_trims_slashes_and_dot_prefix() {
        assert_eq!(normalize_scan_dir("./app/"), "app");
        assert_eq!(normalize_scan_dir(" ui "), "ui");
        assert_eq!(normalize_scan_dir("shared\\lib"), "shared/lib");
    }
}
