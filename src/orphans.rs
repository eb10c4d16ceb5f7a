use super::*;
use walkdir::WalkDir;

// A candidate is orphaned when no reference to it remains anywhere under the
// scan directories outside the registry definition. Unreadable files count as
// no match.
pub(crate) fn find_orphaned(
    root: &Path,
    candidates: &BTreeSet<String>,
    scan_dirs: &[String],
    registry_dir: &str,
) -> Vec<String> {
    let mut orphaned = Vec::new();

    for flag in candidates {
        // Names with search metacharacters cannot be grepped for.
        if !flag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            continue;
        }
        if !flag_referenced_outside_registry(root, flag, scan_dirs, registry_dir) {
            orphaned.push(flag.clone());
        }
    }

    orphaned.sort();
    orphaned
}

fn flag_referenced_outside_registry(
    root: &Path,
    flag: &str,
    scan_dirs: &[String],
    registry_dir: &str,
) -> bool {
    let Ok(pattern) = Regex::new(&format!(r"\b{}\b", regex::escape(flag))) else {
        return false;
    };

    for dir in scan_dirs {
        let base = root.join(dir);
        if !base.exists() {
            continue;
        }

        for entry in WalkDir::new(&base)
            .into_iter()
            .filter_entry(|e| !is_ignored_dir(e.path()))
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let rel = path.strip_prefix(root).unwrap_or(path);
            let rel_norm = rel.to_string_lossy().replace('\\', "/");
            if rel_norm == registry_dir || rel_norm.starts_with(&format!("{registry_dir}/")) {
                continue;
            }

            let source = fs::read_to_string(path).unwrap_or_default();
            if pattern.is_match(&source) {
                return true;
            }
        }
    }

    false
}

pub(crate) fn is_ignored_dir(path: &Path) -> bool {
    let ignored = [
        "node_modules",
        ".git",
        "dist",
        "build",
        "coverage",
        "target",
        ".next",
        "out",
    ];

    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| ignored.contains(&name))
        .unwrap_or(false)
}
