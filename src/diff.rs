use super::*;

// Added lines keep their chunk structure (maximal runs of contiguous `+`
// lines): only physically adjacent lines may later be joined when
// reconstructing wrapped expressions. Every touched file is keyed in both maps.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct DiffResult {
    pub(crate) added: BTreeMap<String, Vec<Vec<String>>>,
    pub(crate) removed: BTreeMap<String, Vec<String>>,
}

pub(crate) fn parse_diff(text: &str) -> DiffResult {
    let mut result = DiffResult::default();
    let mut current_file: Option<String> = None;
    let mut pending_removed_file: Option<String> = None;
    let mut last_was_added = false;

    for line in text.lines() {
        if let Some(path) = line.strip_prefix("+++ b/") {
            let path = path.trim_end().to_string();
            result.added.entry(path.clone()).or_default();
            result.removed.entry(path.clone()).or_default();
            current_file = Some(path);
            last_was_added = false;
            continue;
        }

        if line.starts_with("+++ /dev/null") {
            // Deleted file: only the old path exists.
            if let Some(path) = pending_removed_file.take() {
                result.added.entry(path.clone()).or_default();
                result.removed.entry(path.clone()).or_default();
                current_file = Some(path);
            } else {
                current_file = None;
            }
            last_was_added = false;
            continue;
        }

        if let Some(path) = line.strip_prefix("--- a/") {
            pending_removed_file = Some(path.trim_end().to_string());
            last_was_added = false;
            continue;
        }

        if line.starts_with("--- ") {
            // e.g. `--- /dev/null` for newly created files.
            pending_removed_file = None;
            last_was_added = false;
            continue;
        }

        if let Some(content) = line.strip_prefix('+') {
            if let Some(file) = &current_file {
                let chunks = result.added.entry(file.clone()).or_default();
                if !last_was_added || chunks.is_empty() {
                    chunks.push(Vec::new());
                }
                if let Some(chunk) = chunks.last_mut() {
                    chunk.push(content.to_string());
                }
                last_was_added = true;
            }
            continue;
        }

        if let Some(content) = line.strip_prefix('-') {
            if let Some(file) = &current_file {
                result
                    .removed
                    .entry(file.clone())
                    .or_default()
                    .push(content.to_string());
            }
            last_was_added = false;
            continue;
        }

        // Context lines and hunk headers break chunk contiguity.
        last_was_added = false;
    }

    result
}
