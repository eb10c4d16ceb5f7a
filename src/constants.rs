use super::*;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct ConstantsConfig {
    // Enum-like maps, expanded into `EnumName.Member -> value` entries.
    #[serde(default)]
    enums: BTreeMap<String, BTreeMap<String, String>>,
    // Constants whose defining module cannot be imported in the check
    // environment; their value is read out of the source file as text.
    #[serde(default, rename = "fileSources")]
    file_sources: Vec<FileSource>,
}

#[derive(Debug, Deserialize)]
struct FileSource {
    key: String,
    file: String,
    #[serde(rename = "exportName")]
    export_name: String,
}

// Lookup from constant expressions (`FeatureFlagNames.Foo`, `SOME_CONST`) to
// the flag-name strings they stand for. Built once per run.
#[derive(Debug, Default)]
pub(crate) struct ConstantTable {
    map: HashMap<String, String>,
}

impl ConstantTable {
    pub(crate) fn build(root: &Path, config_path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read constants config: {}", config_path.display()))?;
        let config: ConstantsConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse constants config: {}", config_path.display()))?;

        let mut map = HashMap::new();
        for (enum_name, members) in &config.enums {
            for (member, value) in members {
                map.insert(format!("{enum_name}.{member}"), value.clone());
            }
        }

        // A file that is missing or no longer matches the expected export
        // pattern simply leaves its constant unmapped for this run.
        for source in &config.file_sources {
            if let Some(value) = read_exported_literal(&root.join(&source.file), &source.export_name)
            {
                map.insert(source.key.clone(), value);
            }
        }

        Ok(ConstantTable { map })
    }

    pub(crate) fn from_map(map: HashMap<String, String>) -> Self {
        ConstantTable { map }
    }

    pub(crate) fn resolve(&self, expression: &str) -> Option<&str> {
        self.map.get(expression).map(|value| value.as_str())
    }
}

// A bare identifier starting uppercase, or exactly `Upper.Upper`, reads as a
// compile-time constant rather than a runtime key.
pub(crate) fn is_static_looking(expression: &str) -> bool {
    match expression.split_once('.') {
        Some((left, right)) => {
            !right.contains('.') && starts_uppercase(left) && starts_uppercase(right)
        }
        None => starts_uppercase(expression),
    }
}

fn starts_uppercase(part: &str) -> bool {
    part.chars()
        .next()
        .map(|c| c.is_ascii_uppercase())
        .unwrap_or(false)
}

// Reads `export const NAME[: type] = <literal>` out of a source file, trying
// single-quoted, double-quoted, then backtick-delimited forms in that order.
fn read_exported_literal(path: &Path, export_name: &str) -> Option<String> {
    let source = fs::read_to_string(path).ok()?;
    let name = regex::escape(export_name);

    for (quote, interior) in [('\'', "[^']*"), ('"', "[^\"]*"), ('`', "[^`]*")] {
        let pattern =
            format!(r"export\s+const\s+{name}(?:\s*:[^=\n]*)?\s*=\s*{quote}({interior}){quote}");
        let re = Regex::new(&pattern).ok()?;
        if let Some(caps) = re.captures(&source) {
            return caps.get(1).map(|m| m.as_str().to_string());
        }
    }

    None
}
