use super::*;

// The registry file is either a JSON object keyed by flag name (entry bodies
// are ignored here) or a plain array of names.
pub(crate) fn load_registered_flags(path: &Path) -> Result<BTreeSet<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read flag registry: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse flag registry: {}", path.display()))?;

    let mut names = BTreeSet::new();
    match value {
        serde_json::Value::Object(map) => {
            for key in map.keys() {
                names.insert(key.clone());
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                if let Some(name) = item.as_str() {
                    names.insert(name.to_string());
                }
            }
        }
        _ => anyhow::bail!(
            "Flag registry must be a JSON object or array: {}",
            path.display()
        ),
    }

    Ok(names)
}
