use super::*;
use std::io::Read;
use std::process::Command;

// Rejects base refs that could smuggle arguments into the git invocation.
pub(crate) fn validate_base_ref(base: &str) -> Result<()> {
    if !BASE_REF_RE.is_match(base) {
        anyhow::bail!("Invalid base ref '{base}': only [A-Za-z0-9_./-] characters are allowed");
    }
    Ok(())
}

// Diff text comes from a file, from stdin (`-`), or from git against the base
// branch, trying the remote spelling first.
pub(crate) fn obtain_diff(
    root: &Path,
    base: &str,
    diff_file: Option<&str>,
    scan_dirs: &[String],
) -> Result<String> {
    if let Some(source) = diff_file {
        if source == "-" {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read diff from stdin")?;
            return Ok(text);
        }
        return fs::read_to_string(source)
            .with_context(|| format!("Failed to read diff file: {source}"));
    }

    validate_base_ref(base)?;

    let mut last_failure = String::new();
    for refspec in [format!("origin/{base}"), base.to_string()] {
        let mut command = Command::new("git");
        command
            .arg("diff")
            .arg(format!("{refspec}...HEAD"))
            .arg("--")
            .args(scan_dirs)
            .current_dir(root);

        match command.output() {
            Ok(output) if output.status.success() => {
                return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
            }
            Ok(output) => {
                last_failure = String::from_utf8_lossy(&output.stderr).trim().to_string();
            }
            Err(err) => last_failure = err.to_string(),
        }
    }

    anyhow::bail!(
        "Unable to obtain a diff against '{base}' (tried origin/{base} and {base}): {last_failure}"
    )
}
