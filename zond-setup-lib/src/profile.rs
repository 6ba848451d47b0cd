//! Guarded edits to the user's shell profile

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Append each line that the profile does not already contain.
///
/// Returns the lines actually written; an empty result means the profile was
/// already up to date. A missing profile is created.
pub fn append_missing_lines(profile: &Path, lines: &[String]) -> Result<Vec<String>> {
    let existing = match fs::read_to_string(profile) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", profile.display()));
        }
    };

    let mut missing: Vec<String> = Vec::new();
    for line in lines {
        if !existing.contains(line.as_str()) && !missing.contains(line) {
            missing.push(line.clone());
        }
    }

    if missing.is_empty() {
        return Ok(missing);
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(profile)
        .with_context(|| format!("Failed to open {}", profile.display()))?;

    let mut block = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        block.push('\n');
    }
    for line in &missing {
        block.push_str(line);
        block.push('\n');
    }

    file.write_all(block.as_bytes())
        .with_context(|| format!("Failed to append to {}", profile.display()))?;

    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> Vec<String> {
        vec![
            "export GOPATH=\"$HOME/go\"".to_string(),
            "export PATH=\"$PATH:$GOPATH/bin\"".to_string(),
        ]
    }

    #[test]
    fn test_append_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let profile = dir.path().join(".bashrc");
        fs::write(&profile, "alias ll='ls -l'").unwrap();

        let first = append_missing_lines(&profile, &lines()).unwrap();
        assert_eq!(first.len(), 2);

        let second = append_missing_lines(&profile, &lines()).unwrap();
        assert!(second.is_empty());

        let content = fs::read_to_string(&profile).unwrap();
        for line in lines() {
            assert_eq!(content.matches(line.as_str()).count(), 1);
        }
        assert!(content.starts_with("alias ll='ls -l'\n"));
    }

    #[test]
    fn test_only_missing_line_is_added() {
        let dir = tempfile::tempdir().unwrap();
        let profile = dir.path().join(".bashrc");
        fs::write(&profile, "export GOPATH=\"$HOME/go\"\n").unwrap();

        let written = append_missing_lines(&profile, &lines()).unwrap();
        assert_eq!(written, vec!["export PATH=\"$PATH:$GOPATH/bin\"".to_string()]);
    }

    #[test]
    fn test_missing_profile_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let profile = dir.path().join(".profile");

        append_missing_lines(&profile, &lines()).unwrap();
        assert_eq!(
            fs::read_to_string(&profile).unwrap(),
            "export GOPATH=\"$HOME/go\"\nexport PATH=\"$PATH:$GOPATH/bin\"\n"
        );
    }
}
