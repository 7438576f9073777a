//! Rules file: one `[[rule]]` table per set of watched patterns.

use std::path::Path;

use eyre::{Result, WrapErr};
use serde::Deserialize;

/// A single `[[rule]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub patterns: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<Vec<String>>,
    #[serde(default = "default_executor")]
    pub executor: String,
    pub actions: Vec<String>,
}

fn default_executor() -> String {
    "shell".to_string()
}

impl Rule {
    /// Whether this rule fires for an event carrying the given tags (e.g.
    /// `"create"`, `"file"`). An empty condition list always matches;
    /// otherwise every inner OR-group needs at least one matching tag.
    pub fn matches(&self, tags: &[&str]) -> bool {
        self.conditions
            .iter()
            .all(|group| group.iter().any(|tag| tags.contains(&tag.as_str())))
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RulesFile {
    #[serde(rename = "rule", default)]
    pub rules: Vec<Rule>,
}

impl RulesFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read rules file {}", path.display()))?;

        let file: RulesFile = toml::from_str(&contents)
            .wrap_err_with(|| format!("failed to parse rules file {}", path.display()))?;

        for rule in &file.rules {
            if rule.patterns.is_empty() {
                eyre::bail!("a rule in {} has no patterns", path.display());
            }
            if rule.executor != "shell" {
                eyre::bail!(
                    "rule in {} names unknown executor {:?}",
                    path.display(),
                    rule.executor
                );
            }
        }

        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_conditions_always_match() {
        let rule = Rule {
            patterns: vec!["*.rs".into()],
            conditions: vec![],
            executor: "shell".into(),
            actions: vec!["true".into()],
        };
        assert!(rule.matches(&["create", "file"]));
        assert!(rule.matches(&[]));
    }

    #[test]
    fn every_or_group_needs_a_match() {
        let rule = Rule {
            patterns: vec!["*.rs".into()],
            conditions: vec![vec!["create".into(), "update".into()], vec!["file".into()]],
            executor: "shell".into(),
            actions: vec!["true".into()],
        };
        assert!(rule.matches(&["create", "file"]));
        assert!(rule.matches(&["update", "file"]));
        assert!(!rule.matches(&["remove", "file"]));
        assert!(!rule.matches(&["create", "folder"]));
    }

    #[test]
    fn parses_a_minimal_rules_file() {
        let toml = r#"
            [[rule]]
            patterns = ["src/**/*.rs"]
            actions = ["cargo check"]
        "#;
        let file: RulesFile = toml::from_str(toml).unwrap();
        assert_eq!(file.rules.len(), 1);
        assert_eq!(file.rules[0].executor, "shell");
        assert!(file.rules[0].conditions.is_empty());
    }

    #[test]
    fn rejects_a_rule_with_no_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(&path, "[[rule]]\npatterns = []\nactions = [\"true\"]\n").unwrap();
        assert!(RulesFile::load(&path).is_err());
    }
}
