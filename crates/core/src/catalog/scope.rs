//! Named groupings of tools.

use serde::{Deserialize, Serialize};

/// A named grouping of tool names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scope {
    /// Human-readable purpose of the scope.
    #[serde(default)]
    pub description: String,
    /// Member tool names, in install order.
    #[serde(default)]
    pub tools: Vec<String>,
    /// When set, an overriding layer replaces the scope instead of extending it.
    #[serde(default)]
    pub replace: bool,
}

impl Scope {
    /// Combine `overlay` onto `self`.
    ///
    /// `replace = true` on the overlay discards the base; otherwise the tool
    /// lists are unioned in order without duplicates and a non-empty overlay
    /// description wins.
    #[must_use]
    pub fn merged_with(&self, overlay: &Self) -> Self {
        if overlay.replace {
            return overlay.clone();
        }
        let mut tools = self.tools.clone();
        for tool in &overlay.tools {
            if !tools.contains(tool) {
                tools.push(tool.clone());
            }
        }
        let description = if overlay.description.trim().is_empty() {
            self.description.clone()
        } else {
            overlay.description.clone()
        };
        Self {
            description,
            tools,
            replace: self.replace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(description: &str, tools: &[&str], replace: bool) -> Scope {
        Scope {
            description: description.into(),
            tools: tools.iter().map(|t| (*t).to_string()).collect(),
            replace,
        }
    }

    #[test]
    fn test_additive_merge() {
        let base = scope("Linters", &["shellcheck", "hadolint"], false);
        let overlay = scope("", &["hadolint", "yamllint"], false);
        let merged = base.merged_with(&overlay);
        assert_eq!(merged.tools, vec!["shellcheck", "hadolint", "yamllint"]);
        assert_eq!(merged.description, "Linters");
    }

    #[test]
    fn test_replace_merge() {
        let base = scope("Linters", &["shellcheck", "hadolint"], false);
        let overlay = scope("Only yaml", &["yamllint"], true);
        let merged = base.merged_with(&overlay);
        assert_eq!(merged.tools, vec!["yamllint"]);
        assert_eq!(merged.description, "Only yaml");
    }
}
