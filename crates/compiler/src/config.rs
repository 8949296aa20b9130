//! Interpreter configuration
//!
//! An optional `ant.toml` next to the working directory supplies defaults
//! for the dump and pause flags; command-line flags merge on top and win.

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct AntConfig {
    /// Dump the parse tree of each compiled file
    pub print_tree: bool,
    /// Dump the generated bytecode after all files are compiled
    pub print_code: bool,
    /// Wait for Enter before exiting
    pub pause: bool,
}

impl AntConfig {
    pub fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Load configuration. An explicit path must exist; without one,
    /// `ant.toml` is used when present and defaults apply otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = Path::new("ant.toml");
                if !default.exists() {
                    return Ok(AntConfig::default());
                }
                default.to_path_buf()
            }
        };
        let text = std::fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        Self::from_toml(&text).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
    }

    /// Merge command-line flags; a set flag always wins over the file.
    pub fn merge_flags(&mut self, print_tree: bool, print_code: bool, pause: bool) {
        self.print_tree |= print_tree;
        self.print_code |= print_code;
        self.pause |= pause;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_off() {
        let config = AntConfig::default();
        assert!(!config.print_tree);
        assert!(!config.print_code);
        assert!(!config.pause);
    }

    #[test]
    fn test_from_toml() {
        let config = AntConfig::from_toml("print-tree = true\npause = true\n").unwrap();
        assert!(config.print_tree);
        assert!(!config.print_code);
        assert!(config.pause);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(AntConfig::from_toml("print-trees = true\n").is_err());
    }

    #[test]
    fn test_merge_flags_wins() {
        let mut config = AntConfig::from_toml("print-code = true\n").unwrap();
        config.merge_flags(true, false, false);
        assert!(config.print_tree);
        assert!(config.print_code);
        assert!(!config.pause);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AntConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ant.toml");
        std::fs::write(&path, "print-code = true\n").unwrap();
        let config = AntConfig::load(Some(&path)).unwrap();
        assert!(config.print_code);
    }
}
