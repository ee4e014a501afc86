//! F&O reference universe.
//!
//! Membership is a labelling concern only; it never gates the Trend
//! Template. The set is built from configuration so it can be refreshed
//! without a rebuild.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use momentum_common::config::ReferenceConfig;

/// Set of F&O-eligible exchange symbols.
#[derive(Debug, Clone, Default)]
pub struct FnoUniverse {
    symbols: HashSet<String>,
}

impl FnoUniverse {
    /// Build from any list of symbols. Entries are trimmed and upper-cased.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = symbols
            .into_iter()
            .map(|s| s.as_ref().trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { symbols }
    }

    /// Build from configuration. A configured file replaces the inline list.
    pub fn from_config(config: &ReferenceConfig) -> Result<Self> {
        let universe = match &config.fno_symbols_file {
            Some(path) => {
                let expanded = shellexpand::tilde(path);
                Self::load_file(Path::new(expanded.as_ref()))?
            }
            None => Self::new(&config.fno_symbols),
        };

        info!(symbols = universe.len(), "Loaded F&O universe");
        Ok(universe)
    }

    /// Load a newline-separated list. Blank lines and `#` comments are ignored.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read F&O list from {}", path.display()))?;

        Ok(Self::new(
            content
                .lines()
                .map(|l| l.split('#').next().unwrap_or(""))
                .filter(|l| !l.trim().is_empty()),
        ))
    }

    /// Whether `symbol` is F&O-eligible. Screener symbols use `_` where the
    /// exchange list uses `-`, so both spellings match.
    pub fn contains(&self, symbol: &str) -> bool {
        let upper = symbol.to_uppercase();
        self.symbols.contains(&upper) || self.symbols.contains(&upper.replace('_', "-"))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_normalises_case_and_dash() {
        let universe = FnoUniverse::new(["reliance", "BAJAJ-AUTO", " TCS "]);
        assert!(universe.contains("RELIANCE"));
        assert!(universe.contains("BAJAJ_AUTO"));
        assert!(universe.contains("tcs"));
        assert!(!universe.contains("ZOMATO"));
        assert_eq!(universe.len(), 3);
    }

    #[test]
    fn test_default_config_list() {
        let universe = FnoUniverse::from_config(&ReferenceConfig::default()).unwrap();
        assert!(universe.contains("HDFCBANK"));
        assert!(universe.contains("M&M"));
    }

    #[test]
    fn test_file_replaces_inline_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fno.txt");
        std::fs::write(&path, "# refreshed monthly\nINFY\n\nWIPRO # IT\n").unwrap();

        let config = ReferenceConfig {
            fno_symbols: vec!["RELIANCE".into()],
            fno_symbols_file: Some(path.to_string_lossy().into_owned()),
        };
        let universe = FnoUniverse::from_config(&config).unwrap();
        assert_eq!(universe.len(), 2);
        assert!(universe.contains("WIPRO"));
        assert!(!universe.contains("RELIANCE"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let config = ReferenceConfig {
            fno_symbols: vec![],
            fno_symbols_file: Some("/nonexistent/fno.txt".into()),
        };
        assert!(FnoUniverse::from_config(&config).is_err());
    }
}
