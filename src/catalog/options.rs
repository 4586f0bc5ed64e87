use serde::{Deserialize, Serialize};

/// Per-file parse options, as listed in the source catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseOptions {
    /// Field delimiter.
    pub separator: char,
    /// Decimal mark used by numeric cells.
    pub decimal: char,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            separator: '\t',
            decimal: ',',
        }
    }
}

impl ParseOptions {
    pub fn with_separator(separator: char) -> Self {
        Self {
            separator,
            ..Self::default()
        }
    }
}
