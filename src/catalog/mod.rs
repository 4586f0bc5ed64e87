// src/catalog/mod.rs
//! Static description of which (source, year) extracts exist and how to parse them.
mod options;

pub use options::ParseOptions;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, fs, path::Path};
use tracing::debug;

/// Grid operators publishing yearly connection extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dso {
    #[serde(rename = "enexis")]
    Enexis,
    #[serde(rename = "liander")]
    Liander,
    #[serde(rename = "stedin")]
    Stedin,
    #[serde(rename = "westland-infra")]
    Westland,
}

impl Dso {
    pub const ALL: [Dso; 4] = [Dso::Enexis, Dso::Liander, Dso::Stedin, Dso::Westland];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dso::Enexis => "enexis",
            Dso::Liander => "liander",
            Dso::Stedin => "stedin",
            Dso::Westland => "westland-infra",
        }
    }

    /// Position in [`Dso::ALL`]; used to pick a stable chart colour.
    pub fn index(&self) -> usize {
        Dso::ALL.iter().position(|d| d == self).unwrap_or(0)
    }
}

impl fmt::Display for Dso {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One independent unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobUnit {
    pub source: Dso,
    pub year: i32,
    pub options: ParseOptions,
}

/// Mapping `source → year → parse options`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceCatalog {
    entries: BTreeMap<Dso, BTreeMap<i32, ParseOptions>>,
}

impl SourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used by tests and the built-in catalog.
    pub fn with_year(mut self, source: Dso, year: i32, options: ParseOptions) -> Self {
        self.insert(source, year, options);
        self
    }

    pub fn insert(&mut self, source: Dso, year: i32, options: ParseOptions) {
        self.entries.entry(source).or_default().insert(year, options);
    }

    /// Load a catalog from YAML of the shape `{ liander: { 2010: { separator: ";" } } }`.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading source catalog {}", path.display()))?;
        let catalog: SourceCatalog = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing source catalog {}", path.display()))?;
        debug!(path = %path.display(), jobs = catalog.len(), "loaded source catalog");
        Ok(catalog)
    }

    pub fn sources(&self) -> impl Iterator<Item = Dso> + '_ {
        self.entries.keys().copied()
    }

    /// Number of (source, year) pairs.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into job units, grouped by source and ascending by year.
    pub fn jobs(&self) -> Vec<JobUnit> {
        self.entries
            .iter()
            .flat_map(|(source, years)| {
                years.iter().map(move |(year, options)| JobUnit {
                    source: *source,
                    year: *year,
                    options: options.clone(),
                })
            })
            .collect()
    }

    /// The extracts published up to and including 2025.
    pub fn builtin() -> Self {
        let semicolon = ParseOptions::with_separator(';');
        let mut catalog = SourceCatalog::new();
        for year in 2009..=2024 {
            let options = if year == 2010 || year == 2024 {
                semicolon.clone()
            } else {
                ParseOptions::default()
            };
            catalog.insert(Dso::Liander, year, options);
        }
        for year in 2009..=2025 {
            catalog.insert(Dso::Stedin, year, ParseOptions::default());
        }
        for year in 2010..=2025 {
            catalog.insert(Dso::Enexis, year, semicolon.clone());
        }
        for year in 2011..=2024 {
            catalog.insert(Dso::Westland, year, ParseOptions::default());
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn builtin_catalog_shape() {
        let catalog = SourceCatalog::builtin();
        assert_eq!(catalog.len(), 16 + 17 + 16 + 14);
        let jobs = catalog.jobs();
        let liander_2010 = jobs
            .iter()
            .find(|j| j.source == Dso::Liander && j.year == 2010)
            .unwrap();
        assert_eq!(liander_2010.options.separator, ';');
        let liander_2011 = jobs
            .iter()
            .find(|j| j.source == Dso::Liander && j.year == 2011)
            .unwrap();
        assert_eq!(liander_2011.options.separator, '\t');
        assert!(jobs
            .iter()
            .filter(|j| j.source == Dso::Enexis)
            .all(|j| j.options.separator == ';'));
    }

    #[test]
    fn jobs_flatten_one_per_pair() {
        let catalog = SourceCatalog::new()
            .with_year(Dso::Stedin, 2021, ParseOptions::default())
            .with_year(Dso::Stedin, 2020, ParseOptions::default())
            .with_year(Dso::Enexis, 2020, ParseOptions::with_separator(';'));
        let pairs: Vec<(Dso, i32)> = catalog.jobs().iter().map(|j| (j.source, j.year)).collect();
        assert_eq!(
            pairs,
            vec![(Dso::Enexis, 2020), (Dso::Stedin, 2020), (Dso::Stedin, 2021)]
        );
    }

    #[test]
    fn loads_catalog_from_yaml() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        write!(
            tmp,
            "liander:\n  2009: {{}}\n  2010:\n    separator: \";\"\nwestland-infra:\n  2011:\n    decimal: \".\"\n"
        )?;
        let catalog = SourceCatalog::from_yaml_file(tmp.path())?;
        let jobs = catalog.jobs();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].options, ParseOptions::default());
        assert_eq!(jobs[1].options.separator, ';');
        assert_eq!(jobs[2].source, Dso::Westland);
        assert_eq!(jobs[2].options.decimal, '.');
        assert_eq!(jobs[2].options.separator, '\t');
        Ok(())
    }

    #[test]
    fn rejects_unknown_source() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        write!(tmp, "nowhere:\n  2009: {{}}\n")?;
        assert!(SourceCatalog::from_yaml_file(tmp.path()).is_err());
        Ok(())
    }
}
