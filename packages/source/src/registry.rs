//! Source registry built from the publisher's metadata files.
//!
//! `URL_Instructions.txt` supplies the URL templates and filename pattern
//! for each report; `URL_Lookup.txt` enriches those rows with category,
//! update frequency, and description. Both are baked into the binary via
//! [`include_str!`], and can be swapped for files on disk at runtime.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use grid_ingest_source_models::SourceConfig;
use serde::Deserialize;

use crate::SourceError;

/// Instruction file embedded at compile time.
const EMBEDDED_INSTRUCTIONS: &str = include_str!("../metadata/URL_Instructions.txt");

/// Lookup file embedded at compile time.
const EMBEDDED_LOOKUP: &str = include_str!("../metadata/URL_Lookup.txt");

#[derive(Debug, Deserialize)]
struct InstructionRow {
    #[serde(rename = "Data Type")]
    data_type: String,
    #[serde(rename = "Report Code")]
    report_code: String,
    #[serde(rename = "Dataset Name")]
    dataset_name: String,
    #[serde(rename = "Filename Pattern")]
    filename_pattern: String,
    #[serde(rename = "Direct CSV URL")]
    direct_url: String,
    #[serde(rename = "Archive ZIP URL", default)]
    archive_url: String,
}

#[derive(Debug, Deserialize)]
struct LookupRow {
    #[serde(rename = "Report Code")]
    report_code: String,
    #[serde(rename = "Category", default)]
    category: Option<String>,
    #[serde(rename = "Update Frequency", default)]
    update_frequency: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
}

/// All known report sources, in instruction-file order.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    configs: Vec<SourceConfig>,
    by_code: BTreeMap<String, usize>,
}

impl SourceRegistry {
    /// Loads the metadata files embedded in the binary.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Configuration`] if either embedded file is
    /// malformed.
    pub fn embedded() -> Result<Self, SourceError> {
        Self::from_readers(EMBEDDED_INSTRUCTIONS.as_bytes(), EMBEDDED_LOOKUP.as_bytes())
    }

    /// Loads the metadata files from disk.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Configuration`] if either file is missing,
    /// unreadable, or malformed.
    pub fn from_paths(instructions: &Path, lookup: &Path) -> Result<Self, SourceError> {
        let open = |path: &Path| {
            std::fs::File::open(path).map_err(|e| SourceError::Configuration {
                message: format!("cannot open {}: {e}", path.display()),
            })
        };

        Self::from_readers(open(instructions)?, open(lookup)?)
    }

    /// Loads and joins the two metadata files from arbitrary readers.
    ///
    /// Lookup rows whose report code has no instruction row are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Configuration`] if either file cannot be
    /// parsed or lacks a required column.
    pub fn from_readers(instructions: impl Read, lookup: impl Read) -> Result<Self, SourceError> {
        let mut registry = Self::default();

        for row in read_rows::<InstructionRow>(instructions, "instructions")? {
            registry.insert(SourceConfig {
                data_type: row.data_type,
                report_code: row.report_code.trim().to_string(),
                dataset_name: row.dataset_name,
                filename_pattern: row.filename_pattern,
                direct_url_template: row.direct_url,
                archive_url_template: row.archive_url,
                category: None,
                update_frequency: None,
                description: None,
            });
        }

        for row in read_rows::<LookupRow>(lookup, "lookup")? {
            let code = row.report_code.trim();
            let Some(&idx) = registry.by_code.get(code) else {
                log::debug!("Lookup row for {code} has no matching instruction row, skipping");
                continue;
            };
            let config = &mut registry.configs[idx];
            config.category = non_empty(row.category);
            config.update_frequency = non_empty(row.update_frequency);
            config.description = non_empty(row.description);
        }

        log::debug!("Loaded {} report sources", registry.configs.len());

        Ok(registry)
    }

    fn insert(&mut self, config: SourceConfig) {
        if let Some(&idx) = self.by_code.get(&config.report_code) {
            self.configs[idx] = config;
        } else {
            self.by_code
                .insert(config.report_code.clone(), self.configs.len());
            self.configs.push(config);
        }
    }

    /// Returns the configuration registered under `report_code`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NotFound`] if no such report exists.
    pub fn get_config(&self, report_code: &str) -> Result<&SourceConfig, SourceError> {
        self.by_code
            .get(report_code)
            .map(|&idx| &self.configs[idx])
            .ok_or_else(|| SourceError::NotFound {
                report_code: report_code.to_string(),
            })
    }

    /// All configurations, in instruction-file order.
    #[must_use]
    pub fn list_configs(&self) -> Vec<&SourceConfig> {
        self.configs.iter().collect()
    }

    /// Configurations whose lookup category equals `category`.
    #[must_use]
    pub fn configs_by_category(&self, category: &str) -> Vec<&SourceConfig> {
        self.configs
            .iter()
            .filter(|c| c.category.as_deref() == Some(category))
            .collect()
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

fn read_rows<T: serde::de::DeserializeOwned>(
    reader: impl Read,
    label: &str,
) -> Result<Vec<T>, SourceError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| SourceError::Configuration {
            message: format!("malformed {label} file: {e}"),
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPECTED_SOURCE_COUNT: usize = 22;

    #[test]
    fn loads_all_embedded_sources() {
        let registry = SourceRegistry::embedded().unwrap();
        assert_eq!(registry.len(), EXPECTED_SOURCE_COUNT);
    }

    #[test]
    fn report_codes_are_unique() {
        let registry = SourceRegistry::embedded().unwrap();
        let mut codes: Vec<&str> = registry
            .list_configs()
            .iter()
            .map(|c| c.report_code.as_str())
            .collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), EXPECTED_SOURCE_COUNT);
    }

    #[test]
    fn every_embedded_source_is_enriched() {
        for config in SourceRegistry::embedded().unwrap().list_configs() {
            assert!(
                config.update_frequency.is_some(),
                "{}: no update frequency",
                config.report_code
            );
            assert!(
                config.direct_url_template.contains("mis.nyiso.com"),
                "{}: unexpected direct url",
                config.report_code
            );
        }
    }

    #[test]
    fn skips_lookup_rows_without_instruction_match() {
        let instructions = "Data Type,Report Code,Dataset Name,Filename Pattern,Direct CSV URL,Archive ZIP URL\n\
                            Load,P-58B,pal,{YYYYMMDD}pal.csv,http://x/{YYYYMMDD}pal.csv,http://x/{YYYYMM01}pal_csv.zip\n";
        let lookup = "Report Code,Category,Update Frequency,Description\n\
                      P-58B,Load,Real-time (5-minute),Actual load\n\
                      P-999,Ghost,Daily,Not in instructions\n";

        let registry =
            SourceRegistry::from_readers(instructions.as_bytes(), lookup.as_bytes()).unwrap();

        assert_eq!(registry.len(), 1);
        let config = registry.get_config("P-58B").unwrap();
        assert_eq!(config.category.as_deref(), Some("Load"));
        assert!(matches!(
            registry.get_config("P-999"),
            Err(SourceError::NotFound { .. })
        ));
    }

    #[test]
    fn rejects_instruction_file_without_required_columns() {
        let instructions = "Report Code,Dataset Name\nP-1,x\n";
        let lookup = "Report Code,Category,Update Frequency,Description\n";

        let result = SourceRegistry::from_readers(instructions.as_bytes(), lookup.as_bytes());
        assert!(matches!(result, Err(SourceError::Configuration { .. })));
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let result = SourceRegistry::from_paths(
            Path::new("/nonexistent/URL_Instructions.txt"),
            Path::new("/nonexistent/URL_Lookup.txt"),
        );
        assert!(matches!(result, Err(SourceError::Configuration { .. })));
    }

    #[test]
    fn filters_by_category() {
        let registry = SourceRegistry::embedded().unwrap();
        let outages = registry.configs_by_category("Outages");
        assert_eq!(outages.len(), 5);
        assert!(outages.iter().all(|c| c.report_code.starts_with("P-")));
    }

    #[test]
    fn current_flows_have_no_archive() {
        let registry = SourceRegistry::embedded().unwrap();
        assert!(!registry.get_config("P-32-CURRENT").unwrap().has_archive());
        assert!(registry.get_config("P-32").unwrap().has_archive());
    }
}
