use std::path::PathBuf;

use crate::error::ExportError;
use crate::extract::TableSettings;
use crate::facility::LabelMatching;

/// Every knob of an export run. `Default` holds the production values.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Source document
    pub input: PathBuf,
    /// Directory receiving the SQL files; empty means the working directory
    pub output_dir: PathBuf,
    /// Files are named `<output_prefix>_<n>.sql`
    pub output_prefix: String,
    pub table_name: String,
    /// Rows per INSERT statement
    pub batch_size: usize,
    /// Rows per output file
    pub rows_per_file: usize,
    /// Cell text identifying the repeated column header row
    pub header_marker: String,
    pub label_matching: LabelMatching,
    pub table_settings: TableSettings,
    /// A progress line is printed every this many pages
    pub progress_interval: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("YAKAP.pdf"),
            output_dir: PathBuf::new(),
            output_prefix: "yakap_clinics".to_string(),
            table_name: "yakap_clinics".to_string(),
            batch_size: 100,
            rows_per_file: 1000,
            header_marker: "NAME OF HEALTH FACILITY".to_string(),
            label_matching: LabelMatching::Containment,
            table_settings: TableSettings::default(),
            progress_interval: 10,
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.batch_size == 0 {
            return Err(ExportError::Config("batch_size must be positive".into()));
        }
        if self.rows_per_file == 0 {
            return Err(ExportError::Config("rows_per_file must be positive".into()));
        }
        if self.progress_interval == 0 {
            return Err(ExportError::Config("progress_interval must be positive".into()));
        }
        if self.output_prefix.is_empty() {
            return Err(ExportError::Config("output_prefix is empty".into()));
        }
        if self.table_name.is_empty() {
            return Err(ExportError::Config("table_name is empty".into()));
        }
        if self.header_marker.is_empty() {
            return Err(ExportError::Config("header_marker is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::TableStrategy;

    #[test]
    fn test_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.input, PathBuf::from("YAKAP.pdf"));
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.rows_per_file, 1000);
        assert_eq!(config.label_matching, LabelMatching::Containment);
        assert_eq!(config.table_settings.strategy, TableStrategy::Lines);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let config = ExportConfig {
            batch_size: 0,
            ..ExportConfig::default()
        };
        assert!(matches!(config.validate(), Err(ExportError::Config(_))));

        let config = ExportConfig {
            rows_per_file: 0,
            ..ExportConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ExportConfig {
            table_name: String::new(),
            ..ExportConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
