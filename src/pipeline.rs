use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::ExportConfig;
use crate::document::Document;
use crate::error::ExportError;
use crate::extract::Page;
use crate::facility::{Label, Record, RowContext, RowOutcome, classify_row};
use crate::sql::{SqlLayout, plan_files, write_file};

/// Section context carried from row to row and page to page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractState {
    pub province: String,
    pub region: String,
}

impl Default for ExtractState {
    fn default() -> Self {
        Self {
            province: "Unknown".to_string(),
            region: "Unknown".to_string(),
        }
    }
}

/// Row tallies for one page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStats {
    pub tables: usize,
    pub rows: usize,
    pub records: usize,
    pub labels: usize,
    pub header_rows: usize,
    pub empty_rows: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub state: ExtractState,
    pub records: Vec<Record>,
    pub stats: PageStats,
}

/// Turn the tables of one page into records, updating the section context on label rows
pub fn process_page(page: &Page, mut state: ExtractState, config: &ExportConfig) -> PageOutcome {
    let tables = page.extract_tables(&config.table_settings);
    let mut records = Vec::new();
    let mut stats = PageStats {
        tables: tables.len(),
        ..PageStats::default()
    };

    for table in &tables {
        debug!(
            page = page.number,
            rows = table.rows.len(),
            columns = table.num_columns(),
            "table found"
        );
        for (row_idx, row) in table.text_rows().iter().enumerate() {
            stats.rows += 1;
            let first_cell = table.rows[row_idx]
                .first()
                .and_then(Option::as_ref)
                .map(|cell| &cell.bbox);
            let ctx = RowContext {
                chars: &page.chars,
                first_cell,
                province: &state.province,
                header_marker: &config.header_marker,
                label_matching: config.label_matching,
            };

            match classify_row(row, &ctx) {
                RowOutcome::HeaderMarker => stats.header_rows += 1,
                RowOutcome::Empty => stats.empty_rows += 1,
                RowOutcome::Label(label) => {
                    stats.labels += 1;
                    match label {
                        Label::Province(name) => {
                            debug!(page = page.number, province = %name, "province label");
                            state.province = name;
                        }
                        Label::Region(name) => {
                            debug!(page = page.number, region = %name, "region label");
                            state.region = name;
                        }
                    }
                }
                RowOutcome::Record(record) => {
                    stats.records += 1;
                    records.push(record);
                }
                RowOutcome::Rejected(reason) => {
                    debug!(page = page.number, row = row_idx, ?reason, "row rejected");
                    stats.rejected += 1;
                }
            }
        }
    }

    debug!(page = page.number, ?stats, "page processed");
    PageOutcome {
        state,
        records,
        stats,
    }
}

/// Extract records from every page in order, printing progress
pub fn extract_records(
    doc: &mut Document,
    config: &ExportConfig,
) -> Result<Vec<Record>, ExportError> {
    let total_pages = doc.page_count();
    println!("Processing {} pages...", total_pages);

    let mut state = ExtractState::default();
    let mut records = Vec::new();

    for i in 0..total_pages {
        let page = doc
            .page(i)
            .map_err(|source| ExportError::Page { page: i + 1, source })?;
        let outcome = process_page(&page, state, config);
        state = outcome.state;
        records.extend(outcome.records);

        if (i + 1) % config.progress_interval == 0 {
            println!("Processed {}/{} pages", i + 1, total_pages);
        }
    }

    println!("Extraction complete. Found {} records.", records.len());
    info!(
        records = records.len(),
        province = %state.province,
        region = %state.region,
        "extraction finished"
    );
    Ok(records)
}

/// What a run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub records: usize,
    pub files: Vec<PathBuf>,
}

/// Read the input document, extract its records and write the SQL files
pub fn run(config: &ExportConfig) -> Result<RunSummary, ExportError> {
    config.validate()?;

    let data = fs::read(&config.input).map_err(|source| ExportError::Read {
        path: config.input.clone(),
        source,
    })?;
    info!(path = %config.input.display(), bytes = data.len(), "document read");

    let mut doc = Document::parse(&data)?;
    let records = extract_records(&mut doc, config)?;

    let layout = SqlLayout {
        table_name: &config.table_name,
        file_prefix: &config.output_prefix,
        batch_size: config.batch_size,
        rows_per_file: config.rows_per_file,
    };

    let mut files = Vec::new();
    for file in plan_files(&records, &layout) {
        let path = write_file(&file, &config.output_dir)?;
        println!("Saved {} records to {}", file.row_count, path.display());
        files.push(path);
    }

    Ok(RunSummary {
        records: records.len(),
        files,
    })
}
