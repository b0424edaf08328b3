//! SQL rendering of extracted records: one CREATE TABLE, then transactions of
//! batched INSERT statements spread over numbered files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ExportError;
use crate::facility::Record;

/// Output column with its SQL type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
    /// Trailing `--` comment in the CREATE TABLE statement
    pub comment: Option<&'static str>,
}

const fn column(name: &'static str, sql_type: &'static str) -> Column {
    Column {
        name,
        sql_type,
        comment: None,
    }
}

/// Table schema, in record field order
pub const COLUMNS: [Column; 9] = [
    column("id", "VARCHAR(50)"),
    column("facility_name", "TEXT"),
    column("tel_no", "VARCHAR(100)"),
    column("email", "VARCHAR(255)"),
    column("street", "TEXT"),
    column("municipality", "VARCHAR(100)"),
    Column {
        name: "province",
        sql_type: "VARCHAR(100)",
        comment: Some("Added province"),
    },
    column("expire_date", "VARCHAR(50)"),
    column("sec", "VARCHAR(50)"),
];

/// A rendered output file, not yet written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFile {
    pub file_name: String,
    pub contents: String,
    pub row_count: usize,
}

/// Layout of the SQL output
#[derive(Debug, Clone, Copy)]
pub struct SqlLayout<'a> {
    pub table_name: &'a str,
    pub file_prefix: &'a str,
    pub batch_size: usize,
    pub rows_per_file: usize,
}

pub fn create_table_statement(table: &str) -> String {
    let mut statement = format!("CREATE TABLE IF NOT EXISTS {} (\n", table);
    for (i, c) in COLUMNS.iter().enumerate() {
        statement += &format!("    {} {}", c.name, c.sql_type);
        if i + 1 < COLUMNS.len() {
            statement.push(',');
        }
        if let Some(comment) = c.comment {
            statement += &format!(" -- {}", comment);
        }
        statement.push('\n');
    }
    statement += ");\n";
    statement
}

/// One multi-row INSERT; values are inlined as already-escaped literals
pub fn insert_statement(table: &str, rows: &[Record]) -> String {
    let names: Vec<&str> = COLUMNS.iter().map(|c| c.name).collect();
    let values: Vec<String> = rows
        .iter()
        .map(|record| {
            let literals: Vec<String> = record.fields().iter().map(|v| format!("'{}'", v)).collect();
            format!("({})", literals.join(", "))
        })
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES\n{};",
        table,
        names.join(", "),
        values.join(",\n")
    )
}

/// Split records into files and render each one; no records, no files
pub fn plan_files(records: &[Record], layout: &SqlLayout) -> Vec<SqlFile> {
    if layout.rows_per_file == 0 || layout.batch_size == 0 {
        return Vec::new();
    }

    records
        .chunks(layout.rows_per_file)
        .enumerate()
        .map(|(idx, rows)| {
            let mut statements = Vec::new();
            if idx == 0 {
                statements.push(create_table_statement(layout.table_name));
            }
            statements.push("BEGIN TRANSACTION;".to_string());
            statements.extend(
                rows.chunks(layout.batch_size)
                    .map(|batch| insert_statement(layout.table_name, batch)),
            );
            statements.push("COMMIT;".to_string());

            SqlFile {
                file_name: format!("{}_{}.sql", layout.file_prefix, idx + 1),
                contents: statements.join("\n"),
                row_count: rows.len(),
            }
        })
        .collect()
}

/// Write one planned file into `dir`, returning its path
pub fn write_file(file: &SqlFile, dir: &Path) -> Result<PathBuf, ExportError> {
    let path = dir.join(&file.file_name);
    fs::write(&path, &file.contents).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::{FIELD_NAMES, normalize};

    fn record(n: usize) -> Record {
        let row = vec![
            n.to_string(),
            format!("Clinic {}", n),
            String::new(),
            String::new(),
            String::new(),
            "Town".to_string(),
            "2026-12-31".to_string(),
            "S".to_string(),
        ];
        normalize(row, "CEBU").unwrap()
    }

    fn layout() -> SqlLayout<'static> {
        SqlLayout {
            table_name: "yakap_clinics",
            file_prefix: "yakap_clinics",
            batch_size: 100,
            rows_per_file: 1000,
        }
    }

    #[test]
    fn test_columns_follow_record_fields() {
        let names: Vec<&str> = COLUMNS.iter().map(|c| c.name).collect();
        assert_eq!(names, FIELD_NAMES);
    }

    #[test]
    fn test_file_split() {
        let records: Vec<Record> = (0..2500).map(record).collect();
        let files = plan_files(&records, &layout());

        assert_eq!(files.len(), 3);
        let counts: Vec<usize> = files.iter().map(|f| f.row_count).collect();
        assert_eq!(counts, vec![1000, 1000, 500]);

        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, ["yakap_clinics_1.sql", "yakap_clinics_2.sql", "yakap_clinics_3.sql"]);

        assert!(files[0].contents.starts_with("CREATE TABLE IF NOT EXISTS yakap_clinics (\n"));
        assert!(!files[1].contents.contains("CREATE TABLE"));
        assert!(!files[2].contents.contains("CREATE TABLE"));

        assert_eq!(files[0].contents.matches("INSERT INTO").count(), 10);
        assert_eq!(files[2].contents.matches("INSERT INTO").count(), 5);
        for file in &files {
            assert!(file.contents.contains("BEGIN TRANSACTION;\nINSERT INTO"));
            assert!(file.contents.ends_with(";\nCOMMIT;"));
        }
    }

    #[test]
    fn test_order_preserved_across_files() {
        let records: Vec<Record> = (0..25).map(record).collect();
        let small = SqlLayout {
            batch_size: 3,
            rows_per_file: 10,
            ..layout()
        };
        let files = plan_files(&records, &small);

        assert_eq!(files.len(), 3);
        assert!(files[1].contents.contains("('10', 'Clinic 10'"));
        assert!(files[2].contents.contains("('24', 'Clinic 24'"));
        assert_eq!(files[1].contents.matches("INSERT INTO").count(), 4);
    }

    #[test]
    fn test_no_records_no_files() {
        assert!(plan_files(&[], &layout()).is_empty());
    }

    #[test]
    fn test_statement_format() {
        let records = vec![record(1), record(2)];
        let files = plan_files(&records, &layout());

        let expected = "CREATE TABLE IF NOT EXISTS yakap_clinics (\n\
            \x20   id VARCHAR(50),\n\
            \x20   facility_name TEXT,\n\
            \x20   tel_no VARCHAR(100),\n\
            \x20   email VARCHAR(255),\n\
            \x20   street TEXT,\n\
            \x20   municipality VARCHAR(100),\n\
            \x20   province VARCHAR(100), -- Added province\n\
            \x20   expire_date VARCHAR(50),\n\
            \x20   sec VARCHAR(50)\n\
            );\n\n\
            BEGIN TRANSACTION;\n\
            INSERT INTO yakap_clinics (id, facility_name, tel_no, email, street, municipality, province, expire_date, sec) VALUES\n\
            ('1', 'Clinic 1', '', '', '', 'Town', 'CEBU', '2026-12-31', 'S'),\n\
            ('2', 'Clinic 2', '', '', '', 'Town', 'CEBU', '2026-12-31', 'S');\n\
            COMMIT;";
        assert_eq!(files[0].contents, expected);
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let files = plan_files(&[record(7)], &layout());

        let path = write_file(&files[0], dir.path()).unwrap();

        assert_eq!(path, dir.path().join("yakap_clinics_1.sql"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), files[0].contents);
    }

    #[test]
    fn test_write_failure_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let files = plan_files(&[record(7)], &layout());

        let err = write_file(&files[0], &missing).unwrap_err();
        assert!(matches!(err, ExportError::Write { ref path, .. } if path.starts_with(&missing)));
    }
}
