//! Load the authoritative entity set for a table from CSV.
//!
//! Expected headers: `name` (required) and `provider` (required for the
//! provider-locality table, ignored elsewhere). An optional `key` column
//! overrides the derived key for names that had to be hand-mapped.

use std::path::Path;

use serde::Deserialize;

use outage_recon::{build_key, dissolve_key, StoreError};

use crate::sqlite::Table;

#[derive(Debug, Deserialize)]
struct SeedRow {
    name: String,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    key: Option<String>,
}

/// Read `(key, name)` pairs for `table` from a CSV file.
pub fn load_seed_csv(path: &Path, table: Table) -> Result<Vec<(String, String)>, StoreError> {
    let data = std::fs::read_to_string(path).map_err(|e| StoreError::Unavailable {
        store: table.name().to_string(),
        message: format!("cannot read {}: {e}", path.display()),
    })?;
    parse_seed_csv(&data, table)
}

pub fn parse_seed_csv(data: &str, table: Table) -> Result<Vec<(String, String)>, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    let mut out = Vec::new();
    for (i, result) in reader.deserialize::<SeedRow>().enumerate() {
        let row = result.map_err(|e| StoreError::Corrupt {
            store: table.name().to_string(),
            key: format!("row {}", i + 2),
            message: e.to_string(),
        })?;

        let key = match row.key.filter(|k| !k.is_empty()) {
            Some(key) => key,
            None => match table {
                Table::ProviderLocalities => {
                    let provider = row.provider.filter(|p| !p.is_empty()).ok_or_else(|| {
                        StoreError::Corrupt {
                            store: table.name().to_string(),
                            key: format!("row {}", i + 2),
                            message: "missing provider".into(),
                        }
                    })?;
                    build_key(&provider, &row.name)
                }
                Table::Localities | Table::Regions => dissolve_key(&row.name),
            },
        };
        out.push((key, row.name));
    }
    Ok(out)
}
