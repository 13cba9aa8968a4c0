//! Parses the two pricing CSVs (§6.1) into a [`PricingGrid`]: `open_tolls.csv`
//! (comma-delimited, one row per open-system booth) and `price_per_km.csv`
//! (semicolon-delimited, one row per closed-system operator).

use std::path::Path;

use crate::model::{PriceRow, PricingGrid};

fn parse_row(record: &csv::StringRecord, key_col: usize) -> Option<(String, PriceRow)> {
    let key = record.get(key_col)?.trim();
    if key.is_empty() {
        return None;
    }
    let mut row: PriceRow = [0.0; 5];
    for (i, slot) in row.iter_mut().enumerate() {
        let raw = record.get(key_col + 1 + i)?.trim();
        *slot = raw.parse::<f64>().ok()?;
    }
    Some((key.to_string(), row))
}

/// `open_tolls.csv`: header `name,c1,c2,c3,c4,c5`. Keyed by booth name.
fn load_open_tolls(path: &Path) -> anyhow::Result<std::collections::BTreeMap<String, PriceRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .from_path(path)
        .map_err(|e| anyhow::anyhow!("opening {}: {e}", path.display()))?;

    let mut out = std::collections::BTreeMap::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| anyhow::anyhow!("reading {} row {line}: {e}", path.display()))?;
        match parse_row(&record, 0) {
            Some((name, row)) => {
                out.insert(name, row);
            }
            None => {
                tracing::debug!(source = "open_tolls.csv", row = line, "ingest.parse_skip");
            }
        }
    }
    Ok(out)
}

/// `price_per_km.csv`: semicolon-delimited, header `operator;c1;c2;c3;c4;c5`.
/// Keyed by operator code.
fn load_price_per_km(path: &Path) -> anyhow::Result<std::collections::BTreeMap<String, PriceRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_path(path)
        .map_err(|e| anyhow::anyhow!("opening {}: {e}", path.display()))?;

    let mut out = std::collections::BTreeMap::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| anyhow::anyhow!("reading {} row {line}: {e}", path.display()))?;
        match parse_row(&record, 0) {
            Some((operator, row)) => {
                out.insert(operator, row);
            }
            None => {
                tracing::debug!(source = "price_per_km.csv", row = line, "ingest.parse_skip");
            }
        }
    }
    Ok(out)
}

pub fn load_pricing_grid(open_tolls_path: &Path, price_per_km_path: &Path) -> anyhow::Result<PricingGrid> {
    let flat = load_open_tolls(open_tolls_path)?;
    let per_km = load_price_per_km(price_per_km_path)?;
    Ok(PricingGrid { per_km, flat })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("viaroute-test-{name}-{:p}.csv", contents.as_ptr()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_open_tolls_csv() {
        let csv = "name,c1,c2,c3,c4,c5\nSaint-Arnoult,2.10,3.20,3.20,4.50,1.10\n";
        let path = write_temp("open", csv);
        let grid = load_open_tolls(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let row = grid.get("Saint-Arnoult").unwrap();
        assert_eq!(row[0], 2.10);
        assert_eq!(row[4], 1.10);
    }

    #[test]
    fn loads_price_per_km_csv_semicolon_delimited() {
        let csv = "operator;c1;c2;c3;c4;c5\nAPRR;0.082;0.123;0.123;0.180;0.060\n";
        let path = write_temp("perkm", csv);
        let grid = load_price_per_km(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let row = grid.get("APRR").unwrap();
        assert_eq!(row[1], 0.123);
    }

    #[test]
    fn load_pricing_grid_combines_both_files() {
        let open = write_temp("open2", "name,c1,c2,c3,c4,c5\nA14,5.0,6.0,6.0,7.0,2.0\n");
        let perkm = write_temp("perkm2", "operator;c1;c2;c3;c4;c5\nAPRR;0.08;0.12;0.12;0.18;0.06\n");
        let grid = load_pricing_grid(&open, &perkm).unwrap();
        std::fs::remove_file(&open).ok();
        std::fs::remove_file(&perkm).ok();

        assert!(grid.flat.contains_key("A14"));
        assert!(grid.per_km.contains_key("APRR"));
    }
}
