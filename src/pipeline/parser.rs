//! Row parsing: one logical line + column mapping → record.

use crate::Location;
use crate::error::RowError;
use crate::utils::config::FIELD_DELIMITER;

use super::header::ColumnMapping;

/// Parse one data line. Rejects only structurally short lines; a mapped position that is
/// absent yields an empty string.
pub fn parse_row(line: &str, mapping: &ColumnMapping) -> Result<Location, RowError> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).map(str::trim).collect();
    if fields.len() < mapping.column_count() {
        return Err(RowError::TooFewColumns {
            expected: mapping.column_count(),
            found: fields.len(),
        });
    }

    let field = |idx: Option<usize>| -> String {
        idx.and_then(|i| fields.get(i))
            .map(|s| s.to_string())
            .unwrap_or_default()
    };

    Ok(Location {
        loc_id: field(mapping.loc_id),
        loc_timezone: field(mapping.loc_timezone),
        country: field(mapping.country),
        loc_name: field(mapping.loc_name),
        business: field(mapping.business),
    })
}
