//! Header resolution: first logical line → column mapping.

use std::collections::HashMap;

use crate::error::SessionError;
use crate::utils::config::{FIELD_DELIMITER, HeaderColumns};

/// Column name → position, plus the pre-resolved positions of the five record fields.
///
/// Built once per session and never mutated. A recognized field missing from the header has
/// no position and yields an empty string in every record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: HashMap<String, usize>,
    column_count: usize,
    pub(crate) loc_id: Option<usize>,
    pub(crate) loc_timezone: Option<usize>,
    pub(crate) country: Option<usize>,
    pub(crate) loc_name: Option<usize>,
    pub(crate) business: Option<usize>,
}

impl ColumnMapping {
    /// Split the header on the field delimiter, trim each token, and map it to its position.
    /// A name that appears twice keeps the later position.
    pub fn resolve(line: &str) -> Result<ColumnMapping, SessionError> {
        let tokens: Vec<&str> = line.split(FIELD_DELIMITER).map(str::trim).collect();
        if tokens.len() < HeaderColumns::MIN_COLUMNS {
            return Err(SessionError::InvalidHeader(format!(
                "expected at least {} columns, found {}",
                HeaderColumns::MIN_COLUMNS,
                tokens.len()
            )));
        }

        let columns: HashMap<String, usize> = tokens
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.to_string(), idx))
            .collect();

        let mapping = ColumnMapping {
            loc_id: columns.get(HeaderColumns::LOC_ID).copied(),
            loc_timezone: columns.get(HeaderColumns::LOC_TIMEZONE).copied(),
            country: columns.get(HeaderColumns::COUNTRY).copied(),
            loc_name: columns.get(HeaderColumns::LOC_NAME).copied(),
            business: columns.get(HeaderColumns::BUSINESS).copied(),
            column_count: tokens.len(),
            columns,
        };

        for (name, idx) in mapping.required_positions() {
            if idx.is_none() {
                log::warn!("header has no {} column; its values will be empty", name);
            }
        }
        Ok(mapping)
    }

    /// Number of columns in the header line.
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Position of `name`, if the header had such a column.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    fn required_positions(&self) -> [(&'static str, Option<usize>); 5] {
        [
            (HeaderColumns::LOC_ID, self.loc_id),
            (HeaderColumns::LOC_TIMEZONE, self.loc_timezone),
            (HeaderColumns::COUNTRY, self.country),
            (HeaderColumns::LOC_NAME, self.loc_name),
            (HeaderColumns::BUSINESS, self.business),
        ]
    }
}
