/// Settings rows
///
/// Plain key/value pairs. Template registrations use keys of the form
/// `template:<type>` whose value is the source resource id.

use crate::schema::{settings, TEMPLATE_KEY_PREFIX};
use crate::store::{Row, TableSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingRecord {
    pub row_number: usize,
    pub key: String,
    pub value: String,
}

impl SettingRecord {
    pub fn from_row(row_number: usize, row: &Row) -> Self {
        let text = |col: usize| {
            row.get(col - 1)
                .map(|cell| cell.as_str().to_string())
                .unwrap_or_default()
        };

        Self {
            row_number,
            key: text(settings::KEY),
            value: text(settings::VALUE),
        }
    }

    pub fn scan(snapshot: &TableSnapshot) -> impl Iterator<Item = SettingRecord> + '_ {
        snapshot
            .data_rows()
            .map(|(row_number, row)| SettingRecord::from_row(row_number, row))
    }

    /// First row whose key matches exactly
    pub fn find(snapshot: &TableSnapshot, key: &str) -> Option<SettingRecord> {
        SettingRecord::scan(snapshot).find(|setting| setting.key == key)
    }
}

/// Settings key under which a template type is registered
pub fn template_key(template_type: &str) -> String {
    format!("{}{}", TEMPLATE_KEY_PREFIX, template_type)
}

/// Template type named by a settings key, if it is a template key
pub fn template_type_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(TEMPLATE_KEY_PREFIX)
}
