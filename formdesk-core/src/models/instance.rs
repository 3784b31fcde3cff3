/// Instance rows
///
/// One row per (owner, template type); provisioning overwrites the row in
/// place when the pair already exists.

use crate::schema::instances;
use crate::store::{Cell, Mutation, Row, TableSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One decoded Instances row
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRecord {
    pub row_number: usize,
    pub owner_access_id: String,
    pub owner_account: String,
    pub template_type: String,
    pub instance_id: String,
    pub instance_url: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Instance as listed to its owner
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSummary {
    pub template_type: String,
    pub instance_id: String,
    pub instance_url: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl InstanceRecord {
    pub fn from_row(row_number: usize, row: &Row) -> Self {
        let text = |col: usize| {
            row.get(col - 1)
                .map(|cell| cell.as_str().to_string())
                .unwrap_or_default()
        };

        Self {
            row_number,
            owner_access_id: text(instances::OWNER_ACCESS_ID),
            owner_account: text(instances::OWNER_ACCOUNT),
            template_type: text(instances::TEMPLATE_TYPE),
            instance_id: text(instances::INSTANCE_ID),
            instance_url: text(instances::INSTANCE_URL),
            created_at: row
                .get(instances::CREATED_AT - 1)
                .and_then(Cell::as_timestamp),
        }
    }

    /// Decodes every data row of an Instances snapshot
    pub fn scan(snapshot: &TableSnapshot) -> impl Iterator<Item = InstanceRecord> + '_ {
        snapshot
            .data_rows()
            .map(|(row_number, row)| InstanceRecord::from_row(row_number, row))
    }

    /// Row for a new instance
    pub fn new_row(
        owner_access_id: &str,
        owner_account: &str,
        template_type: &str,
        instance_id: &str,
        instance_url: &str,
        created_at: DateTime<Utc>,
    ) -> Row {
        vec![
            Cell::text(owner_access_id),
            Cell::text(owner_account),
            Cell::text(template_type),
            Cell::text(instance_id),
            Cell::text(instance_url),
            Cell::Timestamp(created_at),
        ]
    }

    /// Mutations replacing the clone held by an existing row
    pub fn replace_clone(
        row_number: usize,
        instance_id: &str,
        instance_url: &str,
        created_at: DateTime<Utc>,
    ) -> Vec<Mutation> {
        vec![
            Mutation::set(row_number, instances::INSTANCE_ID, instance_id),
            Mutation::set(row_number, instances::INSTANCE_URL, instance_url),
            Mutation::set(row_number, instances::CREATED_AT, created_at),
        ]
    }

    pub fn summary(&self) -> InstanceSummary {
        InstanceSummary {
            template_type: self.template_type.clone(),
            instance_id: self.instance_id.clone(),
            instance_url: self.instance_url.clone(),
            created_at: self.created_at,
        }
    }
}
