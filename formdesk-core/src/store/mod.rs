/// Row store abstraction
///
/// The backing store is a set of named stores, each holding named tables of
/// loosely typed cells. Row 1 of every table is its header row; addressing is
/// 1-indexed for both rows and columns.
///
/// Reads return a [`TableSnapshot`] tagged with the table's revision. Writes go
/// through [`RowStore::commit`], which applies a batch of [`Mutation`]s only if
/// the revision is unchanged since the snapshot was taken. [`Table::transact`]
/// wraps that into a read-plan-commit loop so a uniqueness scan and the write
/// that depends on it form one atomic step.
///
/// # Backends
///
/// - [`MemoryRowStore`]: in-process, used for tests and single-node setups
/// - [`PgRowStore`]: PostgreSQL via sqlx
///
/// # Example
///
/// ```
/// use formdesk_core::store::{Cell, MemoryRowStore, RowStore, Table};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryRowStore::new();
/// let store_id = store.create_store("demo").await?;
/// store.create_table(&store_id, "Settings").await?;
///
/// let table = Table::new(&store, &store_id, "Settings");
/// table.append_row(vec![Cell::text("key"), Cell::text("value")]).await?;
/// assert_eq!(table.rows().await?.len(), 1);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

pub use memory::MemoryRowStore;
pub use postgres::PgRowStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default number of read-plan-commit rounds before giving up on a contended table
pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 5;

/// Error type for row store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No store exists with this id
    #[error("Store not found: {0}")]
    StoreNotFound(String),

    /// The store has no table with this name
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// A mutation addressed a row or column outside the table
    #[error("Invalid cell address: row {row}, column {col}")]
    InvalidAddress { row: usize, col: usize },

    /// Every commit attempt lost against a concurrent writer
    #[error("Table {table} stayed contended after {attempts} commit attempts")]
    Contention { table: String, attempts: u32 },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Row store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// Creates a text cell
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Text content of the cell, `""` for anything that is not text
    pub fn as_str(&self) -> &str {
        match self {
            Cell::Text(value) => value,
            _ => "",
        }
    }

    /// Timestamp content of the cell, if any
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Cell::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Boolean content of the cell, if any
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Cell::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// True for empty cells and empty text
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(value) => value.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl From<DateTime<Utc>> for Cell {
    fn from(value: DateTime<Utc>) -> Self {
        Cell::Timestamp(value)
    }
}

/// One table row
pub type Row = Vec<Cell>;

/// Builds a header row from column labels
pub fn header_row(labels: &[&str]) -> Row {
    labels.iter().map(|label| Cell::text(*label)).collect()
}

/// Consistent view of a table at one revision
#[derive(Debug, Clone, PartialEq)]
pub struct TableSnapshot {
    /// Revision the rows were read at
    pub revision: u64,

    /// All rows, header first
    pub rows: Vec<Row>,
}

impl TableSnapshot {
    /// Header row, empty if the table has no rows at all
    pub fn header(&self) -> &[Cell] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// 1-indexed column whose header equals `label`
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.header()
            .iter()
            .position(|cell| cell.as_str() == label)
            .map(|idx| idx + 1)
    }

    /// Data rows (everything below the header) with their 1-indexed row numbers
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &Row)> {
        self.rows.iter().enumerate().skip(1).map(|(idx, row)| (idx + 1, row))
    }

    /// Whether the table has at least one data row
    pub fn has_data(&self) -> bool {
        self.rows.len() > 1
    }

    /// Cell at a 1-indexed address; out-of-range addresses read as empty
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        if row == 0 || col == 0 {
            return &EMPTY_CELL;
        }
        self.rows
            .get(row - 1)
            .and_then(|cells| cells.get(col - 1))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// A write applied by [`RowStore::commit`]
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Append a row after the last one
    Append(Row),

    /// Overwrite one cell of an existing row; the row is padded if `col` is past its end
    SetCell { row: usize, col: usize, value: Cell },
}

impl Mutation {
    /// Shorthand for [`Mutation::SetCell`]
    pub fn set(row: usize, col: usize, value: impl Into<Cell>) -> Self {
        Mutation::SetCell {
            row,
            col,
            value: value.into(),
        }
    }
}

/// Result of a conditional commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// All mutations were applied; the table is now at `revision`
    Applied { revision: u64 },

    /// The table moved on since the snapshot; nothing was applied
    Conflict { current: u64 },
}

/// Applies mutations to an in-memory row vector, all or nothing
///
/// Shared by the backends so addressing rules stay identical.
pub(crate) fn apply_mutations(rows: &[Row], mutations: Vec<Mutation>) -> StoreResult<Vec<Row>> {
    let mut next = rows.to_vec();
    for mutation in mutations {
        match mutation {
            Mutation::Append(row) => next.push(row),
            Mutation::SetCell { row, col, value } => {
                if row == 0 || col == 0 || row > next.len() {
                    return Err(StoreError::InvalidAddress { row, col });
                }
                let cells = &mut next[row - 1];
                if cells.len() < col {
                    cells.resize(col, Cell::Empty);
                }
                cells[col - 1] = value;
            }
        }
    }
    Ok(next)
}

/// Tabular storage backend
///
/// Implementations must make [`RowStore::commit`] atomic with respect to other
/// commits on the same table.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Creates an empty store and returns its id
    async fn create_store(&self, title: &str) -> StoreResult<String>;

    /// Whether a store with this id exists
    async fn store_exists(&self, store_id: &str) -> StoreResult<bool>;

    /// Table names in creation order
    async fn list_tables(&self, store_id: &str) -> StoreResult<Vec<String>>;

    /// Creates an empty table; a no-op if it already exists
    async fn create_table(&self, store_id: &str, name: &str) -> StoreResult<()>;

    /// Deletes a table and its rows
    async fn delete_table(&self, store_id: &str, name: &str) -> StoreResult<()>;

    /// Reads every row of a table, `None` if the table does not exist
    async fn snapshot(&self, store_id: &str, table: &str) -> StoreResult<Option<TableSnapshot>>;

    /// Applies `mutations` iff the table is still at `expected_revision`
    async fn commit(
        &self,
        store_id: &str,
        table: &str,
        expected_revision: u64,
        mutations: Vec<Mutation>,
    ) -> StoreResult<CommitOutcome>;
}

/// What a [`Table::transact`] round decided to do
#[derive(Debug)]
pub enum Plan<T> {
    /// Commit these mutations, then return the value
    Commit(Vec<Mutation>, T),

    /// Nothing to write; return the value
    Done(T),
}

/// Handle on one table of one store
#[derive(Clone, Copy)]
pub struct Table<'a> {
    store: &'a dyn RowStore,
    store_id: &'a str,
    name: &'a str,
    max_attempts: u32,
}

impl<'a> Table<'a> {
    /// Creates a handle with the default retry bound
    pub fn new(store: &'a dyn RowStore, store_id: &'a str, name: &'a str) -> Self {
        Self {
            store,
            store_id,
            name,
            max_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
        }
    }

    /// Overrides the number of commit attempts made by [`Table::transact`]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Table name
    pub fn name(&self) -> &str {
        self.name
    }

    /// Reads the table
    ///
    /// # Errors
    ///
    /// Returns `StoreError::TableNotFound` if the table does not exist
    pub async fn snapshot(&self) -> StoreResult<TableSnapshot> {
        self.store
            .snapshot(self.store_id, self.name)
            .await?
            .ok_or_else(|| StoreError::TableNotFound(self.name.to_string()))
    }

    /// All rows, header first
    pub async fn rows(&self) -> StoreResult<Vec<Row>> {
        Ok(self.snapshot().await?.rows)
    }

    /// Appends a row and returns its 1-indexed row number
    pub async fn append_row(&self, values: Row) -> StoreResult<usize> {
        self.transact(|snapshot| {
            Ok::<_, StoreError>(Plan::Commit(
                vec![Mutation::Append(values.clone())],
                snapshot.rows.len() + 1,
            ))
        })
        .await
    }

    /// Overwrites one cell
    pub async fn set_cell(&self, row: usize, col: usize, value: Cell) -> StoreResult<()> {
        self.transact(|_| {
            Ok::<_, StoreError>(Plan::Commit(
                vec![Mutation::SetCell {
                    row,
                    col,
                    value: value.clone(),
                }],
                (),
            ))
        })
        .await
    }

    /// 1-indexed column labelled `label`, appending it to the header if absent
    pub async fn get_or_create_column(&self, label: &str) -> StoreResult<usize> {
        self.transact(|snapshot| {
            if let Some(col) = snapshot.column_index(label) {
                return Ok::<_, StoreError>(Plan::Done(col));
            }
            if snapshot.rows.is_empty() {
                return Ok(Plan::Commit(vec![Mutation::Append(vec![Cell::text(label)])], 1));
            }
            let col = snapshot.header().len() + 1;
            Ok(Plan::Commit(vec![Mutation::set(1, col, label)], col))
        })
        .await
    }

    /// Runs a read-plan-commit loop
    ///
    /// `plan` sees a fresh snapshot on every round and either returns mutations
    /// to commit or finishes without writing. A round that loses against a
    /// concurrent commit is retried with a new snapshot, up to the configured
    /// number of attempts.
    ///
    /// # Errors
    ///
    /// Propagates errors returned by `plan`, store failures converted through
    /// `From<StoreError>`, and `StoreError::Contention` when every attempt conflicted.
    pub async fn transact<T, E, F>(&self, mut plan: F) -> Result<T, E>
    where
        F: FnMut(&TableSnapshot) -> Result<Plan<T>, E> + Send,
        T: Send,
        E: From<StoreError> + Send,
    {
        for attempt in 1..=self.max_attempts {
            let snapshot = self.snapshot().await?;

            let (mutations, value) = match plan(&snapshot)? {
                Plan::Done(value) => return Ok(value),
                Plan::Commit(mutations, value) => (mutations, value),
            };

            match self
                .store
                .commit(self.store_id, self.name, snapshot.revision, mutations)
                .await?
            {
                CommitOutcome::Applied { revision } => {
                    debug!(table = self.name, revision, attempt, "Committed table mutations");
                    return Ok(value);
                }
                CommitOutcome::Conflict { current } => {
                    debug!(
                        table = self.name,
                        expected = snapshot.revision,
                        current,
                        attempt,
                        "Commit conflict, retrying with a fresh snapshot"
                    );
                }
            }
        }

        warn!(table = self.name, attempts = self.max_attempts, "Giving up on contended table");
        Err(StoreError::Contention {
            table: self.name.to_string(),
            attempts: self.max_attempts,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(rows: Vec<Row>) -> TableSnapshot {
        TableSnapshot { revision: 3, rows }
    }

    #[test]
    fn test_snapshot_column_index_is_one_based() {
        let snap = snapshot(vec![header_row(&["key", "value"])]);
        assert_eq!(snap.column_index("key"), Some(1));
        assert_eq!(snap.column_index("value"), Some(2));
        assert_eq!(snap.column_index("missing"), None);
    }

    #[test]
    fn test_snapshot_data_rows_skip_header() {
        let snap = snapshot(vec![
            header_row(&["key"]),
            vec![Cell::text("a")],
            vec![Cell::text("b")],
        ]);

        let rows: Vec<(usize, &str)> = snap
            .data_rows()
            .map(|(number, row)| (number, row[0].as_str()))
            .collect();
        assert_eq!(rows, vec![(2, "a"), (3, "b")]);
        assert!(snap.has_data());
    }

    #[test]
    fn test_snapshot_cell_out_of_range_is_empty() {
        let snap = snapshot(vec![header_row(&["key"])]);
        assert_eq!(snap.cell(1, 1).as_str(), "key");
        assert_eq!(snap.cell(1, 5), &Cell::Empty);
        assert_eq!(snap.cell(9, 1), &Cell::Empty);
        assert_eq!(snap.cell(0, 0), &Cell::Empty);
    }

    #[test]
    fn test_header_only_table_has_no_data() {
        let snap = snapshot(vec![header_row(&["key"])]);
        assert!(!snap.has_data());
        assert_eq!(snap.data_rows().count(), 0);
    }

    #[test]
    fn test_apply_mutations_pads_short_rows() {
        let rows = vec![header_row(&["a"])];
        let next = apply_mutations(&rows, vec![Mutation::set(1, 3, "c")]).unwrap();
        assert_eq!(next[0], vec![Cell::text("a"), Cell::Empty, Cell::text("c")]);
    }

    #[test]
    fn test_apply_mutations_rejects_bad_address_atomically() {
        let rows = vec![header_row(&["a"])];
        let result = apply_mutations(
            &rows,
            vec![Mutation::Append(vec![Cell::text("x")]), Mutation::set(5, 1, "y")],
        );
        assert!(matches!(result, Err(StoreError::InvalidAddress { row: 5, col: 1 })));
    }

    #[test]
    fn test_cell_accessors() {
        let now = Utc::now();
        assert_eq!(Cell::from("abc").as_str(), "abc");
        assert_eq!(Cell::from(true).as_bool(), Some(true));
        assert_eq!(Cell::from(now).as_timestamp(), Some(now));
        assert_eq!(Cell::Bool(false).as_str(), "");
        assert!(Cell::Empty.is_blank());
        assert!(Cell::text("").is_blank());
        assert!(!Cell::Bool(false).is_blank());
    }

    #[test]
    fn test_cell_serialization_is_tagged() {
        let json = serde_json::to_string(&Cell::text("hi")).unwrap();
        assert_eq!(json, r#"{"type":"text","value":"hi"}"#);

        let empty = serde_json::to_string(&Cell::Empty).unwrap();
        assert_eq!(empty, r#"{"type":"empty"}"#);
    }
}
