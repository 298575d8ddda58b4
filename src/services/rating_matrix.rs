/// Sparse user x movie rating matrix
///
/// Built once at startup from the ratings dataset and immutable afterwards. Columns are
/// stored compressed (CSC) because similarity search reads whole movie columns.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

use crate::{
    error::{AppError, AppResult},
    models::{InteractionRecord, ItemId, UserId},
};

/// Bijection between natural ids and dense zero-based indices
///
/// Indices follow ascending id order, so the same input always yields the same mapping.
#[derive(Debug, Clone)]
pub struct IndexMapper<K> {
    forward: HashMap<K, usize>,
    inverse: Vec<K>,
}

impl<K: Copy + Ord + Hash> IndexMapper<K> {
    pub fn from_ids(ids: impl IntoIterator<Item = K>) -> Self {
        let inverse: Vec<K> = ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        let forward = inverse.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        Self { forward, inverse }
    }

    pub fn index_of(&self, id: &K) -> Option<usize> {
        self.forward.get(id).copied()
    }

    pub fn id_at(&self, index: usize) -> Option<K> {
        self.inverse.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.inverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inverse.is_empty()
    }

    /// Ids in index order
    pub fn ids(&self) -> &[K] {
        &self.inverse
    }
}

/// Borrowed view of one sparse column: row indices ascending, with their values
#[derive(Debug, Clone, Copy)]
pub struct SparseColumn<'a> {
    pub rows: &'a [usize],
    pub values: &'a [f64],
}

impl SparseColumn<'_> {
    pub fn nnz(&self) -> usize {
        self.rows.len()
    }
}

/// Users are rows, movies are columns
#[derive(Debug, Clone)]
pub struct InteractionMatrix {
    n_rows: usize,
    n_cols: usize,
    col_ptr: Vec<usize>,
    row_idx: Vec<usize>,
    values: Vec<f64>,
    col_norms: Vec<f64>,
}

impl InteractionMatrix {
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// The movie vector over all users
    pub fn column(&self, col: usize) -> SparseColumn<'_> {
        let range = self.col_ptr[col]..self.col_ptr[col + 1];
        SparseColumn {
            rows: &self.row_idx[range.clone()],
            values: &self.values[range],
        }
    }

    /// L2 norm of a column, computed at build time
    pub fn column_norm(&self, col: usize) -> f64 {
        self.col_norms[col]
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let column = self.column(col);
        column
            .rows
            .binary_search(&row)
            .ok()
            .map(|pos| column.values[pos])
    }
}

/// Matrix plus the mappers needed to translate between ids and indices
#[derive(Debug, Clone)]
pub struct RatingModel {
    pub matrix: InteractionMatrix,
    pub users: IndexMapper<UserId>,
    pub items: IndexMapper<ItemId>,
}

impl RatingModel {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

/// Builds the rating matrix and its index mappers
///
/// A repeated (user, movie) pair keeps the last rating seen and logs a warning.
/// Fails when the records contain no users or no movies.
pub fn build(records: &[InteractionRecord]) -> AppResult<RatingModel> {
    let users = IndexMapper::from_ids(records.iter().map(|r| r.user_id));
    let items = IndexMapper::from_ids(records.iter().map(|r| r.item_id));

    if users.is_empty() || items.is_empty() {
        return Err(AppError::Configuration(
            "ratings contain no users or no movies; cannot build similarity matrix".to_string(),
        ));
    }

    // Keyed (column, row) so iteration order is already CSC order
    let mut cells: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    let mut duplicates = 0usize;

    for record in records {
        let (Some(row), Some(col)) = (
            users.index_of(&record.user_id),
            items.index_of(&record.item_id),
        ) else {
            continue;
        };

        if let Some(previous) = cells.insert((col, row), record.rating) {
            duplicates += 1;
            tracing::warn!(
                user_id = %record.user_id,
                item_id = %record.item_id,
                previous,
                rating = record.rating,
                "Duplicate rating, keeping the last one"
            );
        }
    }

    let n_rows = users.len();
    let n_cols = items.len();
    let mut col_ptr = vec![0usize; n_cols + 1];
    let mut row_idx = Vec::with_capacity(cells.len());
    let mut values = Vec::with_capacity(cells.len());

    for ((col, row), value) in cells {
        col_ptr[col + 1] += 1;
        row_idx.push(row);
        values.push(value);
    }
    for col in 0..n_cols {
        col_ptr[col + 1] += col_ptr[col];
    }

    let col_norms = (0..n_cols)
        .map(|col| {
            values[col_ptr[col]..col_ptr[col + 1]]
                .iter()
                .map(|v| v * v)
                .sum::<f64>()
                .sqrt()
        })
        .collect();

    let matrix = InteractionMatrix {
        n_rows,
        n_cols,
        col_ptr,
        row_idx,
        values,
        col_norms,
    };

    tracing::info!(
        users = n_rows,
        movies = n_cols,
        ratings = matrix.nnz(),
        duplicates,
        "Rating matrix built"
    );

    Ok(RatingModel {
        matrix,
        users,
        items,
    })
}
