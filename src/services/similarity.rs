/// Brute-force nearest-neighbour search over movie rating vectors
///
/// Every query scans all columns of the matrix: O(movies x users) in the worst case.
/// Adequate for catalogs in the thousands; there is no approximate index.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::{
    error::{AppError, AppResult},
    models::{ItemId, Neighbor},
    services::rating_matrix::{RatingModel, SparseColumn},
};

/// Distance between two movie vectors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// 1 - cosine similarity. A zero vector is at distance 1 from everything.
    #[default]
    Cosine,
    /// L2 distance
    Euclidean,
}

impl DistanceMetric {
    pub fn distance(
        &self,
        a: SparseColumn<'_>,
        a_norm: f64,
        b: SparseColumn<'_>,
        b_norm: f64,
    ) -> f64 {
        let dot = sparse_dot(a, b);
        match self {
            DistanceMetric::Cosine => {
                if a_norm == 0.0 || b_norm == 0.0 {
                    1.0
                } else {
                    (1.0 - dot / (a_norm * b_norm)).clamp(0.0, 2.0)
                }
            }
            DistanceMetric::Euclidean => {
                (a_norm * a_norm + b_norm * b_norm - 2.0 * dot)
                    .max(0.0)
                    .sqrt()
            }
        }
    }
}

fn sparse_dot(a: SparseColumn<'_>, b: SparseColumn<'_>) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut dot = 0.0;
    while i < a.nnz() && j < b.nnz() {
        match a.rows[i].cmp(&b.rows[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                dot += a.values[i] * b.values[j];
                i += 1;
                j += 1;
            }
        }
    }
    dot
}

fn by_distance_then_index(a: &(usize, f64), b: &(usize, f64)) -> Ordering {
    a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
}

/// Finds the `k` movies closest to `item_id`, nearest first
///
/// Returns `min(k, movies - 1)` neighbours and never the query movie itself. Equal
/// distances are ordered by matrix index, so results are deterministic.
pub fn nearest_neighbors(
    model: &RatingModel,
    item_id: ItemId,
    k: usize,
    metric: DistanceMetric,
) -> AppResult<Vec<Neighbor>> {
    let query = model
        .items
        .index_of(&item_id)
        .ok_or(AppError::UnknownItem(item_id))?;

    let matrix = &model.matrix;
    let query_column = matrix.column(query);
    let query_norm = matrix.column_norm(query);

    let mut scored: Vec<(usize, f64)> = (0..matrix.n_cols())
        .map(|col| {
            let distance =
                metric.distance(query_column, query_norm, matrix.column(col), matrix.column_norm(col));
            (col, distance)
        })
        .collect();

    // k + 1 candidates so the query can be dropped by identity wherever it landed
    let wanted = k.saturating_add(1).min(scored.len());
    if wanted < scored.len() {
        scored.select_nth_unstable_by(wanted - 1, by_distance_then_index);
        scored.truncate(wanted);
    }
    scored.sort_by(by_distance_then_index);

    let neighbors: Vec<Neighbor> = scored
        .into_iter()
        .filter(|(col, _)| *col != query)
        .take(k)
        .filter_map(|(col, distance)| {
            model
                .items
                .id_at(col)
                .map(|item_id| Neighbor { item_id, distance })
        })
        .collect();

    tracing::debug!(
        item_id = %item_id,
        k,
        metric = ?metric,
        returned = neighbors.len(),
        "Nearest neighbours computed"
    );

    Ok(neighbors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InteractionRecord;
    use crate::services::rating_matrix::build;

    fn scenario_model() -> RatingModel {
        build(&[
            InteractionRecord::new(1, 1, 5.0),
            InteractionRecord::new(1, 2, 3.0),
            InteractionRecord::new(2, 1, 4.0),
            InteractionRecord::new(2, 3, 1.0),
        ])
        .unwrap()
    }

    fn larger_model() -> RatingModel {
        let records: Vec<InteractionRecord> = (0..400u32)
            .map(|i| InteractionRecord::new(i % 31, (i * 13) % 47 + 1, ((i * 7) % 9) as f64 * 0.5 + 0.5))
            .collect();
        build(&records).unwrap()
    }

    #[test]
    fn test_scenario_cosine_picks_closest_vector() {
        // i1 = [5, 4], i2 = [3, 0], i3 = [0, 1]
        // cos(i1, i2) = 15 / (sqrt(41) * 3) ~ 0.78, cos(i1, i3) = 4 / sqrt(41) ~ 0.62
        let model = scenario_model();
        let neighbors = nearest_neighbors(&model, ItemId(1), 1, DistanceMetric::Cosine).unwrap();
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].item_id, ItemId(2));
        let expected = 1.0 - 15.0 / (41f64.sqrt() * 3.0);
        assert!((neighbors[0].distance - expected).abs() < 1e-12);
    }

    #[test]
    fn test_scenario_euclidean() {
        let model = scenario_model();
        let neighbors =
            nearest_neighbors(&model, ItemId(1), 2, DistanceMetric::Euclidean).unwrap();
        let ids: Vec<ItemId> = neighbors.iter().map(|n| n.item_id).collect();
        assert_eq!(ids, vec![ItemId(2), ItemId(3)]);
        assert!((neighbors[0].distance - 20f64.sqrt()).abs() < 1e-9);
        assert!((neighbors[1].distance - 34f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_never_returns_query_and_length_is_min_k() {
        let model = larger_model();
        let n = model.item_count();

        for &item_id in model.items.ids() {
            for k in [1, 5, n - 1, n, n + 10] {
                for metric in [DistanceMetric::Cosine, DistanceMetric::Euclidean] {
                    let neighbors = nearest_neighbors(&model, item_id, k, metric).unwrap();
                    assert_eq!(neighbors.len(), k.min(n - 1));
                    assert!(neighbors.iter().all(|nb| nb.item_id != item_id));
                }
            }
        }
    }

    #[test]
    fn test_distances_non_decreasing() {
        let model = larger_model();
        for &item_id in model.items.ids().iter().take(10) {
            let neighbors =
                nearest_neighbors(&model, item_id, 20, DistanceMetric::Cosine).unwrap();
            assert!(neighbors
                .windows(2)
                .all(|pair| pair[0].distance <= pair[1].distance));
        }
    }

    #[test]
    fn test_identical_vectors_do_not_displace_query_filtering() {
        // Movies 1, 2 and 3 have identical vectors, so all sit at distance 0 from each other
        let model = build(&[
            InteractionRecord::new(1, 1, 4.0),
            InteractionRecord::new(1, 2, 4.0),
            InteractionRecord::new(1, 3, 4.0),
            InteractionRecord::new(2, 4, 1.0),
        ])
        .unwrap();

        let neighbors = nearest_neighbors(&model, ItemId(3), 2, DistanceMetric::Cosine).unwrap();
        let ids: Vec<ItemId> = neighbors.iter().map(|n| n.item_id).collect();
        assert_eq!(ids, vec![ItemId(1), ItemId(2)]);
    }

    #[test]
    fn test_zero_vector_still_fills_result() {
        let model = build(&[
            InteractionRecord::new(1, 1, 0.0),
            InteractionRecord::new(1, 2, 3.0),
            InteractionRecord::new(2, 3, 2.0),
        ])
        .unwrap();

        let neighbors = nearest_neighbors(&model, ItemId(1), 2, DistanceMetric::Cosine).unwrap();
        assert_eq!(neighbors.len(), 2);
        assert!(neighbors.iter().all(|nb| nb.distance == 1.0));
    }

    #[test]
    fn test_unknown_item() {
        let model = scenario_model();
        let result = nearest_neighbors(&model, ItemId(999), 3, DistanceMetric::Cosine);
        assert!(matches!(result, Err(AppError::UnknownItem(ItemId(999)))));
    }

    #[test]
    fn test_single_movie_has_no_neighbours() {
        let model = build(&[InteractionRecord::new(1, 1, 3.0)]).unwrap();
        let neighbors = nearest_neighbors(&model, ItemId(1), 5, DistanceMetric::Cosine).unwrap();
        assert!(neighbors.is_empty());
    }

    #[test]
    fn test_metric_deserializes_lowercase() {
        let metric: DistanceMetric = serde_json::from_str("\"euclidean\"").unwrap();
        assert_eq!(metric, DistanceMetric::Euclidean);
    }
}
