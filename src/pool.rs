use crate::history::HistoryLog;
use crate::models::{IdiomRecord, LearnerSettings};
use crate::sampling::unique_by;

/// Recency avoidance only applies if the filtered pool keeps at least
/// `min(count, RECENCY_FALLBACK_FLOOR)` candidates; otherwise the whole
/// category pool is used for this draw.
pub const RECENCY_FALLBACK_FLOOR: usize = 6;

/// Candidates for a draw: category filter, then recency, then uniqueness.
pub fn build_pool(
    items: &[IdiomRecord],
    settings: &LearnerSettings,
    history: &HistoryLog,
) -> Vec<IdiomRecord> {
    let mut pool: Vec<IdiomRecord> = items
        .iter()
        .filter(|it| settings.categories.allows(it.category))
        .cloned()
        .collect();

    if settings.avoid_days > 0 {
        let recent = history.recent_ids(&settings.learner, settings.avoid_days as usize);
        let filtered: Vec<IdiomRecord> = pool
            .iter()
            .filter(|it| !recent.contains(&it.id))
            .cloned()
            .collect();

        let floor = settings.count.min(RECENCY_FALLBACK_FLOOR);
        if filtered.len() >= floor {
            pool = filtered;
        } else {
            tracing::debug!(
                learner = %settings.learner,
                remaining = filtered.len(),
                floor,
                "too few fresh idioms, ignoring recent draws"
            );
        }
    }

    unique_by(pool, |it| it.id.clone())
}
