//! Ranker (SPEC_FULL.md §4.4): re-scores full-text candidates with time
//! decay and an access-count boost, on top of the full-text engine's raw
//! BM25 rank.

use crate::model::Memory;

/// Default decay rate, giving roughly a 90-day half-life.
pub const DEFAULT_DECAY_RATE: f64 = 0.0077;

/// A full-text candidate row before re-ranking.
pub struct CandidateHit {
    pub memory: Memory,
    /// The full-text engine's raw BM25 rank; conventionally negative, more
    /// negative is better.
    pub base_rank: f64,
}

/// A candidate after re-ranking.
pub struct RankedHit {
    pub memory: Memory,
    pub final_rank: f64,
}

fn age_days(now: i64, time_created: i64) -> f64 {
    ((now - time_created).max(0) as f64) / 86_400.0
}

fn decay_factor(age_days: f64, decay_rate: f64) -> f64 {
    1.0 / (1.0 + age_days * decay_rate)
}

fn access_boost(access_count: i64) -> f64 {
    1.0 + (1.0 + access_count as f64).log2() * 0.1
}

/// Re-rank already-fetched candidates, preserving their original order as
/// the tie-break, and truncate to `limit`.
#[must_use]
pub fn rerank(hits: Vec<CandidateHit>, now: i64, limit: usize) -> Vec<RankedHit> {
    let mut scored: Vec<(usize, RankedHit)> = hits
        .into_iter()
        .enumerate()
        .map(|(idx, hit)| {
            let age = age_days(now, hit.memory.time_created);
            let decay = decay_factor(age, DEFAULT_DECAY_RATE);
            let boost = access_boost(hit.memory.access_count);
            let final_rank = hit.base_rank / (decay * boost);
            (
                idx,
                RankedHit {
                    memory: hit.memory,
                    final_rank,
                },
            )
        })
        .collect();

    scored.sort_by(|a, b| {
        a.1.final_rank
            .partial_cmp(&b.1.final_rank)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(limit);
    scored.into_iter().map(|(_, hit)| hit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(time_created: i64, access_count: i64) -> Memory {
        Memory {
            id: uuid::Uuid::new_v4().to_string(),
            content: "content".to_string(),
            category: "general".to_string(),
            session_id: None,
            project_id: None,
            source: None,
            time_created,
            time_updated: time_created,
            access_count,
            time_last_accessed: None,
        }
    }

    #[test]
    fn fresher_memory_with_equal_base_rank_outranks_older() {
        let now = 1_000_000;
        let fresh = CandidateHit {
            memory: memory(now - 1_000, 0),
            base_rank: -5.0,
        };
        let old = CandidateHit {
            memory: memory(now - 10_000_000, 0),
            base_rank: -5.0,
        };
        let ranked = rerank(vec![old, fresh], now, 10);
        assert!(ranked[0].final_rank < ranked[1].final_rank);
    }

    #[test]
    fn higher_access_count_outranks_lower_at_equal_age() {
        let now = 1_000_000;
        let popular = CandidateHit {
            memory: memory(now - 10_000, 50),
            base_rank: -5.0,
        };
        let obscure = CandidateHit {
            memory: memory(now - 10_000, 0),
            base_rank: -5.0,
        };
        let ranked = rerank(vec![obscure, popular], now, 10);
        assert!(ranked[0].final_rank < ranked[1].final_rank);
    }

    #[test]
    fn truncates_to_limit() {
        let now = 1_000_000;
        let hits: Vec<_> = (0..10)
            .map(|i| CandidateHit {
                memory: memory(now - i * 1000, 0),
                base_rank: -1.0 - f64::from(i as u32),
            })
            .collect();
        let ranked = rerank(hits, now, 3);
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn ties_preserve_original_order() {
        let now = 1_000_000;
        let a = CandidateHit {
            memory: memory(now, 0),
            base_rank: -5.0,
        };
        let b = CandidateHit {
            memory: memory(now, 0),
            base_rank: -5.0,
        };
        let a_id = a.memory.id.clone();
        let b_id = b.memory.id.clone();
        let ranked = rerank(vec![a, b], now, 10);
        assert_eq!(ranked[0].memory.id, a_id);
        assert_eq!(ranked[1].memory.id, b_id);
    }
}
