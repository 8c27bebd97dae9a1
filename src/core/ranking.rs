/// Ranking and grouping of palette results
///
/// Recently used commands come first, newest on top. Everything else follows
/// in alphabetical order.

use crate::core::candidate::{Candidate, OTHER_COMMANDS, RECENTLY_USED};
use crate::core::recency::RecencyStore;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Read-only view of usage counters
pub trait RecencyLookup {
    fn peek(&self, command_id: &str) -> Option<u64>;
}

impl RecencyLookup for RecencyStore {
    fn peek(&self, command_id: &str) -> Option<u64> {
        RecencyStore::peek(self, command_id)
    }
}

impl RecencyLookup for HashMap<String, u64> {
    fn peek(&self, command_id: &str) -> Option<u64> {
        self.get(command_id).copied()
    }
}

/// Orders candidates by recency, then by label
pub struct RankingPolicy<'a> {
    history: &'a dyn RecencyLookup,
}

impl<'a> RankingPolicy<'a> {
    pub fn new(history: &'a dyn RecencyLookup) -> Self {
        Self { history }
    }

    pub fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering {
        compare_keys(
            self.history.peek(&a.command_id),
            &a.label.to_lowercase(),
            self.history.peek(&b.command_id),
            &b.label.to_lowercase(),
        )
    }

    /// Stable sort; equal entries keep their incoming order
    pub fn rank(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        // Look every counter up once instead of on each comparison
        let mut keyed: Vec<(Option<u64>, String, Candidate)> = candidates
            .into_iter()
            .map(|c| (self.history.peek(&c.command_id), c.label.to_lowercase(), c))
            .collect();

        keyed.sort_by(|(ca, la, _), (cb, lb, _)| compare_keys(*ca, la, *cb, lb));

        keyed.into_iter().map(|(_, _, c)| c).collect()
    }

    /// Label the recently used block and the block after it
    ///
    /// Only applies when the top entry has a counter. The first entry
    /// without one starts "other commands" and carries the separator.
    pub fn group(&self, candidates: &mut [Candidate]) {
        let starts_recent = candidates
            .first()
            .is_some_and(|first| self.history.peek(&first.command_id).is_some());
        if !starts_recent {
            return;
        }

        let mut in_recent = true;
        for (index, candidate) in candidates.iter_mut().enumerate() {
            if in_recent && self.history.peek(&candidate.command_id).is_none() {
                in_recent = false;
                candidate.separator = true;
            } else {
                candidate.separator = index == 0;
            }

            let label = if in_recent { RECENTLY_USED } else { OTHER_COMMANDS };
            candidate.group_label = Some(label.to_string());
        }
    }
}

fn compare_keys(ca: Option<u64>, la: &str, cb: Option<u64>, lb: &str) -> Ordering {
    match (ca, cb) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => la.cmp(lb),
    }
}
