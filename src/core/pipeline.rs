/// Query pipeline for the command palette
///
/// One query runs through aggregation, filtering, de-duplication,
/// disambiguation, ranking and grouping, in that order. Only the very first
/// query may wait, and only for the command registry.

use crate::core::aggregator::{CandidateAggregator, LocalActionProvider, RawCandidate};
use crate::core::candidate::Candidate;
use crate::core::matcher::{match_candidate, MatchHighlights};
use crate::core::ranking::RankingPolicy;
use crate::core::readiness::ReadinessGate;
use crate::core::recency::RecencyStore;
use crate::core::registry::CommandRegistry;
use crate::error::Result;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Looks up the keybinding shown next to a command
pub trait KeybindingResolver: Send + Sync {
    fn keybinding_label(&self, command_id: &str) -> Option<String>;
}

impl KeybindingResolver for HashMap<String, String> {
    fn keybinding_label(&self, command_id: &str) -> Option<String> {
        self.get(command_id).cloned()
    }
}

/// Text of the most recent query, shared by everything that opens the palette
#[derive(Debug, Default)]
pub struct LastQuery {
    text: Mutex<String>,
}

impl LastQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> String {
        match self.text.lock() {
            Ok(text) => text.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, query: &str) {
        let mut text = match self.text.lock() {
            Ok(text) => text,
            Err(poisoned) => poisoned.into_inner(),
        };
        *text = query.to_string();
    }
}

pub struct ResultPipeline {
    registry: Arc<CommandRegistry>,
    history: Arc<RecencyStore>,
    aggregator: CandidateAggregator,
    gate: Arc<ReadinessGate>,
    keybindings: Option<Arc<dyn KeybindingResolver>>,
    last_query: Arc<LastQuery>,
}

impl ResultPipeline {
    pub fn new(
        registry: Arc<CommandRegistry>,
        history: Arc<RecencyStore>,
        aggregator: CandidateAggregator,
    ) -> Self {
        Self {
            registry,
            history,
            aggregator,
            gate: Arc::new(ReadinessGate::new()),
            keybindings: None,
            last_query: Arc::new(LastQuery::new()),
        }
    }

    pub fn with_keybindings(mut self, resolver: Arc<dyn KeybindingResolver>) -> Self {
        self.keybindings = Some(resolver);
        self
    }

    /// Share the first-query wait with other palette sessions, so only the
    /// first query of the process waits
    pub fn with_gate(mut self, gate: Arc<ReadinessGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Share the last-query slot with other palette sessions
    pub fn with_last_query(mut self, last_query: Arc<LastQuery>) -> Self {
        self.last_query = last_query;
        self
    }

    pub fn last_query(&self) -> String {
        self.last_query.get()
    }

    /// Run one query
    ///
    /// # Arguments
    /// * `query` - Raw input text
    /// * `context` - Surface whose own actions are listed first, if any
    /// * `cancel` - Checked on entry and again after the first-query wait
    ///
    /// # Returns
    /// Ranked, grouped candidates; empty when cancelled
    pub async fn search(
        &self,
        query: &str,
        context: Option<&dyn LocalActionProvider>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candidate>> {
        if cancel.is_cancelled() {
            return Ok(Vec::new());
        }

        let query = query.trim();
        self.last_query.set(query);

        self.gate.pass(&self.registry).await;
        if cancel.is_cancelled() {
            tracing::debug!(query, "query cancelled while waiting for the registry");
            return Ok(Vec::new());
        }

        let raw = self.aggregator.collect(context, &self.registry)?;
        let collected = raw.len();

        let matched = filter(query, raw);
        let matched_count = matched.len();

        let mut candidates = dedupe(matched);
        disambiguate(&mut candidates);

        if let Some(resolver) = &self.keybindings {
            for candidate in &mut candidates {
                candidate.keybinding = resolver.keybinding_label(&candidate.command_id);
            }
        }

        let policy = RankingPolicy::new(self.history.as_ref());
        let mut ranked = policy.rank(candidates);
        policy.group(&mut ranked);

        tracing::debug!(
            query,
            collected,
            matched = matched_count,
            returned = ranked.len(),
            "palette query finished"
        );

        Ok(ranked)
    }
}

fn filter(query: &str, raw: Vec<RawCandidate>) -> Vec<Candidate> {
    raw.into_iter()
        .filter_map(|candidate| {
            let highlights =
                match_candidate(query, &candidate.label, candidate.alias.as_deref()).or_else(
                    || (candidate.command_id == query).then(MatchHighlights::default),
                )?;
            Some(Candidate::from_raw(candidate, highlights))
        })
        .collect()
}

// First occurrence wins
fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| {
            seen.insert((
                c.label.clone(),
                c.group_label.clone(),
                c.command_id.clone(),
            ))
        })
        .collect()
}

// Entries that would look identical get their command id as description.
// Order is left alone.
fn disambiguate(candidates: &mut [Candidate]) {
    let mut counts: HashMap<(String, Option<String>), usize> = HashMap::new();
    for c in candidates.iter() {
        *counts
            .entry((c.label.clone(), c.group_label.clone()))
            .or_default() += 1;
    }

    for c in candidates.iter_mut() {
        let key = (c.label.clone(), c.group_label.clone());
        if counts.get(&key).copied().unwrap_or(0) > 1 {
            c.description = Some(c.command_id.clone());
        }
    }
}
