//! Fuzzy matching of free-text values against closed reference lists
//!
//! Resolution walks a fixed chain of strategies and stops at the first hit:
//! exact, case-insensitive, curated alias, accent-folded, folded substring,
//! similarity ratio, edit distance, and finally an optional external resolver.
//! Whatever the chain returns is always a member of the reference list.
//!
//! Results are memoized per (raw value, list fingerprint) for the lifetime
//! of the matcher, so a changed list never yields a stale answer.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use tracing::{debug, warn};

use crate::domain::audit_config::MatcherSettings;
use crate::domain::resolver::ExternalResolver;
use crate::shared::similarity::{edit_distance, sequence_ratio};
use crate::shared::text::{fold, non_blank};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Value is already a list member
    Exact,
    /// "FUTBOL SOCCER" → "Futbol Soccer"
    CaseInsensitive,
    /// Curated misspelling table ("masculino" → "Varonil")
    Alias,
    /// Equal once accents, case and spacing are ignored
    Folded,
    /// One folded form contains the other
    Substring,
    /// Character similarity ratio above the threshold
    Similarity,
    /// Small Levenshtein distance between folded forms
    EditDistance,
    /// Answer from the external resolver
    External,
}

/// A resolved value and the strategy that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub value: String,
    pub strategy: MatchStrategy,
}

type CacheKey = (String, u64);

pub struct FuzzyMatcher {
    settings: MatcherSettings,
    /// Folded alias → canonical target
    aliases: HashMap<String, String>,
    external: Option<Box<dyn ExternalResolver>>,
    cache: HashMap<CacheKey, Option<MatchResult>>,
}

impl FuzzyMatcher {
    pub fn new(settings: MatcherSettings, aliases: &BTreeMap<String, String>) -> Self {
        let aliases = aliases
            .iter()
            .map(|(from, to)| (fold(from), to.clone()))
            .collect();

        Self {
            settings,
            aliases,
            external: None,
            cache: HashMap::new(),
        }
    }

    /// Consult `resolver` after every local strategy has failed
    pub fn with_external(mut self, resolver: Box<dyn ExternalResolver>) -> Self {
        self.external = Some(resolver);
        self
    }

    /// Resolve `raw` against `reference`, returning the canonical value
    pub fn resolve(&mut self, raw: &str, reference: &[String]) -> Option<String> {
        self.resolve_field("", raw, reference).map(|m| m.value)
    }

    /// Resolve `raw` for a named field. The field name is only passed on to
    /// the external resolver; it is not part of the cache key.
    pub fn resolve_field(
        &mut self,
        field: &str,
        raw: &str,
        reference: &[String],
    ) -> Option<MatchResult> {
        let key = (raw.to_string(), fingerprint(reference));
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let result = self.resolve_uncached(field, raw, reference);
        if let Some(m) = &result {
            debug!(field, raw, resolved = %m.value, strategy = ?m.strategy, "Value resolved");
        }
        self.cache.insert(key, result.clone());
        result
    }

    /// Number of memoized resolutions
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// For every field, the distinct non-blank values whose resolution differs
    /// from the raw value, mapped to that resolution.
    pub fn correct_batch(
        &mut self,
        values: &BTreeMap<String, Vec<String>>,
        lists: &BTreeMap<String, Vec<String>>,
    ) -> BTreeMap<String, BTreeMap<String, String>> {
        let mut corrections = BTreeMap::new();

        for (field, raw_values) in values {
            let Some(reference) = lists.get(field) else {
                continue;
            };

            let mut field_corrections = BTreeMap::new();
            for raw in raw_values {
                let Some(raw) = non_blank(Some(raw.as_str())) else {
                    continue;
                };
                if field_corrections.contains_key(raw) {
                    continue;
                }
                if let Some(m) = self.resolve_field(field, raw, reference) {
                    if m.value != raw {
                        field_corrections.insert(raw.to_string(), m.value);
                    }
                }
            }

            if !field_corrections.is_empty() {
                corrections.insert(field.clone(), field_corrections);
            }
        }

        corrections
    }

    fn resolve_uncached(
        &self,
        field: &str,
        raw: &str,
        reference: &[String],
    ) -> Option<MatchResult> {
        let raw = raw.trim();
        if raw.is_empty() || reference.is_empty() {
            return None;
        }

        let found = |value: &String, strategy| {
            Some(MatchResult {
                value: value.clone(),
                strategy,
            })
        };

        if let Some(option) = reference.iter().find(|option| option.as_str() == raw) {
            return found(option, MatchStrategy::Exact);
        }

        let lowered = raw.to_lowercase();
        if let Some(option) = reference.iter().find(|option| option.to_lowercase() == lowered) {
            return found(option, MatchStrategy::CaseInsensitive);
        }

        let folded = fold(raw);
        if let Some(target) = self.aliases.get(&folded) {
            if let Some(option) = reference.iter().find(|option| *option == target) {
                return found(option, MatchStrategy::Alias);
            }
        }

        let folded_reference: Vec<String> = reference.iter().map(|option| fold(option)).collect();

        if let Some(idx) = folded_reference.iter().position(|option| *option == folded) {
            return found(&reference[idx], MatchStrategy::Folded);
        }

        if folded.chars().count() > self.settings.min_substring_len {
            let contains = |option: &String| {
                !option.is_empty() && (option.contains(&folded) || folded.contains(option.as_str()))
            };
            if let Some(idx) = folded_reference.iter().position(contains) {
                return found(&reference[idx], MatchStrategy::Substring);
            }
        }

        if let Some(idx) = self.best_by_similarity(&lowered, &folded, reference, &folded_reference) {
            return found(&reference[idx], MatchStrategy::Similarity);
        }

        if let Some(idx) = self.best_by_edit_distance(&folded, &folded_reference) {
            return found(&reference[idx], MatchStrategy::EditDistance);
        }

        self.resolve_external(field, raw, reference)
    }

    /// Index of the highest ratio at or above the threshold; first wins ties
    fn best_by_similarity(
        &self,
        lowered: &str,
        folded: &str,
        reference: &[String],
        folded_reference: &[String],
    ) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;

        for (idx, (option, folded_option)) in reference.iter().zip(folded_reference).enumerate() {
            let score = sequence_ratio(lowered, &option.to_lowercase())
                .max(sequence_ratio(folded, folded_option));
            if score < self.settings.min_similarity {
                continue;
            }
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((idx, score));
            }
        }

        best.map(|(idx, _)| idx)
    }

    /// Index of the smallest distance within its length-based threshold;
    /// first wins ties
    fn best_by_edit_distance(&self, folded: &str, folded_reference: &[String]) -> Option<usize> {
        let value_len = folded.chars().count();
        let mut best: Option<(usize, usize)> = None;

        for (idx, option) in folded_reference.iter().enumerate() {
            let average = (value_len + option.chars().count()) as f64 / 2.0;
            let threshold = ((average * self.settings.edit_distance_ratio) as usize)
                .clamp(1, self.settings.max_edit_distance.max(1));

            let distance = edit_distance(folded, option);
            if distance > threshold {
                continue;
            }
            if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                best = Some((idx, distance));
            }
        }

        best.map(|(idx, _)| idx)
    }

    fn resolve_external(&self, field: &str, raw: &str, reference: &[String]) -> Option<MatchResult> {
        let resolver = self.external.as_ref()?;

        match resolver.resolve(raw, reference, field) {
            Ok(Some(answer)) => {
                let answer = answer.trim();
                match reference.iter().find(|option| option.as_str() == answer) {
                    Some(option) => Some(MatchResult {
                        value: option.clone(),
                        strategy: MatchStrategy::External,
                    }),
                    None => {
                        debug!(
                            resolver = resolver.name(),
                            answer,
                            "External answer is not in the reference list"
                        );
                        None
                    }
                }
            }
            Ok(None) => None,
            Err(e) => {
                warn!(
                    resolver = resolver.name(),
                    field,
                    error = %e,
                    "External resolver failed, keeping local result"
                );
                None
            }
        }
    }
}

/// Content hash of a reference list
fn fingerprint(reference: &[String]) -> u64 {
    let mut hasher = DefaultHasher::new();
    reference.hash(&mut hasher);
    hasher.finish()
}
