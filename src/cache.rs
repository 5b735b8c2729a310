//! # Answer cache (fuzzy match)
//!
//! Avoids recomputation for repeated or near-repeated questions.
//!
//! Keys are a sha256 digest of the *normalized* question (lowercased,
//! internal whitespace runs collapsed to single spaces). Lookup first tries
//! the exact key; failing that it scans every entry and scores the Jaccard
//! similarity of the whitespace-tokenized, lowercased word sets of query and
//! cached question. The scan is O(n·m) per lookup — acceptable at the
//! hundreds-to-low-thousands of entries this system targets, flagged as a
//! scaling limit rather than redesigned.
//!
//! Entries accumulate without eviction; duplicate hashes overwrite. The
//! whole map is written through to `question_cache.json` on every store, so
//! the cache survives restarts. Concurrent readers may or may not observe an
//! in-flight insert; entries are additive facts and never invalidated, so
//! that is not a problem.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::AssistantError;
use crate::orchestrator::SourceDocument;

const CACHE_FILE: &str = "question_cache.json";

/// One cached question/answer pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The question exactly as originally asked.
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub source_documents: Vec<SourceDocument>,
    pub created_at: String,
}

/// A successful cache lookup.
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub answer: String,
    pub source_documents: Vec<SourceDocument>,
    /// 1.0 for an exact key match, otherwise the Jaccard score.
    pub similarity: f64,
    pub original_question: String,
}

/// Persistent question/answer cache keyed by normalized-text hash.
pub struct AnswerCache {
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

/// Lowercase and collapse internal whitespace runs to single spaces.
fn normalize(question: &str) -> String {
    question
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cache key for a question.
fn hash_question(question: &str) -> String {
    sha256::digest(normalize(question))
}

fn token_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// `|A∩B| / |A∪B|`; 0.0 when either set is empty.
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

impl AnswerCache {
    /// Open the cache under `cache_dir`, creating the directory if needed
    /// and loading any existing `question_cache.json`. A corrupt file is
    /// treated as empty rather than fatal.
    pub fn open(cache_dir: &Path) -> Result<Self, AssistantError> {
        fs::create_dir_all(cache_dir)?;
        let path = cache_dir.join(CACHE_FILE);

        let entries = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(raw) => match serde_json::from_str(&raw) {
                    Ok(entries) => entries,
                    Err(e) => {
                        warn!("question cache unreadable, starting empty: {e}");
                        HashMap::new()
                    }
                },
                Err(e) => {
                    warn!("question cache unreadable, starting empty: {e}");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self { path, entries })
    }

    /// Look up a question, fuzzily.
    ///
    /// 1. Exact normalized-hash match returns immediately with
    ///    `similarity == 1.0`.
    /// 2. Otherwise every cached entry is scored by Jaccard word-set
    ///    overlap; the best score at or above `threshold` wins. An empty
    ///    cached token set scores 0 (never a division by zero).
    pub fn find_similar(&self, question: &str, threshold: f64) -> Option<CacheHit> {
        let key = hash_question(question);
        if let Some(entry) = self.entries.get(&key) {
            debug!("cache: exact hit");
            return Some(CacheHit {
                answer: entry.answer.clone(),
                source_documents: entry.source_documents.clone(),
                similarity: 1.0,
                original_question: entry.question.clone(),
            });
        }

        let query_tokens = token_set(question);
        let mut best: Option<(&CacheEntry, f64)> = None;

        for entry in self.entries.values() {
            let cached_tokens = token_set(&entry.question);
            if cached_tokens.is_empty() {
                continue;
            }
            let similarity = jaccard(&query_tokens, &cached_tokens);
            if similarity >= threshold && best.map_or(true, |(_, s)| similarity > s) {
                best = Some((entry, similarity));
            }
        }

        best.map(|(entry, similarity)| {
            debug!(similarity, "cache: fuzzy hit");
            CacheHit {
                answer: entry.answer.clone(),
                source_documents: entry.source_documents.clone(),
                similarity,
                original_question: entry.question.clone(),
            }
        })
    }

    /// Insert or overwrite the entry for `question` and persist immediately.
    pub fn store(
        &mut self,
        question: &str,
        answer: &str,
        source_documents: Vec<SourceDocument>,
    ) -> Result<(), AssistantError> {
        let key = hash_question(question);
        self.entries.insert(
            key,
            CacheEntry {
                question: question.to_string(),
                answer: answer.to_string(),
                source_documents,
                created_at: Utc::now().to_rfc3339(),
            },
        );
        self.persist()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) -> Result<(), AssistantError> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| AssistantError::Config(e.to_string()))?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
