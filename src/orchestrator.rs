//! # Retrieval-augmented generation orchestrator
//!
//! Turns a question (plus optional client name and prior conversation text)
//! into either a single grounded answer or N independently-toned response
//! suggestions, with source attribution and a one-hop fallback:
//! `suggest` → `answer` as a single-suggestion result → terminal
//! [`AssistantError::GenerationFailure`]. No retries beyond that single hop.
//!
//! The two collaborators are trait seams: a [`Retriever`] over the document
//! index and a [`Generator`] over the language model. Each user-visible call
//! blocks on at most one retrieval and one-or-two generations; there is no
//! background work and no cancellation below the transport boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AssistantError;
use crate::index::IndexStatus;
use crate::prompts;
use crate::suggestions::parse_suggestions;

/// Per-chunk budget when splicing retrieved content into a prompt.
const CONTEXT_CHARS_PER_CHUNK: usize = 800;
/// Per-source budget when attributing sources back to the caller.
const SOURCE_CONTENT_CHARS: usize = 400;
/// Generations shorter than this are rejected outright.
const MIN_GENERATION_CHARS: usize = 10;

/// What the retriever hands back for one matching chunk.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Default)]
pub struct ChunkMetadata {
    /// Originating file path, as ingested.
    pub source: Option<String>,
    pub total_pages: Option<u32>,
}

/// A source attribution after post-processing: content capped at 400
/// characters, path and extension stripped from the name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceDocument {
    pub content: String,
    pub source: String,
    #[serde(default)]
    pub metadata: SourceMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SourceMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
}

/// A single grounded answer with its sources.
#[derive(Debug, Clone)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<SourceDocument>,
}

/// N candidate replies with shared sources.
#[derive(Debug, Clone)]
pub struct SuggestionSet {
    pub suggestions: Vec<String>,
    pub sources: Vec<SourceDocument>,
    /// True when the suggestion call failed and this set came from the
    /// single-answer fallback.
    pub fallback: bool,
}

/// Document lookup over the index.
#[async_trait]
pub trait Retriever {
    /// Top-K chunks for a question, in the retriever's own relevance order.
    async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedChunk>, AssistantError>;

    fn index_status(&self) -> IndexStatus;
}

/// Text generation over the language model.
#[async_trait]
pub trait Generator {
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError>;
}

/// Concatenate up to the first 800 characters of each chunk, blank-line
/// joined, in retrieval order. This block is the literal `context`
/// substitution in every prompt.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.content.chars().take(CONTEXT_CHARS_PER_CHUNK).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Strip path separators and the extension from a source name.
fn clean_source_name(raw: &str) -> String {
    let basename = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    match basename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => basename.to_string(),
    }
}

fn attribute_sources(chunks: &[RetrievedChunk]) -> Vec<SourceDocument> {
    chunks
        .iter()
        .map(|chunk| {
            let content: String = if chunk.content.chars().count() > SOURCE_CONTENT_CHARS {
                let mut truncated: String =
                    chunk.content.chars().take(SOURCE_CONTENT_CHARS).collect();
                truncated.push_str("...");
                truncated
            } else {
                chunk.content.clone()
            };
            SourceDocument {
                content,
                source: chunk
                    .metadata
                    .source
                    .as_deref()
                    .map(clean_source_name)
                    .unwrap_or_else(|| "Document".to_string()),
                metadata: SourceMetadata {
                    pages: chunk.metadata.total_pages,
                },
            }
        })
        .collect()
}

/// The orchestration layer proper: retrieval, prompting, parsing, fallback.
pub struct Orchestrator<R, G> {
    retriever: R,
    generator: G,
}

impl<R: Retriever, G: Generator> Orchestrator<R, G> {
    pub fn new(retriever: R, generator: G) -> Self {
        Self { retriever, generator }
    }

    /// Whether the document index exists and how many documents it holds.
    pub fn index_status(&self) -> IndexStatus {
        self.retriever.index_status()
    }

    /// One grounded answer for a question.
    pub async fn answer(
        &self,
        question: &str,
        conversation_context: &str,
    ) -> Result<Answer, AssistantError> {
        let chunks = self.retriever.retrieve(question).await?;
        let context = format_context(&chunks);
        let prompt = prompts::qa_prompt(&context, conversation_context, question);

        let answer = self.generator.generate(&prompt).await?;
        Ok(Answer {
            answer,
            sources: attribute_sources(&chunks),
        })
    }

    /// Exactly `n` response suggestions for a client inquiry, from one
    /// generation.
    pub async fn suggest(
        &self,
        question: &str,
        client_name: Option<&str>,
        conversation_context: &str,
        n: usize,
    ) -> Result<SuggestionSet, AssistantError> {
        info!(n, question, "generating suggestions");
        let chunks = self.retriever.retrieve(question).await?;
        let context = format_context(&chunks);
        let prompt =
            prompts::suggestion_prompt(n, client_name, conversation_context, &context, question);

        let raw = self.generator.generate(&prompt).await?;
        if raw.trim().len() < MIN_GENERATION_CHARS {
            return Err(AssistantError::EmptyGeneration);
        }

        Ok(SuggestionSet {
            suggestions: parse_suggestions(&raw, n),
            sources: attribute_sources(&chunks),
            fallback: false,
        })
    }

    /// The UI-facing call: try `suggest`; on any failure fall back to
    /// `answer` once, wrapping it as a single-suggestion set; if that also
    /// fails, surface a terminal failure with the triggering cause attached.
    pub async fn respond(
        &self,
        question: &str,
        client_name: Option<&str>,
        conversation_context: &str,
        n: usize,
    ) -> Result<SuggestionSet, AssistantError> {
        match self.suggest(question, client_name, conversation_context, n).await {
            Ok(set) => Ok(set),
            Err(suggest_err) => {
                warn!(error = %suggest_err, "suggestion call failed, falling back to single answer");
                match self.answer(question, conversation_context).await {
                    Ok(answer) => Ok(SuggestionSet {
                        suggestions: vec![answer.answer],
                        sources: answer.sources,
                        fallback: true,
                    }),
                    Err(answer_err) => Err(answer_err.into_terminal()),
                }
            }
        }
    }
}
