//! # Assistant façade
//!
//! The surface the presentation layer talks to. Wires the conversation
//! manager (threads, history, answer cache) to the orchestrator (retrieval,
//! generation, fallback) and enforces the cross-cutting rules:
//!
//! - the user's message is persisted before generation is attempted, so a
//!   generation failure leaves the question on the thread with no reply
//!   rather than losing it;
//! - the cache is consulted before generating, unless a regenerate request
//!   bypasses it exactly once;
//! - a successful suggestion run writes its first suggestion back into the
//!   cache;
//! - the assistant turn is only persisted when the user picks a suggestion.

use tracing::info;

use crate::conversation::ConversationManager;
use crate::error::AssistantError;
use crate::index::IndexStatus;
use crate::inquiry::ExtractedInquiry;
use crate::models::Sender;
use crate::orchestrator::{Generator, Orchestrator, Retriever, SourceDocument};
use crate::session_state::SessionState;

/// One round of suggestions for a question, however they were produced.
#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub conversation_id: String,
    pub suggestions: Vec<String>,
    pub sources: Vec<SourceDocument>,
    /// True when the reply came from the answer cache.
    pub cached: bool,
    /// Cache similarity for cached replies.
    pub similarity: Option<f64>,
    /// True when the suggestion call failed and the single-answer fallback
    /// produced this reply.
    pub fallback: bool,
}

pub struct Assistant<R, G> {
    manager: ConversationManager,
    orchestrator: Orchestrator<R, G>,
    cache_similarity_threshold: f64,
    num_suggestions: usize,
}

impl<R: Retriever, G: Generator> Assistant<R, G> {
    pub fn new(
        manager: ConversationManager,
        orchestrator: Orchestrator<R, G>,
        cache_similarity_threshold: f64,
        num_suggestions: usize,
    ) -> Self {
        Self {
            manager,
            orchestrator,
            cache_similarity_threshold,
            num_suggestions,
        }
    }

    pub fn index_status(&self) -> IndexStatus {
        self.orchestrator.index_status()
    }

    pub fn manager_mut(&mut self) -> &mut ConversationManager {
        &mut self.manager
    }

    /// Answer a question on the session's current thread (creating one if
    /// needed): persist the user turn, consult the cache, generate through
    /// the fallback chain, and cache the result.
    pub async fn ask(
        &mut self,
        state: &mut SessionState,
        question: &str,
        client_name: Option<&str>,
    ) -> Result<AssistantReply, AssistantError> {
        state.busy = true;
        let result = self.ask_inner(state, question, client_name).await;
        state.busy = false;
        result
    }

    /// Answer an OCR-extracted inquiry, using its effective text and client
    /// name.
    pub async fn ask_extracted(
        &mut self,
        state: &mut SessionState,
        payload: &ExtractedInquiry,
    ) -> Result<AssistantReply, AssistantError> {
        let question = payload.effective_inquiry().to_string();
        let client_name = payload.client_name().map(str::to_string);
        self.ask(state, &question, client_name.as_deref()).await
    }

    async fn ask_inner(
        &mut self,
        state: &mut SessionState,
        question: &str,
        client_name: Option<&str>,
    ) -> Result<AssistantReply, AssistantError> {
        let conversation_id = match &state.current_thread {
            Some(id) => id.clone(),
            None => {
                let id = self.manager.create_thread(None)?;
                state.current_thread = Some(id.clone());
                id
            }
        };

        // Prior turns only; the current question goes into the prompt as
        // the question itself.
        let context_text = self.manager.get_context_text(&conversation_id)?;

        self.manager
            .add_message(&conversation_id, Sender::User, question)?;

        let bypass_cache = state.take_regenerate();
        if !bypass_cache {
            if let Some(hit) = self
                .manager
                .find_cached(question, self.cache_similarity_threshold)
            {
                info!(similarity = hit.similarity, "answer served from cache");
                return Ok(AssistantReply {
                    conversation_id,
                    suggestions: vec![hit.answer],
                    sources: hit.source_documents,
                    cached: true,
                    similarity: Some(hit.similarity),
                    fallback: false,
                });
            }
        }

        let set = self
            .orchestrator
            .respond(question, client_name, &context_text, self.num_suggestions)
            .await?;

        if !set.fallback {
            if let Some(first) = set.suggestions.first() {
                self.manager
                    .cache_answer(question, first, set.sources.clone())?;
            }
        }

        Ok(AssistantReply {
            conversation_id,
            suggestions: set.suggestions,
            sources: set.sources,
            cached: false,
            similarity: None,
            fallback: set.fallback,
        })
    }

    /// Persist the suggestion the user picked as the assistant turn.
    pub fn record_selection(
        &mut self,
        state: &mut SessionState,
        conversation_id: &str,
        reply: &AssistantReply,
    ) -> Result<Option<i32>, AssistantError> {
        let Some(index) = state.take_selected_suggestion() else {
            return Ok(None);
        };
        let Some(suggestion) = reply.suggestions.get(index) else {
            return Ok(None);
        };
        let position = self
            .manager
            .add_message(conversation_id, Sender::Assistant, suggestion)?;
        Ok(Some(position))
    }
}
