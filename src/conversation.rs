//! # Conversation manager
//!
//! Thread lifecycle and message bookkeeping layered over the [`Store`].
//! Owns the [`AnswerCache`] and the owner scope: every read is filtered to
//! the owner this manager was built for, so a caller can never observe
//! another user's threads — unknown or foreign ids read back as empty, not
//! as errors.
//!
//! A message addressed to a nonexistent thread silently creates the thread
//! first. The store itself is strict about this; the leniency lives only
//! here.

use tracing::{debug, info};

use crate::cache::{AnswerCache, CacheHit};
use crate::error::AssistantError;
use crate::models::{Message, Sender};
use crate::orchestrator::SourceDocument;
use crate::store::{Store, short_hex};

const TITLE_MAX_CHARS: usize = 100;
const DEFAULT_HISTORY_LIMIT: usize = 10;
const UNTITLED: &str = "Untitled Conversation";

/// One row of the thread listing.
#[derive(Debug, Clone)]
pub struct ThreadSummary {
    pub id: String,
    /// The stored title, or `"Untitled Conversation"` when none is set yet.
    pub title: String,
    pub created_at: String,
    pub message_count: i64,
}

/// Thread lifecycle, message append/ordering, topic derivation, and cache
/// lookup/insert for one owner scope.
pub struct ConversationManager {
    store: Store,
    cache: AnswerCache,
    /// `None` in anonymous/single-user mode, where every thread is visible.
    owner: Option<String>,
    listing: Vec<ThreadSummary>,
}

impl ConversationManager {
    pub fn new(store: Store, cache: AnswerCache, owner: Option<String>) -> Self {
        Self {
            store,
            cache,
            owner,
            listing: Vec::new(),
        }
    }

    /// Create a thread, generating a `CNV_<12 hex>` id when none is given.
    ///
    /// Creation is idempotent at the store level, so passing an existing id
    /// returns it unchanged. The in-memory listing is refreshed from the
    /// store afterward (read-your-writes).
    pub fn create_thread(&mut self, explicit_id: Option<&str>) -> Result<String, AssistantError> {
        let id = match explicit_id {
            Some(id) => id.to_string(),
            None => format!("CNV_{}", short_hex()),
        };
        self.store
            .create_conversation(&id, None, self.owner.as_deref())?;
        self.refresh_listing()?;
        info!(conversation = %id, "thread ready");
        Ok(id)
    }

    /// Append a message, auto-creating the thread if it does not exist yet.
    ///
    /// The first user-role message also becomes the thread title, truncated
    /// to 100 characters. The store's title write is a no-op once a title
    /// exists, so later user messages never change it.
    pub fn add_message(
        &mut self,
        conversation_id: &str,
        sender: Sender,
        body: &str,
    ) -> Result<i32, AssistantError> {
        if self.store.get_conversation(conversation_id)?.is_none() {
            debug!(conversation = conversation_id, "auto-creating thread");
            self.store
                .create_conversation(conversation_id, None, self.owner.as_deref())?;
        }

        let position = self.store.append_message(conversation_id, sender, body)?;

        if sender == Sender::User {
            let title: String = body.chars().take(TITLE_MAX_CHARS).collect();
            self.store.set_title_once(conversation_id, &title)?;
        }

        Ok(position)
    }

    /// The last `limit` messages of a thread, oldest first.
    ///
    /// Ids outside this manager's owner scope (including ids that simply do
    /// not exist) return an empty vec — existence of other users' threads is
    /// never leaked.
    pub fn get_history(
        &mut self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, AssistantError> {
        if !self.is_visible(conversation_id)? {
            return Ok(Vec::new());
        }

        let mut messages = self.store.list_messages(conversation_id)?;
        if messages.len() > limit {
            messages.drain(..messages.len() - limit);
        }
        Ok(messages)
    }

    /// Recent history rendered as the literal text spliced into model
    /// prompts: `User: ...` / `Assistant: ...` lines, oldest first. Empty
    /// string when there is no visible history.
    pub fn get_context_text(&mut self, conversation_id: &str) -> Result<String, AssistantError> {
        let history = self.get_history(conversation_id, DEFAULT_HISTORY_LIMIT)?;
        let mut out = String::new();
        for message in &history {
            let label = match Sender::from_str(&message.sender) {
                Sender::User => "User",
                Sender::Assistant => "Assistant",
            };
            out.push_str(label);
            out.push_str(": ");
            out.push_str(&message.body);
            out.push('\n');
        }
        Ok(out)
    }

    /// All threads in this manager's scope, newest first.
    pub fn list_threads(&mut self) -> Result<Vec<ThreadSummary>, AssistantError> {
        self.refresh_listing()?;
        Ok(self.listing.clone())
    }

    /// Delete a thread and its messages. Foreign ids are ignored.
    pub fn delete_thread(&mut self, conversation_id: &str) -> Result<(), AssistantError> {
        if !self.is_visible(conversation_id)? {
            return Ok(());
        }
        self.store.delete_conversation(conversation_id)?;
        self.refresh_listing()?;
        info!(conversation = conversation_id, "thread deleted");
        Ok(())
    }

    // --- answer cache ------------------------------------------------------

    /// Fuzzy cache lookup for a question.
    pub fn find_cached(&self, question: &str, threshold: f64) -> Option<CacheHit> {
        self.cache.find_similar(question, threshold)
    }

    /// Record an answer in the cache.
    pub fn cache_answer(
        &mut self,
        question: &str,
        answer: &str,
        source_documents: Vec<SourceDocument>,
    ) -> Result<(), AssistantError> {
        self.cache.store(question, answer, source_documents)
    }

    /// Mutable access to the store for the auth layer sharing this
    /// connection.
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    fn is_visible(&mut self, conversation_id: &str) -> Result<bool, AssistantError> {
        let Some(conversation) = self.store.get_conversation(conversation_id)? else {
            return Ok(false);
        };
        Ok(match &self.owner {
            Some(owner) => conversation.user_id.as_deref() == Some(owner.as_str()),
            None => true,
        })
    }

    fn refresh_listing(&mut self) -> Result<(), AssistantError> {
        let conversations = self.store.list_conversations(self.owner.as_deref())?;
        let mut listing = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let message_count = self.store.count_messages(&conversation.id)?;
            listing.push(ThreadSummary {
                id: conversation.id,
                title: conversation.title.unwrap_or_else(|| UNTITLED.to_string()),
                created_at: conversation.created_at,
                message_count,
            });
        }
        self.listing = listing;
        Ok(())
    }
}
