//! Retrieval orchestrator: the top-level question-answering pipeline.
//!
//! Coordinates embed → vector search → rerank to build evidence context,
//! splices that context into the message list as the leading system message,
//! and delegates generation to the gateway.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::errors::RetrievalResult;
use crate::domain::models::candidate::RetrievalCandidate;
use crate::domain::models::config::RetrievalSettings;
use crate::domain::models::message::{Message, Role};
use crate::domain::models::provider::ResolvedConfig;
use crate::domain::ports::vector_store::SearchFilters;
use crate::domain::ports::{EmbeddingClient, VectorStore};
use crate::services::gateway::{ChatOutput, GenerationGateway};
use crate::services::reranker::RelevanceReranker;

/// System prompt template wrapping the retrieved passages.
const CONTEXT_TEMPLATE: &str = "You are an assistant answering questions about a fixed text \
corpus. The following passages were retrieved as relevant to the user's question:\n---\n\
{contexts}\n---\n\nAnswer based on the passages above. If they are insufficient, say so \
honestly. Cite the passage source (title and id) when quoting.";

/// When reranking, over-fetch by this factor so the reranker has room to
/// reorder without discarding too eagerly.
const OVERFETCH_FACTOR: f64 = 1.5;

/// Top-level coordinator for retrieval-augmented generation.
pub struct RetrievalOrchestrator {
    embedding: Arc<dyn EmbeddingClient>,
    vector_store: Arc<dyn VectorStore>,
    reranker: RelevanceReranker,
    gateway: Arc<GenerationGateway>,
    settings: RetrievalSettings,
}

impl RetrievalOrchestrator {
    /// Wire the pipeline together.
    pub fn new(
        embedding: Arc<dyn EmbeddingClient>,
        vector_store: Arc<dyn VectorStore>,
        gateway: Arc<GenerationGateway>,
        settings: RetrievalSettings,
    ) -> Self {
        let reranker =
            RelevanceReranker::new(Arc::clone(&embedding), settings.rerank_content_budget);
        Self {
            embedding,
            vector_store,
            reranker,
            gateway,
            settings,
        }
    }

    /// Pure retrieval: embed → search → optional rerank → truncate.
    ///
    /// Embedding and vector-search failures propagate; the caller owns
    /// user-facing translation.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filters: Option<&SearchFilters>,
        rerank: bool,
    ) -> RetrievalResult<Vec<RetrievalCandidate>> {
        let query_vector = self.embedding.embed(query).await?;

        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let fetch_k = if rerank {
            (top_k as f64 * OVERFETCH_FACTOR).ceil() as usize
        } else {
            top_k
        };

        let mut candidates = self
            .vector_store
            .search(&query_vector, fetch_k, filters)
            .await?;
        debug!(fetched = candidates.len(), fetch_k, "vector search complete");

        if rerank && !candidates.is_empty() {
            candidates = self.reranker.rerank(query, candidates, top_k).await;
        }

        candidates.truncate(top_k);
        Ok(candidates)
    }

    /// Answer a conversation, optionally augmented with retrieved context.
    ///
    /// The query is the **last** user message; without one, or when its
    /// content is empty, retrieval is skipped and the messages are forwarded
    /// unchanged. Retrieved context
    /// replaces an existing leading system message or is inserted as a new
    /// one; empty retrieval alters nothing.
    pub async fn ask(
        &self,
        messages: Vec<Message>,
        config: ResolvedConfig,
        stream: bool,
        use_retrieval: bool,
    ) -> RetrievalResult<ChatOutput> {
        let query = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .filter(|content| !content.is_empty());

        let Some(query) = query else {
            debug!("no usable user message, forwarding without retrieval");
            return Ok(self.gateway.chat(&messages, config, stream, true).await?);
        };

        let mut final_messages = messages;

        if use_retrieval {
            let candidates = self
                .search(&query, self.settings.rerank_top_k, None, true)
                .await?;
            info!(passages = candidates.len(), "retrieval complete");

            if !candidates.is_empty() {
                let system_prompt = render_context(&candidates);
                install_system_message(&mut final_messages, system_prompt);
            }
        }

        Ok(self
            .gateway
            .chat(&final_messages, config, stream, true)
            .await?)
    }
}

/// Render candidates into the fixed context template.
fn render_context(candidates: &[RetrievalCandidate]) -> String {
    let contexts = candidates
        .iter()
        .map(|c| {
            let title = c.title().unwrap_or("untitled");
            format!("【{title}】({})\n{}", c.id, c.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    CONTEXT_TEMPLATE.replace("{contexts}", &contexts)
}

/// Install `content` as the leading system message, replacing an existing
/// one if present.
fn install_system_message(messages: &mut Vec<Message>, content: String) {
    match messages.first_mut() {
        Some(first) if first.role == Role::System => first.content = content,
        _ => messages.insert(0, Message::system(content)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, title: &str, content: &str) -> RetrievalCandidate {
        RetrievalCandidate::new(id, content, serde_json::json!({ "title": title }), 0.5)
    }

    #[test]
    fn test_render_context_joins_with_blank_lines() {
        let rendered = render_context(&[
            candidate("T0251:1", "Heart Sutra", "form is emptiness"),
            candidate("T0262:9", "Lotus Sutra", "one vehicle"),
        ]);
        assert!(rendered.contains("【Heart Sutra】(T0251:1)\nform is emptiness"));
        assert!(rendered.contains("\n\n【Lotus Sutra】(T0262:9)"));
        assert!(rendered.contains("---"));
    }

    #[test]
    fn test_render_context_untitled_fallback() {
        let rendered = render_context(&[RetrievalCandidate::new(
            "x",
            "body",
            serde_json::json!({}),
            0.1,
        )]);
        assert!(rendered.contains("【untitled】(x)"));
    }

    #[test]
    fn test_install_replaces_leading_system_message() {
        let mut messages = vec![Message::system("old"), Message::user("q")];
        install_system_message(&mut messages, "new".to_string());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "new");
        assert_eq!(messages[0].role, Role::System);
    }

    #[test]
    fn test_install_inserts_when_no_leading_system() {
        let mut messages = vec![Message::user("q"), Message::system("not leading")];
        install_system_message(&mut messages, "ctx".to_string());
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "ctx");
        assert_eq!(messages[1].content, "q");
    }
}
