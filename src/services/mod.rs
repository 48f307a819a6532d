pub mod gateway;
pub mod orchestrator;
pub mod reranker;
pub mod segmenter;

pub use gateway::GenerationGateway;
pub use orchestrator::RetrievalOrchestrator;
pub use reranker::RelevanceReranker;
pub use segmenter::TextSegmenter;
