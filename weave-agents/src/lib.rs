//! Concrete agent handlers for every agent/tool node type (§3, §4.7).
//!
//! Input/output node types (`prompt`, `upload`, `response`, `spreadsheet`)
//! never reach the registry — the engine handles them natively — so this
//! crate covers exactly the eight agent and three tool types.

mod code;
mod formatting;
mod image_generator;
mod orchestrator;
mod sampler;
mod semantic_search;
mod summarization;
mod supervisor;
mod support;
mod synthesis;
mod transformer;
mod translator;

use std::collections::HashMap;
use std::sync::Arc;

use weave_engine::AgentRegistry;
use weave_gateway::ModelGateway;
use weave_retrieval::{Document, Retriever};

pub use code::CodeHandler;
pub use formatting::FormattingHandler;
pub use image_generator::ImageGeneratorHandler;
pub use orchestrator::OrchestratorHandler;
pub use sampler::SamplerHandler;
pub use semantic_search::SemanticSearchHandler;
pub use summarization::SummarizationHandler;
pub use supervisor::SupervisorHandler;
pub use synthesis::SynthesisHandler;
pub use transformer::TransformerHandler;
pub use translator::TranslatorHandler;

/// Builds the registry used by every run (§4.4): one handler instance per
/// node type, sharing the process-wide gateway and retriever.
pub fn build_registry(
    gateway: Arc<dyn ModelGateway>,
    retriever: Arc<Retriever>,
    corpora: Arc<HashMap<String, Vec<Document>>>,
) -> AgentRegistry {
    let mut registry = AgentRegistry::new();

    registry.register("supervisor", Arc::new(SupervisorHandler::new(gateway.clone())));
    registry.register("orchestrator", Arc::new(OrchestratorHandler::new(gateway.clone())));
    registry.register("semantic_search", Arc::new(SemanticSearchHandler::new(retriever, corpora)));
    registry.register("sampler", Arc::new(SamplerHandler::new(gateway.clone())));
    registry.register("synthesis", Arc::new(SynthesisHandler::new(gateway.clone())));
    registry.register("transformer", Arc::new(TransformerHandler::new(gateway.clone())));
    registry.register("translator", Arc::new(TranslatorHandler::new(gateway.clone())));
    registry.register("image_generator", Arc::new(ImageGeneratorHandler::new(gateway.clone())));
    registry.register("summarization", Arc::new(SummarizationHandler::new(gateway.clone())));
    registry.register("formatting", Arc::new(FormattingHandler::new(gateway.clone())));
    registry.register("code", Arc::new(CodeHandler::new(gateway)));

    registry
}
