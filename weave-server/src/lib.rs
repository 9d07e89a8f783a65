//! Request Surface (§4.9, §6.1): the one HTTP endpoint that composes the
//! Model Gateway, Retriever, Agent Registry, and Execution Engine into a
//! streaming workflow-execution service.

mod app;
mod corpus;
mod execute;
mod wire;

pub use app::{router, AppState};
pub use corpus::discover_and_sync;
pub use wire::{to_workflow, ExecuteRequest};
