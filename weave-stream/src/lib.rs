//! Wire types for the execution event stream (spec §3 Event, §4.8 Event Stream).
//!
//! One [`Event`] variant per SSE tag (§6.1): `agent_start`, `agent_complete`, `done`, `error`.
//! A run emits zero or more `AgentStart`/`AgentComplete` pairs and exactly one terminal
//! `Done` or `Error` event.

mod event;

pub use event::{AgentStep, DoneResult, Event, ToolOutputs};
