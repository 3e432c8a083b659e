//! Audience preview — the evaluation contract, an in-memory reference
//! evaluator, and the debounced latest-wins preview orchestrator.

pub mod evaluator;
pub mod preview;

pub use evaluator::{matches, AudienceEvaluator, AudiencePreview, CustomerSource, LocalEvaluator};
pub use preview::{PreviewState, Previewer};
