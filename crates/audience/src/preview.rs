//! Debounced, latest-wins orchestration of audience preview requests.
//!
//! Every rule edit is submitted here. A request is only sent once the tree
//! has been quiet for the debounce window; a new edit inside the window
//! cancels the pending timer and restarts it. Once the window elapses the
//! request is committed and runs to completion, but its response is dropped
//! if a later submission has superseded it.
//!
//! This is the client-side half of the preview contract, for interactive
//! rule-builder frontends submitting on every keystroke
//! (`PreviewConfig::debounce_ms` sets the window). The REST endpoint itself
//! evaluates directly; it receives one request per quiet period, not one per
//! edit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::evaluator::{AudienceEvaluator, AudiencePreview};
use crm_segmentation::RuleNode;

/// Where the audience preview currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewState {
    Idle,
    Loading,
    Ready(AudiencePreview),
    /// Evaluation failed; the message is user-facing. The rule tree itself
    /// is untouched and the next edit starts a fresh cycle.
    Failed(String),
}

/// Debounced preview orchestrator. One logical request is current at a time;
/// superseded responses never reach subscribers.
pub struct Previewer<E> {
    evaluator: Arc<E>,
    debounce: Duration,
    generation: Arc<AtomicU64>,
    tx: Arc<watch::Sender<PreviewState>>,
    // Serializes the generation-check-then-publish step against submissions.
    publish: Arc<Mutex<()>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<E: AudienceEvaluator> Previewer<E> {
    pub fn new(evaluator: E, debounce: Duration) -> Self {
        let (tx, _rx) = watch::channel(PreviewState::Idle);
        Self {
            evaluator: Arc::new(evaluator),
            debounce,
            generation: Arc::new(AtomicU64::new(0)),
            tx: Arc::new(tx),
            publish: Arc::new(Mutex::new(())),
            pending: Mutex::new(None),
        }
    }

    /// Watch preview state changes.
    pub fn subscribe(&self) -> watch::Receiver<PreviewState> {
        self.tx.subscribe()
    }

    /// Submit the latest tree state after an edit. Restarts the debounce
    /// window, so only the last tree of a quiet period is ever evaluated.
    ///
    /// Empty or incomplete trees short-circuit to an empty preview without
    /// touching the evaluator.
    pub fn submit(&self, tree: RuleNode) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }

        let generation = {
            let _guard = self.publish.lock();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if !tree.is_complete() {
                metrics::counter!("audience.preview.short_circuit").increment(1);
                self.tx.send_replace(PreviewState::Ready(AudiencePreview::empty()));
                return;
            }
            self.tx.send_replace(PreviewState::Loading);
            generation
        };

        let evaluator = self.evaluator.clone();
        let latest = self.generation.clone();
        let tx = self.tx.clone();
        let publish = self.publish.clone();
        let debounce = self.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            // The quiet period elapsed: the request is committed. It runs
            // detached so a later edit supersedes it but cannot cancel it
            // mid-flight.
            tokio::spawn(async move {
                metrics::counter!("audience.preview.requests").increment(1);
                let result = evaluator.preview(tree).await;
                let _guard = publish.lock();
                if latest.load(Ordering::SeqCst) != generation {
                    debug!(generation, "discarding superseded audience preview response");
                    metrics::counter!("audience.preview.stale_discarded").increment(1);
                    return;
                }
                let state = match result {
                    Ok(preview) => PreviewState::Ready(preview),
                    Err(e) => PreviewState::Failed(e.to_string()),
                };
                tx.send_replace(state);
            });
        });
        *self.pending.lock() = Some(handle);
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────
