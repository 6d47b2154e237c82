//! Opinion Service: orchestrates one generation request end to end.
//!
//! Flow: resolve model → build prompt → generate → parse → trim.
//!
//! A run moves `Idle → ResolvingModel → Prompting → Generating → Parsing`
//! and ends in `Succeeded` or `Failed(kind)`. Any failure short-circuits;
//! no partial result is ever returned.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::student::{GenerationRequest, Opinions, StudentAttributes};
use crate::opinions::catalog::ModelCatalog;
use crate::opinions::error::{FailureKind, OpinionError};
use crate::opinions::generation::GenerationClient;
use crate::opinions::parser;
use crate::opinions::prompts::PromptBuilder;
use crate::opinions::resolver;

/// Upper bound on a single opinion, in characters. The target length is only a hint.
pub const MAX_OPINION_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    ResolvingModel,
    Prompting,
    Generating,
    Parsing,
    Succeeded,
    Failed(FailureKind),
}

/// Tracks the state of a run while the pipeline is executing.
struct Progress {
    request_id: Uuid,
    state: RunState,
    model: Option<String>,
}

impl Progress {
    fn enter(&mut self, next: RunState) {
        debug!("[{}] {:?} -> {:?}", self.request_id, self.state, next);
        self.state = next;
    }
}

/// The outcome of one pass through the pipeline.
#[derive(Debug)]
pub struct GenerationRun {
    pub request_id: Uuid,
    pub state: RunState,
    pub model: Option<String>,
    pub result: Result<Opinions, OpinionError>,
}

impl GenerationRun {
    pub fn into_result(self) -> Result<Opinions, OpinionError> {
        self.result
    }
}

pub struct OpinionService {
    catalog: Arc<ModelCatalog>,
    prompts: PromptBuilder,
    generation: GenerationClient,
}

impl OpinionService {
    pub fn new(
        catalog: Arc<ModelCatalog>,
        prompts: PromptBuilder,
        generation: GenerationClient,
    ) -> Self {
        Self {
            catalog,
            prompts,
            generation,
        }
    }

    pub async fn generate_opinions(
        &self,
        attributes: &StudentAttributes,
        requested_model: &str,
    ) -> Result<Opinions, OpinionError> {
        let run = self.run(attributes, requested_model).await;
        debug!(
            "[{}] Run ended in {:?} on {}",
            run.request_id,
            run.state,
            run.model.as_deref().unwrap_or("-")
        );
        run.into_result()
    }

    /// Runs the pipeline and returns the finished run, including its final state.
    pub async fn run(&self, attributes: &StudentAttributes, requested_model: &str) -> GenerationRun {
        let mut progress = Progress {
            request_id: Uuid::new_v4(),
            state: RunState::Idle,
            model: None,
        };
        let result = self.drive(&mut progress, attributes, requested_model).await;

        match &result {
            Ok(_) => {
                progress.enter(RunState::Succeeded);
                info!(
                    "[{}] Generated opinions with {}",
                    progress.request_id,
                    progress.model.as_deref().unwrap_or("-")
                );
            }
            Err(e) => {
                progress.enter(RunState::Failed(e.kind()));
                warn!("[{}] Opinion generation failed: {e}", progress.request_id);
            }
        }

        GenerationRun {
            request_id: progress.request_id,
            state: progress.state,
            model: progress.model,
            result,
        }
    }

    async fn drive(
        &self,
        run: &mut Progress,
        attributes: &StudentAttributes,
        requested_model: &str,
    ) -> Result<Opinions, OpinionError> {
        run.enter(RunState::ResolvingModel);
        let snapshot = self.catalog.current().await;
        let model = resolver::resolve(requested_model, &snapshot)?;
        run.model = Some(model.name.clone());

        run.enter(RunState::Prompting);
        let request = GenerationRequest {
            prompt: self.prompts.build(attributes),
            model: model.name,
            target_length: attributes.target_length,
        };

        run.enter(RunState::Generating);
        let raw = self.generation.generate(&request).await?;

        run.enter(RunState::Parsing);
        let opinions = parser::parse(&raw.text).map_err(|e| {
            warn!(
                "[{}] Unparseable response from {} after {} attempt(s): {:?}",
                run.request_id, raw.model, raw.attempts, e.raw
            );
            e
        })?;

        Ok(opinions.map(|o| truncate_chars(o, MAX_OPINION_CHARS)))
    }
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].trim_end().to_string(),
        None => text,
    }
}
