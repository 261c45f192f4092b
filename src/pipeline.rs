use std::fmt;

use tracing::{debug, info, warn};

use crate::bedrock::{ChatClient, InferenceError};
use crate::config::CorpusPolicy;
use crate::corpus::{self, CorpusOrigin};
use crate::prompt;
use crate::search::{self, ContentSource, LanguageCode};

/// Pipeline stages, in the only order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    DetectLanguage,
    Acquire,
    BuildCorpus,
    ComposePrompt,
    Invoke,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::DetectLanguage => "detect-language",
            Stage::Acquire => "acquire",
            Stage::BuildCorpus => "build-corpus",
            Stage::ComposePrompt => "compose-prompt",
            Stage::Invoke => "invoke",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("{0}")]
    Inference(#[from] InferenceError),
}

impl PipelineError {
    /// Stage from which the pipeline moved to [`Stage::Failed`].
    pub fn failed_at(&self) -> Stage {
        match self {
            PipelineError::EmptyQuery => Stage::Start,
            PipelineError::Inference(_) => Stage::Invoke,
        }
    }
}

#[derive(Debug)]
pub struct Outcome {
    pub language: LanguageCode,
    pub corpus_origin: CorpusOrigin,
    pub answer: String,
}

pub struct Pipeline<S, C> {
    source: S,
    chat: C,
    policy: CorpusPolicy,
}

impl<S: ContentSource, C: ChatClient> Pipeline<S, C> {
    pub fn new(source: S, chat: C, policy: CorpusPolicy) -> Self {
        Self {
            source,
            chat,
            policy,
        }
    }

    /// Runs one query end to end. Only an empty query or an inference
    /// failure is fatal; acquisition problems fall through to the fallback
    /// corpus.
    pub async fn run(&self, query: &str) -> Result<Outcome, PipelineError> {
        if query.trim().is_empty() {
            return Err(PipelineError::EmptyQuery);
        }

        info!(stage = %Stage::DetectLanguage, "detecting language");
        let language = search::detect(query);
        info!(stage = %Stage::DetectLanguage, %language, "detected language code");

        info!(stage = %Stage::Acquire, "scraping content in this language");
        let scraped = match self.source.acquire(query, &language).await {
            Ok(text) => text,
            Err(e) => {
                warn!(stage = %Stage::Acquire, error = %e, query, "failed to scrape for query");
                String::new()
            }
        };

        let corpus = corpus::build(&scraped, self.policy);
        if corpus.origin == CorpusOrigin::Fallback {
            info!(
                stage = %Stage::BuildCorpus,
                scraped_chars = scraped.chars().count(),
                "not enough usable content, using fallback instructions"
            );
        }
        info!(
            stage = %Stage::BuildCorpus,
            origin = ?corpus.origin,
            chars = corpus.text.chars().count(),
            "training model with gathered text"
        );

        let prompt = prompt::compose(&corpus.text, query);
        debug!(stage = %Stage::ComposePrompt, chars = prompt.chars().count(), "prompt composed");

        info!(stage = %Stage::Invoke, "sending to model");
        let answer = self.chat.complete(&prompt).await?;
        info!(stage = %Stage::Done, "answer received");

        Ok(Outcome {
            language,
            corpus_origin: corpus.origin,
            answer,
        })
    }
}
