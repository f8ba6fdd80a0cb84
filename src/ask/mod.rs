//! Question submission workflow
//!
//! `QuerySubmissionController` owns the question lifecycle: it only lets a
//! question through when the text changed since the last accepted one, no
//! request is in flight and no similarity panel is waiting for a choice. The
//! backend may answer with a list of similar saved questions instead of an
//! answer; the user then either reuses one of them or searches anew, which
//! resubmits with the similarity check disabled.

pub mod results;
pub mod similarity;

use crate::api::{ApiClient, AskRequest, AskResponse, SimilarQueries};
use crate::error::AppError;
use crate::wake::WakeLock;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use results::{ReferenceRow, ResultsView};
pub use similarity::{DisambiguationView, SimilarRow, SimilarityTier, TierView};

/// Seconds shown by the cosmetic countdown on the submit button
const COUNTDOWN_SECS: u64 = 59;

/// Text of the question input and the flags that gate submission
#[derive(Debug, Clone, Default)]
pub struct QuestionState {
    baseline: String,
    input: String,
    changed: bool,
    busy: bool,
    disambiguating: bool,
    pending_question: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitButton {
    pub enabled: bool,
    pub label: &'static str,
}

impl QuestionState {
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn is_disambiguating(&self) -> bool {
        self.disambiguating
    }

    pub fn pending_question(&self) -> Option<&str> {
        self.pending_question.as_deref()
    }

    fn has_text(&self) -> bool {
        !self.input.trim().is_empty()
    }

    pub fn can_submit(&self) -> bool {
        self.has_text() && self.changed && !self.busy && !self.disambiguating
    }

    pub fn submit_button(&self) -> SubmitButton {
        let label = if self.busy {
            "Processing..."
        } else if !self.has_text() {
            "Enter your question"
        } else if !self.changed {
            "Edit the question to submit"
        } else if self.disambiguating {
            "Pick an option above"
        } else {
            "Ask"
        };
        SubmitButton {
            enabled: self.can_submit(),
            label,
        }
    }

    /// Make `question` the new baseline and clear every flag
    fn reset(&mut self, question: &str) {
        self.baseline = question.to_string();
        self.input = question.to_string();
        self.changed = false;
        self.busy = false;
        self.disambiguating = false;
        self.pending_question = None;
    }
}

/// Cancels whichever ask is in flight. Clones share the same slot, so a
/// handle taken once keeps working across asks.
#[derive(Clone, Default)]
pub struct AbortHandle {
    current: Arc<Mutex<CancellationToken>>,
}

impl AbortHandle {
    pub fn cancel(&self) {
        self.slot().cancel();
    }

    /// Token for the next ask; a token spent by an earlier cancel is replaced
    fn arm(&self) -> CancellationToken {
        let mut token = self.slot();
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
        token.clone()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, CancellationToken> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of a submission attempt
#[derive(Debug)]
pub enum AskOutcome {
    /// Submission is not allowed in the current state; nothing was sent
    Blocked,
    Answered(ResultsView),
    /// The backend found similar saved questions and wants a choice
    Disambiguate(DisambiguationView),
}

pub struct QuerySubmissionController {
    api: ApiClient,
    wake_lock: Box<dyn WakeLock>,
    timeout: Duration,
    language: String,
    state: QuestionState,
    similar: Option<(SimilarQueries, Option<String>)>,
    last_answer: Option<AskResponse>,
    abort: AbortHandle,
}

impl QuerySubmissionController {
    pub fn new(
        api: ApiClient,
        wake_lock: Box<dyn WakeLock>,
        timeout: Duration,
        language: &str,
    ) -> Self {
        Self {
            api,
            wake_lock,
            timeout,
            language: language.to_string(),
            state: QuestionState::default(),
            similar: None,
            last_answer: None,
            abort: AbortHandle::default(),
        }
    }

    pub fn state(&self) -> &QuestionState {
        &self.state
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn last_answer(&self) -> Option<&AskResponse> {
        self.last_answer.as_ref()
    }

    /// Handle that aborts the in-flight ask when cancelled
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Abort the in-flight ask, if any
    pub fn cancel(&self) {
        self.abort.cancel();
    }

    /// Update the question text. Editing the pending question while the
    /// similarity panel is open dismisses the panel.
    pub fn set_input(&mut self, text: &str) {
        self.state.input = text.to_string();
        self.state.changed = self.state.input != self.state.baseline;
        if self.state.disambiguating && self.state.pending_question.as_deref() != Some(text.trim()) {
            self.dismiss_similar();
        }
    }

    pub fn submit_button(&self) -> SubmitButton {
        self.state.submit_button()
    }

    /// Submit the current input
    pub async fn submit(&mut self) -> Result<AskOutcome, AppError> {
        let question = self.state.input.trim().to_string();
        if question.is_empty() {
            return Err(AppError::Validation("Please enter a question.".into()));
        }
        if !self.state.can_submit() {
            log::info!("Submission ignored: {:?}", self.state.submit_button().label);
            return Ok(AskOutcome::Blocked);
        }
        self.run_ask(question, false).await
    }

    /// Discard the suggestions and resubmit the pending question with the
    /// backend similarity check disabled
    pub async fn search_anew(&mut self) -> Result<AskOutcome, AppError> {
        if !self.state.disambiguating || self.state.busy {
            return Ok(AskOutcome::Blocked);
        }
        let question = self
            .state
            .pending_question
            .clone()
            .unwrap_or_else(|| self.state.input.trim().to_string());
        if question.is_empty() {
            return Err(AppError::Validation("Please enter a question.".into()));
        }
        self.dismiss_similar();
        self.run_ask(question, true).await
    }

    /// Show a previously saved answer instead of asking again
    pub async fn reuse(&mut self, uuid: &str) -> Result<AskOutcome, AppError> {
        if self.state.busy {
            return Ok(AskOutcome::Blocked);
        }
        self.state.busy = true;
        let result = self.api.saved_query(uuid).await;
        self.state.busy = false;
        let data = result?;

        log::info!("Loaded saved query {}", uuid);
        self.state.reset(data.query.as_deref().unwrap_or_default());
        self.similar = None;
        self.last_answer = Some(data);
        self.results()
            .map(AskOutcome::Answered)
            .ok_or_else(|| AppError::Other("Saved query has no answer".into()))
    }

    /// Switch language; returns the answer re-rendered when one is shown
    pub fn set_language(&mut self, language: &str) -> Option<ResultsView> {
        self.language = language.to_string();
        self.results()
    }

    /// Answer panel, hidden while the similarity panel waits for a choice
    pub fn results(&self) -> Option<ResultsView> {
        if self.state.disambiguating {
            return None;
        }
        self.last_answer
            .as_ref()
            .map(|data| ResultsView::build(data, &self.language, self.api.origin()))
    }

    pub fn disambiguation(&self) -> Option<DisambiguationView> {
        self.similar
            .as_ref()
            .map(|(similar, message)| DisambiguationView::new(similar, message.as_deref()))
    }

    fn dismiss_similar(&mut self) {
        self.state.disambiguating = false;
        self.state.pending_question = None;
        self.similar = None;
    }

    async fn run_ask(&mut self, question: String, skip_similarity_check: bool) -> Result<AskOutcome, AppError> {
        let token = self.abort.arm();
        let request = AskRequest {
            question: question.clone(),
            language: self.language.clone(),
            skip_similarity_check,
        };

        self.state.busy = true;
        let result = {
            let _wake = self.wake_lock.acquire();
            self.ask_with_timeout(&request, &token).await
        };
        self.state.busy = false;

        let data = match result {
            Ok(data) => data,
            Err(e) => {
                log::error!("Ask failed: {}", e);
                return Err(e);
            }
        };

        if data.requires_confirmation && !skip_similarity_check {
            if let Some(similar) = data.similar_queries.clone() {
                log::info!(
                    "Similar queries found: {} high, {} medium, {} low",
                    similar.high.len(),
                    similar.medium.len(),
                    similar.low.len()
                );
                self.state.disambiguating = true;
                self.state.pending_question = Some(question);
                let view = DisambiguationView::new(&similar, data.message.as_deref());
                self.similar = Some((similar, data.message));
                return Ok(AskOutcome::Disambiguate(view));
            }
        }

        self.state.reset(&question);
        self.last_answer = Some(data);
        self.results()
            .map(AskOutcome::Answered)
            .ok_or_else(|| AppError::Other("No answer to show".into()))
    }

    async fn ask_with_timeout(
        &self,
        request: &AskRequest,
        token: &CancellationToken,
    ) -> Result<AskResponse, AppError> {
        tokio::select! {
            _ = token.cancelled() => {
                log::warn!("Ask cancelled by user");
                Err(AppError::Cancelled)
            }
            _ = tokio::time::sleep(self.timeout) => {
                log::warn!("Ask timed out after {:?}", self.timeout);
                Err(AppError::Timeout)
            }
            result = self.api.ask(request) => result,
        }
    }
}

/// Countdown label shown while an ask is running
pub fn loading_label(elapsed: Duration) -> String {
    match COUNTDOWN_SECS.checked_sub(elapsed.as_secs()) {
        Some(remaining) => format!("Asking... ({}s)", remaining),
        None => "...".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(baseline: &str, input: &str) -> QuestionState {
        let mut s = QuestionState::default();
        s.reset(baseline);
        s.input = input.to_string();
        s.changed = s.input != s.baseline;
        s
    }

    #[test]
    fn test_unchanged_question_cannot_be_submitted() {
        let s = state("¿Qué es X?", "¿Qué es X?");
        assert!(!s.can_submit());
        assert_eq!(
            s.submit_button(),
            SubmitButton {
                enabled: false,
                label: "Edit the question to submit"
            }
        );
    }

    #[test]
    fn test_changed_question_can_be_submitted() {
        let s = state("¿Qué es X?", "¿Qué es Y?");
        assert!(s.can_submit());
        assert_eq!(s.submit_button().label, "Ask");
    }

    #[test]
    fn test_busy_and_disambiguating_block_submission() {
        let mut s = state("", "question");
        s.busy = true;
        assert!(!s.can_submit());
        assert_eq!(s.submit_button().label, "Processing...");

        s.busy = false;
        s.disambiguating = true;
        assert!(!s.can_submit());
        assert_eq!(s.submit_button().label, "Pick an option above");
    }

    #[test]
    fn test_blank_input_label() {
        let s = state("", "   ");
        assert!(!s.can_submit());
        assert_eq!(s.submit_button().label, "Enter your question");
    }

    #[test]
    fn test_abort_handle_rearms_after_cancel() {
        let handle = AbortHandle::default();
        let shared = handle.clone();
        let first = handle.arm();
        shared.cancel();
        assert!(first.is_cancelled());

        let second = handle.arm();
        assert!(!second.is_cancelled());
        // the clone taken before the first cancel still reaches the new ask
        shared.cancel();
        assert!(second.is_cancelled());
    }

    #[test]
    fn test_loading_label_counts_down() {
        assert_eq!(loading_label(Duration::from_secs(0)), "Asking... (59s)");
        assert_eq!(loading_label(Duration::from_secs(59)), "Asking... (0s)");
        assert_eq!(loading_label(Duration::from_secs(75)), "...");
    }
}
