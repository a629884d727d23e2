//! Custom-input panel state
//!
//! Holds the text buffer, the in-flight flag and the outcome of the last
//! submission for one feature. The front end redraws from this state after
//! every edit or submission.

use crate::feature::Sample;
use crate::source::{ActivationSource, SourceError, EMPTY_INPUT_WARNING};
use thiserror::Error;
use tracing::debug;

/// Typed placeholders and the control characters they stand for
pub const PLACEHOLDERS: [(char, char); 3] = [('⏎', '\n'), ('⇥', '\t'), ('↵', '\r')];

/// Replace every placeholder glyph with its control character.
pub fn substitute_placeholders(text: &str) -> String {
    text.chars()
        .map(|c| {
            PLACEHOLDERS
                .iter()
                .find(|(glyph, _)| *glyph == c)
                .map_or(c, |(_, control)| *control)
        })
        .collect()
}

/// Reasons a submission is refused before any request is made
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    #[error("{}", EMPTY_INPUT_WARNING)]
    EmptyInput,

    #[error("a submission is already in flight")]
    InFlight,
}

/// What happened when the user pressed submit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Refused locally; panel state is unchanged
    Rejected(SubmitRejected),
    /// A request ran; the panel holds its sample or error
    Completed,
}

/// A request the panel has committed to, detached from the panel borrow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub dictionary: String,
    pub feature_index: u64,
    pub text: String,
}

/// Custom-input state for one feature
#[derive(Debug)]
pub struct CustomInputPanel {
    dictionary: String,
    feature_index: u64,
    input: String,
    loading: bool,
    outcome: Option<Result<Sample, String>>,
}

impl CustomInputPanel {
    pub fn new(dictionary: impl Into<String>, feature_index: u64) -> Self {
        Self {
            dictionary: dictionary.into(),
            feature_index,
            input: String::new(),
            loading: false,
            outcome: None,
        }
    }

    /// Replace the buffer with edited text, substituting placeholder glyphs
    pub fn set_input(&mut self, text: &str) {
        self.input = substitute_placeholders(text);
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Whether the submit control should be disabled
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Sample from the last successful submission
    pub fn sample(&self) -> Option<&Sample> {
        self.outcome.as_ref()?.as_ref().ok()
    }

    /// Error message from the last failed submission
    pub fn error(&self) -> Option<&str> {
        self.outcome.as_ref()?.as_ref().err().map(String::as_str)
    }

    /// Start a submission, marking the panel as in flight
    pub fn begin_submit(&mut self) -> Result<Submission, SubmitRejected> {
        if self.input.is_empty() {
            return Err(SubmitRejected::EmptyInput);
        }
        if self.loading {
            return Err(SubmitRejected::InFlight);
        }

        self.loading = true;
        Ok(Submission {
            dictionary: self.dictionary.clone(),
            feature_index: self.feature_index,
            text: self.input.clone(),
        })
    }

    /// Record the result of the submission started by `begin_submit`
    ///
    /// The previous sample stays visible while a request is in flight and is
    /// replaced here by either the new sample or the error.
    pub fn finish(&mut self, result: Result<Sample, SourceError>) {
        self.loading = false;
        self.outcome = Some(result.map_err(|e| e.to_string()));
    }

    /// Submit the current buffer to `source` and record the outcome
    pub async fn submit<S>(&mut self, source: &S) -> SubmitOutcome
    where
        S: ActivationSource + ?Sized,
    {
        let submission = match self.begin_submit() {
            Ok(submission) => submission,
            Err(rejected) => {
                debug!(reason = %rejected, "Submission rejected");
                return SubmitOutcome::Rejected(rejected);
            }
        };

        let result = source
            .custom_input(
                &submission.dictionary,
                submission.feature_index,
                &submission.text,
            )
            .await;
        self.finish(result);
        SubmitOutcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, Token};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Source that records calls and replays a canned result
    struct FakeSource {
        calls: AtomicUsize,
        last_text: Mutex<Option<String>>,
        fail_with: Option<String>,
    }

    impl FakeSource {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_text: Mutex::new(None),
                fail_with: None,
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl ActivationSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn feature(&self, _: &str, _: u64) -> Result<Feature, SourceError> {
            unimplemented!("not used by the panel")
        }

        async fn custom_input(&self, _: &str, _: u64, text: &str) -> Result<Sample, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_text.lock().unwrap() = Some(text.to_string());
            match &self.fail_with {
                Some(message) => Err(SourceError::Request(message.clone())),
                None => Ok(Sample {
                    context: text.chars().map(|c| Token::new(c.to_string())).collect(),
                    feature_acts: vec![0.5; text.chars().count()],
                }),
            }
        }
    }

    #[test]
    fn test_placeholder_substitution() {
        assert_eq!(substitute_placeholders("a⏎b⇥c↵d"), "a\nb\tc\rd");
        assert_eq!(substitute_placeholders("⏎⏎x⏎"), "\n\nx\n");
        assert_eq!(substitute_placeholders("plain text"), "plain text");
    }

    #[test]
    fn test_set_input_substitutes() {
        let mut panel = CustomInputPanel::new("L9M", 1);
        panel.set_input("a⏎b⇥c↵d");
        assert_eq!(panel.input(), "a\nb\tc\rd");
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected_without_request() {
        let source = FakeSource::ok();
        let mut panel = CustomInputPanel::new("L9M", 1);

        let outcome = panel.submit(&source).await;

        assert_eq!(outcome, SubmitOutcome::Rejected(SubmitRejected::EmptyInput));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(panel.sample().is_none());
        assert!(panel.error().is_none());
        assert!(!panel.is_loading());
        assert_eq!(
            SubmitRejected::EmptyInput.to_string(),
            "Please enter your input."
        );
    }

    #[tokio::test]
    async fn test_submit_records_sample() {
        let source = FakeSource::ok();
        let mut panel = CustomInputPanel::new("L9M", 1);
        panel.set_input("hi⏎");

        let outcome = panel.submit(&source).await;

        assert_eq!(outcome, SubmitOutcome::Completed);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.last_text.lock().unwrap().as_deref(), Some("hi\n"));
        assert_eq!(panel.sample().unwrap().feature_acts.len(), 3);
        assert!(panel.error().is_none());
        assert!(!panel.is_loading());
    }

    #[tokio::test]
    async fn test_failure_replaces_previous_sample() {
        let mut panel = CustomInputPanel::new("L9M", 1);
        panel.set_input("first");
        panel.submit(&FakeSource::ok()).await;
        assert!(panel.sample().is_some());

        panel.submit(&FakeSource::failing("Feature not found")).await;

        assert!(panel.sample().is_none());
        assert_eq!(panel.error(), Some("Feature not found"));
    }

    #[test]
    fn test_second_submit_while_in_flight_is_rejected() {
        let mut panel = CustomInputPanel::new("L9M", 7);
        panel.set_input("text");

        let submission = panel.begin_submit().unwrap();
        assert_eq!(submission.feature_index, 7);
        assert_eq!(submission.text, "text");
        assert!(panel.is_loading());

        assert_eq!(panel.begin_submit(), Err(SubmitRejected::InFlight));

        panel.finish(Err(SourceError::Request("boom".to_string())));
        assert!(!panel.is_loading());
        assert_eq!(panel.error(), Some("boom"));
    }
}
