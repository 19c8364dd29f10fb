//! State behind the three-step exam creation form.
//!
//! The wizard owns raw form input, gates navigation on per-step validation and
//! turns the finished form into either an [`ExamCreate`] or a
//! [`GenerationRequest`]. The generation path talks to a [`QuestionGenerator`]
//! directly and keeps the grouped result locally for editing.

use thiserror::Error;

use crate::db::models::Distribution;
use crate::db::types::{DifficultyLevel, QuestionKind};
use crate::schemas::exam::{ExamCreate, GenerationRequest};
use crate::schemas::question::GroupedQuestions;
use crate::services::question_generation::{group_by_kind, QuestionGenerator};

const MIN_ATTEMPTS: i32 = 1;
const MAX_ATTEMPTS: i32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum WizardStep {
    #[default]
    GeneralData,
    QuestionCounts,
    TimeAndReference,
}

impl WizardStep {
    fn next(self) -> Option<Self> {
        match self {
            Self::GeneralData => Some(Self::QuestionCounts),
            Self::QuestionCounts => Some(Self::TimeAndReference),
            Self::TimeAndReference => None,
        }
    }

    fn previous(self) -> Option<Self> {
        match self {
            Self::GeneralData => None,
            Self::QuestionCounts => Some(Self::GeneralData),
            Self::TimeAndReference => Some(Self::QuestionCounts),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum AttemptsError {
    #[error("Attempts are required")]
    Blank,
    #[error("Attempts must be a whole number")]
    NotANumber,
    #[error("Attempts must be at least 1")]
    TooFew,
    #[error("Attempts cannot be more than 3")]
    TooMany,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum WizardError {
    #[error("Subject is required")]
    MissingSubject,
    #[error("Difficulty is required")]
    MissingDifficulty,
    #[error(transparent)]
    Attempts(#[from] AttemptsError),
    #[error("Add at least one question")]
    NoQuestions,
    #[error("Time limit is required")]
    MissingTime,
    #[error("Time limit must be a positive number of minutes")]
    InvalidTime,
    #[error("Finish the remaining steps first")]
    NotFinished,
    #[error("Choose a course for the exam")]
    MissingCourse,
    #[error("No {kind} question at position {index}")]
    NoSuchQuestion { kind: &'static str, index: usize },
    #[error("{0}")]
    Generation(String),
}

/// Parses the raw attempts field; each failure has its own message.
pub(crate) fn validate_attempts(raw: &str) -> Result<i32, AttemptsError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AttemptsError::Blank);
    }

    let attempts: i32 = trimmed.parse().map_err(|_| AttemptsError::NotANumber)?;
    if attempts < MIN_ATTEMPTS {
        return Err(AttemptsError::TooFew);
    }
    if attempts > MAX_ATTEMPTS {
        return Err(AttemptsError::TooMany);
    }
    Ok(attempts)
}

fn validate_time_minutes(raw: &str) -> Result<i32, WizardError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(WizardError::MissingTime);
    }

    match trimmed.parse::<i32>() {
        Ok(minutes) if minutes > 0 => Ok(minutes),
        _ => Err(WizardError::InvalidTime),
    }
}

/// What the finished form turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubmitMode {
    Create,
    Generate,
}

#[derive(Debug, Clone)]
pub(crate) enum WizardSubmission {
    Create(ExamCreate),
    Generate(GenerationRequest),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ExamWizard {
    pub(crate) course_id: Option<String>,
    pub(crate) subject: String,
    pub(crate) difficulty: Option<DifficultyLevel>,
    pub(crate) attempts: String,
    pub(crate) counts: Distribution,
    pub(crate) time_minutes: String,
    pub(crate) reference: String,
    step: WizardStep,
    questions: GroupedQuestions,
    loading: bool,
    error: Option<String>,
}

impl ExamWizard {
    pub(crate) fn for_course(course_id: impl Into<String>) -> Self {
        Self { course_id: Some(course_id.into()), ..Self::default() }
    }

    pub(crate) fn step(&self) -> WizardStep {
        self.step
    }

    pub(crate) fn questions(&self) -> &GroupedQuestions {
        &self.questions
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// First problem on the current step, if any.
    pub(crate) fn step_error(&self) -> Option<WizardError> {
        self.check_step(self.step).err()
    }

    pub(crate) fn valid_step(&self) -> bool {
        self.check_step(self.step).is_ok()
    }

    /// Moves forward when the current step validates. Returns whether it moved.
    pub(crate) fn next(&mut self) -> bool {
        if !self.valid_step() {
            return false;
        }
        match self.step.next() {
            Some(step) => {
                self.step = step;
                true
            }
            None => false,
        }
    }

    pub(crate) fn back(&mut self) {
        if let Some(step) = self.step.previous() {
            self.step = step;
        }
    }

    /// Clears all form input and returns to the first step. The course stays selected.
    pub(crate) fn reset(&mut self) {
        let course_id = self.course_id.take();
        *self = Self { course_id, ..Self::default() };
    }

    /// Builds the request for the finished form and clears the wizard.
    pub(crate) fn submit(&mut self, mode: SubmitMode) -> Result<WizardSubmission, WizardError> {
        self.check_finished()?;

        let submission = match mode {
            SubmitMode::Create => {
                let course_id = self
                    .course_id
                    .clone()
                    .filter(|value| !value.trim().is_empty())
                    .ok_or(WizardError::MissingCourse)?;
                WizardSubmission::Create(ExamCreate {
                    course_id,
                    title: None,
                    subject: self.subject.trim().to_string(),
                    difficulty: self.difficulty.ok_or(WizardError::MissingDifficulty)?,
                    attempts: validate_attempts(&self.attempts)?,
                    total_questions: self.total_questions(),
                    time_minutes: validate_time_minutes(&self.time_minutes)?,
                    reference: self.reference_value(),
                    distribution: Some(self.counts),
                })
            }
            SubmitMode::Generate => WizardSubmission::Generate(self.generation_request()?),
        };

        self.reset();
        Ok(submission)
    }

    /// Requests a full set of questions and stores them grouped by kind.
    ///
    /// Only a finished form may generate. The loading flag is raised for the
    /// duration of the call; a failure leaves the previous questions untouched
    /// and records the message.
    pub(crate) async fn generate_with(
        &mut self,
        generator: &dyn QuestionGenerator,
    ) -> Result<(), WizardError> {
        self.check_finished()?;
        let request = self.generation_request()?;

        self.loading = true;
        self.error = None;
        let result = generator.generate(&request).await;
        self.loading = false;

        match result {
            Ok(questions) => {
                self.questions = group_by_kind(questions);
                Ok(())
            }
            Err(err) => Err(self.fail(err.to_string())),
        }
    }

    /// Replaces one local question with a freshly generated one of the same kind.
    pub(crate) async fn regenerate_question(
        &mut self,
        kind: QuestionKind,
        index: usize,
        generator: &dyn QuestionGenerator,
    ) -> Result<(), WizardError> {
        if index >= self.questions.bucket(kind).len() {
            return Err(WizardError::NoSuchQuestion { kind: kind.as_str(), index });
        }

        let request = GenerationRequest {
            subject: self.subject.trim().to_string(),
            difficulty: self.difficulty.ok_or(WizardError::MissingDifficulty)?,
            total_questions: 1,
            reference: self.reference_value(),
            distribution: Distribution::single(kind),
        };

        self.loading = true;
        self.error = None;
        let result = generator.generate(&request).await;
        self.loading = false;

        let replacement = match result {
            Ok(questions) => questions.into_iter().find(|question| question.kind == kind),
            Err(err) => return Err(self.fail(err.to_string())),
        };
        let Some(replacement) = replacement else {
            return Err(self.fail(format!("No {} question was returned", kind.as_str())));
        };

        self.questions.bucket_mut(kind)[index] = replacement;
        Ok(())
    }

    fn fail(&mut self, message: String) -> WizardError {
        self.error = Some(message.clone());
        WizardError::Generation(message)
    }

    /// The form must sit on its last step and every step must still validate,
    /// since fields stay editable after moving past them.
    fn check_finished(&self) -> Result<(), WizardError> {
        if self.step != WizardStep::TimeAndReference {
            return Err(WizardError::NotFinished);
        }
        [WizardStep::GeneralData, WizardStep::QuestionCounts, WizardStep::TimeAndReference]
            .into_iter()
            .try_for_each(|step| self.check_step(step))
    }

    fn check_step(&self, step: WizardStep) -> Result<(), WizardError> {
        match step {
            WizardStep::GeneralData => {
                if self.subject.trim().is_empty() {
                    return Err(WizardError::MissingSubject);
                }
                if self.difficulty.is_none() {
                    return Err(WizardError::MissingDifficulty);
                }
                validate_attempts(&self.attempts)?;
                Ok(())
            }
            WizardStep::QuestionCounts => {
                if self.counts.total() == 0 {
                    return Err(WizardError::NoQuestions);
                }
                Ok(())
            }
            WizardStep::TimeAndReference => validate_time_minutes(&self.time_minutes).map(|_| ()),
        }
    }

    fn generation_request(&self) -> Result<GenerationRequest, WizardError> {
        if self.subject.trim().is_empty() {
            return Err(WizardError::MissingSubject);
        }
        if self.counts.total() == 0 {
            return Err(WizardError::NoQuestions);
        }

        Ok(GenerationRequest {
            subject: self.subject.trim().to_string(),
            difficulty: self.difficulty.ok_or(WizardError::MissingDifficulty)?,
            total_questions: self.total_questions(),
            reference: self.reference_value(),
            distribution: self.counts,
        })
    }

    fn total_questions(&self) -> i64 {
        i64::try_from(self.counts.total()).unwrap_or(i64::MAX)
    }

    fn reference_value(&self) -> Option<String> {
        let reference = self.reference.trim();
        (!reference.is_empty()).then(|| reference.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubGenerator;

    fn filled_wizard() -> ExamWizard {
        let mut wizard = ExamWizard::for_course("course-1");
        wizard.subject = "Thermodynamics".to_string();
        wizard.difficulty = Some(DifficultyLevel::Medium);
        wizard.attempts = "2".to_string();
        wizard.counts = Distribution {
            multiple_choice: 2,
            true_false: 1,
            open_analysis: 0,
            open_exercise: 1,
        };
        wizard.time_minutes = "40".to_string();
        wizard.reference = " Chapter 7 ".to_string();
        wizard
    }

    fn finished_wizard() -> ExamWizard {
        let mut wizard = filled_wizard();
        assert!(wizard.next());
        assert!(wizard.next());
        wizard
    }

    #[test]
    fn attempts_failures_have_distinct_messages() {
        let messages: Vec<String> = ["", "two", "0", "4"]
            .iter()
            .map(|raw| validate_attempts(raw).expect_err("invalid").to_string())
            .collect();

        assert_eq!(
            messages,
            vec![
                "Attempts are required",
                "Attempts must be a whole number",
                "Attempts must be at least 1",
                "Attempts cannot be more than 3",
            ]
        );
        assert_eq!(validate_attempts(" 3 "), Ok(3));
    }

    #[test]
    fn navigation_is_gated_by_the_current_step() {
        let mut wizard = ExamWizard::default();
        wizard.back();
        assert_eq!(wizard.step(), WizardStep::GeneralData);

        assert!(!wizard.next());
        assert_eq!(wizard.step_error(), Some(WizardError::MissingSubject));

        wizard.subject = "Optics".to_string();
        wizard.difficulty = Some(DifficultyLevel::Easy);
        wizard.attempts = "5".to_string();
        assert!(!wizard.next());
        assert_eq!(wizard.step_error(), Some(WizardError::Attempts(AttemptsError::TooMany)));

        wizard.attempts = "1".to_string();
        assert!(wizard.next());
        assert_eq!(wizard.step(), WizardStep::QuestionCounts);

        assert!(!wizard.next());
        wizard.counts.set(QuestionKind::TrueFalse, 3);
        assert!(wizard.next());
        assert_eq!(wizard.step(), WizardStep::TimeAndReference);

        wizard.time_minutes = "-10".to_string();
        assert!(!wizard.valid_step());
        assert_eq!(wizard.step_error(), Some(WizardError::InvalidTime));

        wizard.back();
        assert_eq!(wizard.step(), WizardStep::QuestionCounts);
    }

    #[test]
    fn submit_builds_create_request_and_clears_state() {
        let mut wizard = filled_wizard();
        assert!(matches!(wizard.submit(SubmitMode::Create), Err(WizardError::NotFinished)));

        assert!(wizard.next());
        assert!(wizard.next());
        let submission = wizard.submit(SubmitMode::Create).expect("submission");

        let WizardSubmission::Create(request) = submission else {
            panic!("expected create request");
        };
        assert_eq!(request.course_id, "course-1");
        assert_eq!(request.attempts, 2);
        assert_eq!(request.total_questions, 4);
        assert_eq!(request.time_minutes, 40);
        assert_eq!(request.reference.as_deref(), Some("Chapter 7"));

        assert_eq!(wizard.step(), WizardStep::GeneralData);
        assert!(wizard.subject.is_empty());
        assert!(wizard.attempts.is_empty());
        assert_eq!(wizard.counts.total(), 0);
        assert_eq!(wizard.course_id.as_deref(), Some("course-1"));
    }

    #[test]
    fn submit_for_generation_does_not_need_a_course() {
        let mut wizard = filled_wizard();
        wizard.course_id = None;
        assert!(wizard.next());
        assert!(wizard.next());

        assert!(matches!(wizard.submit(SubmitMode::Create), Err(WizardError::MissingCourse)));
        let submission = wizard.submit(SubmitMode::Generate).expect("submission");
        let WizardSubmission::Generate(request) = submission else {
            panic!("expected generation request");
        };
        assert_eq!(request.distribution.multiple_choice, 2);
        assert_eq!(request.total_questions, 4);
    }

    #[tokio::test]
    async fn generation_stores_grouped_questions() {
        let generator = StubGenerator::default();
        let mut wizard = finished_wizard();

        wizard.generate_with(&generator).await.expect("generate");

        assert!(!wizard.is_loading());
        assert!(wizard.error().is_none());
        assert_eq!(wizard.questions().multiple_choice.len(), 2);
        assert_eq!(wizard.questions().true_false.len(), 1);
        assert_eq!(wizard.questions().open_exercise.len(), 1);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn generation_failure_is_captured() {
        let generator = StubGenerator::failing("quota exceeded");
        let mut wizard = finished_wizard();

        let err = wizard.generate_with(&generator).await.expect_err("failure");

        assert!(err.to_string().contains("quota exceeded"));
        assert!(wizard.error().is_some_and(|message| message.contains("quota exceeded")));
        assert!(!wizard.is_loading());
        assert_eq!(wizard.questions().len(), 0);
    }

    #[tokio::test]
    async fn generation_waits_for_a_finished_valid_form() {
        let generator = StubGenerator::default();

        let mut wizard = filled_wizard();
        let err = wizard.generate_with(&generator).await.expect_err("unfinished");
        assert_eq!(err, WizardError::NotFinished);

        let mut wizard = finished_wizard();
        wizard.attempts = "9".to_string();
        let err = wizard.generate_with(&generator).await.expect_err("bad attempts");
        assert_eq!(err, WizardError::Attempts(AttemptsError::TooMany));
        assert!(matches!(wizard.submit(SubmitMode::Generate), Err(WizardError::Attempts(_))));

        wizard.attempts = "2".to_string();
        wizard.time_minutes = "0".to_string();
        let err = wizard.generate_with(&generator).await.expect_err("bad time");
        assert_eq!(err, WizardError::InvalidTime);

        assert_eq!(generator.calls(), 0);
        assert!(!wizard.is_loading());
        assert_eq!(wizard.questions().len(), 0);
    }

    #[tokio::test]
    async fn regenerating_replaces_only_the_target_question() {
        let generator = StubGenerator::default();
        let mut wizard = finished_wizard();
        wizard.generate_with(&generator).await.expect("generate");
        let before = wizard.questions().clone();

        wizard
            .regenerate_question(QuestionKind::MultipleChoice, 1, &generator)
            .await
            .expect("regenerate");

        let after = wizard.questions();
        assert_eq!(after.multiple_choice[0], before.multiple_choice[0]);
        assert_ne!(after.multiple_choice[1], before.multiple_choice[1]);
        assert_eq!(after.multiple_choice[1].kind, QuestionKind::MultipleChoice);
        assert_eq!(after.true_false, before.true_false);
        assert_eq!(generator.calls(), 2);

        let err = wizard
            .regenerate_question(QuestionKind::OpenAnalysis, 0, &generator)
            .await
            .expect_err("empty bucket");
        assert!(matches!(err, WizardError::NoSuchQuestion { .. }));
    }
}
