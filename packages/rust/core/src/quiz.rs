//! Scoring a multiple-choice quiz from the learner's answers.
//!
//! The resulting `(score, total)` is what [`crate::ProgressStore::update_quiz_progress`]
//! records.

use serde::Serialize;
use tracing::debug;

use purelearn_shared::{PurelearnError, QuizQuestion, Result};

/// Summary tier shown after a finished quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizVerdict {
    /// Every answer correct.
    Perfect,
    /// At least 70% correct.
    GreatJob,
    KeepLearning,
}

impl QuizVerdict {
    pub fn for_score(score: u32, total: u32) -> Self {
        if score == total {
            Self::Perfect
        } else if u64::from(score) * 10 >= u64::from(total) * 7 {
            Self::GreatJob
        } else {
            Self::KeepLearning
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Perfect => "Perfect score! Excellent work!",
            Self::GreatJob => "Great job! You've got a good understanding of the topic.",
            Self::KeepLearning => "Keep learning! Review the material and try again.",
        }
    }
}

/// How one answer was judged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerFeedback {
    pub chosen: usize,
    pub correct_answer: usize,
    pub correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// A scored attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizOutcome {
    pub score: u32,
    pub total: u32,
    pub verdict: QuizVerdict,
    pub answers: Vec<AnswerFeedback>,
}

/// Score `answers` (zero-based option indices, one per question) against
/// `questions`.
///
/// Every question must be answered exactly once and every answer must name an
/// existing option.
pub fn score_quiz(questions: &[QuizQuestion], answers: &[usize]) -> Result<QuizOutcome> {
    if questions.is_empty() {
        return Err(PurelearnError::validation("quiz has no questions"));
    }
    if answers.len() != questions.len() {
        return Err(PurelearnError::validation(format!(
            "expected {} answers, got {}",
            questions.len(),
            answers.len()
        )));
    }

    let mut feedback = Vec::with_capacity(questions.len());
    for (number, (question, &chosen)) in questions.iter().zip(answers).enumerate() {
        question.check()?;
        if chosen >= question.options.len() {
            return Err(PurelearnError::validation(format!(
                "answer {} to question {} is out of range (options: {})",
                chosen,
                number + 1,
                question.options.len()
            )));
        }
        feedback.push(AnswerFeedback {
            chosen,
            correct_answer: question.correct_answer,
            correct: chosen == question.correct_answer,
            explanation: question.explanation.clone(),
        });
    }

    let total = u32::try_from(questions.len())
        .map_err(|_| PurelearnError::validation("quiz has too many questions"))?;
    let score = feedback.iter().filter(|a| a.correct).count() as u32;
    let verdict = QuizVerdict::for_score(score, total);
    debug!(score, total, ?verdict, "quiz scored");

    Ok(QuizOutcome {
        score,
        total,
        verdict,
        answers: feedback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use purelearn_shared::SectionId;
    use purelearn_storage::MemoryStore;

    use crate::ProgressStore;

    fn question(correct_answer: usize) -> QuizQuestion {
        QuizQuestion {
            question: format!("Pick option {correct_answer}"),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_answer,
            explanation: Some(format!("It was {correct_answer}")),
        }
    }

    fn quiz(n: usize) -> Vec<QuizQuestion> {
        (0..n).map(|i| question(i % 3)).collect()
    }

    #[test]
    fn verdict_tiers() {
        assert_eq!(QuizVerdict::for_score(10, 10), QuizVerdict::Perfect);
        assert_eq!(QuizVerdict::for_score(7, 10), QuizVerdict::GreatJob);
        assert_eq!(QuizVerdict::for_score(6, 10), QuizVerdict::KeepLearning);
        // 2/3 is below 70%.
        assert_eq!(QuizVerdict::for_score(2, 3), QuizVerdict::KeepLearning);
        assert_eq!(QuizVerdict::for_score(0, 1), QuizVerdict::KeepLearning);
        assert!(QuizVerdict::Perfect.message().starts_with("Perfect"));
    }

    #[test]
    fn scores_answers_with_feedback() {
        let questions = quiz(4);
        let outcome = score_quiz(&questions, &[0, 1, 0, 0]).expect("score");

        assert_eq!((outcome.score, outcome.total), (3, 4));
        assert_eq!(outcome.verdict, QuizVerdict::GreatJob);
        assert!(!outcome.answers[2].correct);
        assert_eq!(outcome.answers[2].correct_answer, 2);
        assert_eq!(outcome.answers[2].explanation.as_deref(), Some("It was 2"));
    }

    #[test]
    fn rejects_incomplete_or_impossible_answers() {
        let questions = quiz(2);
        assert!(score_quiz(&questions, &[0]).is_err());
        assert!(score_quiz(&questions, &[0, 1, 2]).is_err());
        assert!(score_quiz(&questions, &[0, 3]).is_err());
        assert!(score_quiz(&[], &[]).is_err());

        let mut broken = quiz(1);
        broken[0].correct_answer = 9;
        assert!(score_quiz(&broken, &[0]).is_err());
    }

    #[tokio::test]
    async fn outcome_feeds_the_progress_store() {
        let questions = quiz(3);
        let outcome = score_quiz(&questions, &[0, 1, 2]).expect("score");
        assert_eq!(outcome.verdict, QuizVerdict::Perfect);

        let mut store = ProgressStore::open(MemoryStore::new()).await;
        let id = SectionId::subtopic("rust", "basics", "ownership");
        store
            .update_quiz_progress(&id, outcome.score, outcome.total)
            .await
            .expect("record");

        let record = store.state().quiz(&id).expect("recorded");
        assert_eq!((record.score, record.total), (3, 3));
        assert_eq!(record.percent(), 100);
    }
}
