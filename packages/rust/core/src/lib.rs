//! Core engine for PureLearn: outline navigation, learner progress, quiz
//! scoring, and derived completion.

pub mod completion;
pub mod navigation;
pub mod progress;
pub mod quiz;

pub use completion::{
    CourseProgress, SubtopicStatus, TopicStatus, course_progress, has_quiz, is_subtopic_completed,
    is_topic_completed,
};
pub use navigation::{Navigator, course_start_link, resolve_navigation};
pub use progress::{
    ProgressAction, ProgressChange, ProgressListener, ProgressMapping, ProgressState,
    ProgressStore, SubscriptionId,
};
pub use quiz::{AnswerFeedback, QuizOutcome, QuizVerdict, score_quiz};
