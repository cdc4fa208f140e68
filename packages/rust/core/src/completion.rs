//! Derived completion for outline views.
//!
//! A subtopic counts as completed when it was marked completed or its quiz
//! was finished. A topic counts as completed when the topic itself was
//! marked, its own quiz was finished, or it has subtopics and all of them are
//! completed. Nothing here is persisted.

use serde::Serialize;

use purelearn_shared::{Course, Position, QuizRecord, SectionId, Topic};

use crate::progress::ProgressState;

/// Marked completed or quiz finished.
fn section_done(state: &ProgressState, id: &SectionId) -> bool {
    state.is_section_marked(id) || state.quiz(id).is_some_and(|q| q.completed)
}

pub fn is_subtopic_completed(
    state: &ProgressState,
    course_slug: &str,
    topic_slug: &str,
    subtopic_slug: &str,
) -> bool {
    section_done(
        state,
        &SectionId::subtopic(course_slug, topic_slug, subtopic_slug),
    )
}

pub fn is_topic_completed(state: &ProgressState, course_slug: &str, topic: &Topic) -> bool {
    section_done(state, &SectionId::topic(course_slug, &topic.slug))
        || (!topic.subtopics.is_empty()
            && topic
                .subtopics
                .iter()
                .all(|s| is_subtopic_completed(state, course_slug, &topic.slug, &s.slug)))
}

/// Whether a quiz result exists for `id`.
pub fn has_quiz(state: &ProgressState, id: &SectionId) -> bool {
    state.quiz(id).is_some()
}

// ---------------------------------------------------------------------------
// Course overview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtopicStatus {
    pub slug: String,
    pub title: String,
    pub href: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz: Option<QuizRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicStatus {
    pub slug: String,
    pub title: String,
    pub completed: bool,
    /// A quiz result is stored under the topic's own section id.
    pub has_quiz: bool,
    pub subtopics: Vec<SubtopicStatus>,
}

/// Completion of every topic and subtopic in one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseProgress {
    pub course_slug: String,
    pub topics: Vec<TopicStatus>,
    pub completed_subtopics: usize,
    pub total_subtopics: usize,
}

impl CourseProgress {
    /// Share of completed subtopics, rounded down. An empty course is 0%.
    pub fn percent(&self) -> u32 {
        if self.total_subtopics == 0 {
            return 0;
        }
        (self.completed_subtopics * 100 / self.total_subtopics) as u32
    }
}

/// Walk the outline and evaluate completion for each entry.
pub fn course_progress(course: &Course, state: &ProgressState) -> CourseProgress {
    let topics: Vec<TopicStatus> = course
        .topics
        .iter()
        .map(|topic| TopicStatus {
            slug: topic.slug.clone(),
            title: topic.title.clone(),
            completed: is_topic_completed(state, &course.slug, topic),
            has_quiz: has_quiz(state, &SectionId::topic(&course.slug, &topic.slug)),
            subtopics: topic
                .subtopics
                .iter()
                .map(|sub| {
                    let position = Position::new(&course.slug, &topic.slug, &sub.slug);
                    let id = position.section_id();
                    SubtopicStatus {
                        slug: sub.slug.clone(),
                        title: sub.title.clone(),
                        href: position.href(),
                        completed: section_done(state, &id),
                        quiz: state.quiz(&id).copied(),
                    }
                })
                .collect(),
        })
        .collect();

    let completed_subtopics = topics
        .iter()
        .flat_map(|t| &t.subtopics)
        .filter(|s| s.completed)
        .count();

    CourseProgress {
        course_slug: course.slug.clone(),
        topics,
        completed_subtopics,
        total_subtopics: course.subtopic_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use purelearn_shared::Subtopic;

    use crate::progress::ProgressAction;

    fn course() -> Course {
        let mut course = Course::placeholder("rust");
        course.topics = vec![
            Topic {
                slug: "basics".into(),
                title: "Basics".into(),
                subtopics: ["intro", "ownership"]
                    .iter()
                    .map(|s| Subtopic {
                        slug: (*s).into(),
                        title: s.to_uppercase(),
                        references: vec![],
                    })
                    .collect(),
            },
            Topic {
                slug: "empty".into(),
                title: "Empty".into(),
                subtopics: vec![],
            },
        ];
        course
    }

    fn state_with(actions: &[ProgressAction]) -> ProgressState {
        let mut state = ProgressState::default();
        for action in actions {
            state.apply(action);
        }
        state
    }

    fn mark(raw: &str) -> ProgressAction {
        ProgressAction::MarkSectionCompleted(SectionId::from_path(raw))
    }

    fn quiz(raw: &str) -> ProgressAction {
        ProgressAction::RecordQuiz {
            section: SectionId::from_path(raw),
            record: QuizRecord::finished(1, 2).expect("valid"),
        }
    }

    #[test]
    fn topic_completed_by_all_subtopics() {
        let course = course();
        let basics = &course.topics[0];

        let state = state_with(&[mark("rust/basics/intro")]);
        assert!(!is_topic_completed(&state, "rust", basics));

        let state = state_with(&[mark("rust/basics/intro"), quiz("rust/basics/ownership")]);
        assert!(is_subtopic_completed(&state, "rust", "basics", "ownership"));
        assert!(is_topic_completed(&state, "rust", basics));
    }

    #[test]
    fn topic_completed_directly_or_by_quiz() {
        let course = course();
        let empty = &course.topics[1];

        assert!(!is_topic_completed(&ProgressState::default(), "rust", empty));
        assert!(is_topic_completed(&state_with(&[mark("rust/empty")]), "rust", empty));
        assert!(is_topic_completed(&state_with(&[quiz("rust/empty")]), "rust", empty));
    }

    #[test]
    fn quiz_presence() {
        let state = state_with(&[quiz("rust/basics/intro")]);
        assert!(has_quiz(&state, &SectionId::from_path("rust/basics/intro")));
        assert!(!has_quiz(&state, &SectionId::from_path("rust/basics/ownership")));
    }

    #[test]
    fn overview_counts_and_percent() {
        let course = course();
        let state = state_with(&[mark("rust/basics/intro"), quiz("rust/basics/intro")]);
        let progress = course_progress(&course, &state);

        assert_eq!(progress.total_subtopics, 2);
        assert_eq!(progress.completed_subtopics, 1);
        assert_eq!(progress.percent(), 50);
        assert_eq!(progress.topics[0].subtopics[0].href, "/courses/rust/basics/intro");
        assert!(progress.topics[0].subtopics[0].quiz.is_some());
        assert!(!progress.topics[0].completed);
        assert!(!progress.topics[1].completed);
        assert!(!progress.topics[0].has_quiz);

        let state = state_with(&[quiz("rust/basics")]);
        let progress = course_progress(&course, &state);
        assert!(progress.topics[0].has_quiz);
        assert!(progress.topics[0].completed);
        assert!(!progress.topics[1].has_quiz);

        let empty = course_progress(&Course::placeholder("x"), &state);
        assert_eq!(empty.percent(), 0);
    }
}
