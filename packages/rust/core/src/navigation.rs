//! Previous/next navigation across a course outline.
//!
//! Pages are ordered topic by topic, subtopic by subtopic. Stepping past the
//! first or last subtopic of a topic crosses into the neighbouring topic.
//! Topics without subtopics have no pages and are stepped over.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, instrument};

use purelearn_shared::{Course, NavigationLink, Position, Subtopic, Topic, TopicNavigation};

/// Resolve the previous and next links around `(topic_slug, subtopic_slug)`.
///
/// Unknown topic or subtopic slugs yield no links rather than an error.
#[instrument(skip(topics), fields(topics = topics.len()))]
pub fn resolve_navigation(
    course_slug: &str,
    topics: &[Topic],
    topic_slug: &str,
    subtopic_slug: &str,
) -> TopicNavigation {
    let Some(topic_index) = topics.iter().position(|t| t.slug == topic_slug) else {
        debug!("topic not in outline");
        return TopicNavigation::default();
    };
    let topic = &topics[topic_index];
    let Some(subtopic_index) = topic.subtopics.iter().position(|s| s.slug == subtopic_slug)
    else {
        debug!("subtopic not in topic");
        return TopicNavigation::default();
    };

    let prev = if subtopic_index > 0 {
        Some((topic, &topic.subtopics[subtopic_index - 1]))
    } else {
        topics[..topic_index]
            .iter()
            .rev()
            .find_map(|t| t.subtopics.last().map(|s| (t, s)))
    };

    let next = if subtopic_index + 1 < topic.subtopics.len() {
        Some((topic, &topic.subtopics[subtopic_index + 1]))
    } else {
        topics[topic_index + 1..]
            .iter()
            .find_map(|t| t.subtopics.first().map(|s| (t, s)))
    };

    TopicNavigation {
        prev_link: prev.map(|(t, s)| link(course_slug, t, s)),
        next_link: next.map(|(t, s)| link(course_slug, t, s)),
    }
}

/// Link to the first page of the course, if it has any.
pub fn course_start_link(course_slug: &str, topics: &[Topic]) -> Option<NavigationLink> {
    topics
        .iter()
        .find_map(|t| t.subtopics.first().map(|s| link(course_slug, t, s)))
}

fn link(course_slug: &str, topic: &Topic, subtopic: &Subtopic) -> NavigationLink {
    NavigationLink {
        href: Position::new(course_slug, &topic.slug, &subtopic.slug).href(),
        title: subtopic.title.clone(),
    }
}

// ---------------------------------------------------------------------------
// Navigator
// ---------------------------------------------------------------------------

/// Memoizing resolver bound to one course outline.
///
/// The outline is immutable for the navigator's lifetime, so results are
/// cached per `(topic_slug, subtopic_slug)`. The cache only pays off for a
/// navigator that outlives one lookup; one-shot CLI commands resolve once.
#[derive(Debug)]
pub struct Navigator<'a> {
    course: &'a Course,
    memo: Mutex<HashMap<(String, String), TopicNavigation>>,
}

impl<'a> Navigator<'a> {
    pub fn new(course: &'a Course) -> Self {
        Self {
            course,
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Links around one page; see [`resolve_navigation`].
    pub fn resolve(&self, topic_slug: &str, subtopic_slug: &str) -> TopicNavigation {
        let key = (topic_slug.to_string(), subtopic_slug.to_string());
        if let Ok(memo) = self.memo.lock() {
            if let Some(hit) = memo.get(&key) {
                return hit.clone();
            }
        }

        let course = self.course;
        let nav = resolve_navigation(&course.slug, &course.topics, topic_slug, subtopic_slug);
        if let Ok(mut memo) = self.memo.lock() {
            memo.insert(key, nav.clone());
        }
        nav
    }

    /// Link to the first page of the course.
    pub fn start(&self) -> Option<NavigationLink> {
        course_start_link(&self.course.slug, &self.course.topics)
    }

    #[cfg(test)]
    fn cached(&self) -> usize {
        self.memo.lock().map(|m| m.len()).unwrap_or(0)
    }
}
