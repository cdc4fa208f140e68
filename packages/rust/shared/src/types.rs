//! Core domain types for PureLearn courses and learner progress.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{PurelearnError, Result};

/// URL prefix under which course pages are addressed.
pub const COURSES_PATH_PREFIX: &str = "/courses";

// ---------------------------------------------------------------------------
// Course outline
// ---------------------------------------------------------------------------

/// External reading attached to a subtopic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Link text.
    pub title: String,
    /// Target URL.
    pub url: String,
    /// Optional one-line description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A single page in a course outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtopic {
    /// Slug, unique within the owning topic.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Further reading shown below the page body.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
}

/// An ordered group of subtopics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Slug, unique within the course.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Subtopics in navigation order.
    #[serde(default)]
    pub subtopics: Vec<Subtopic>,
}

impl Topic {
    /// Look up a subtopic by slug.
    pub fn subtopic(&self, slug: &str) -> Option<&Subtopic> {
        self.subtopics.iter().find(|s| s.slug == slug)
    }
}

/// A course and its outline, as described by `metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Directory name of the course; not stored in `metadata.json`.
    #[serde(default)]
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Short description for course listings.
    #[serde(default)]
    pub description: String,
    /// Topics in navigation order.
    #[serde(default)]
    pub topics: Vec<Topic>,
    /// Free-form "last updated" label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Number of contributing authors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_count: Option<u32>,
    /// Free-form duration label, e.g. "4 hours".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
}

impl Course {
    /// Placeholder used for a course directory without `metadata.json`.
    pub fn placeholder(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            title: slug.to_string(),
            description: String::new(),
            topics: Vec::new(),
            updated_at: None,
            author_count: None,
            estimated_time: None,
        }
    }

    /// Look up a topic by slug.
    pub fn topic(&self, slug: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.slug == slug)
    }

    /// Total number of subtopics across all topics.
    pub fn subtopic_count(&self) -> usize {
        self.topics.iter().map(|t| t.subtopics.len()).sum()
    }

    /// Check that slugs are unique within their sibling scope.
    pub fn validate(&self) -> Result<()> {
        let mut topic_slugs = HashSet::new();
        for topic in &self.topics {
            if !topic_slugs.insert(topic.slug.as_str()) {
                return Err(PurelearnError::validation(format!(
                    "course '{}' has duplicate topic slug '{}'",
                    self.slug, topic.slug
                )));
            }

            let mut subtopic_slugs = HashSet::new();
            for subtopic in &topic.subtopics {
                if !subtopic_slugs.insert(subtopic.slug.as_str()) {
                    return Err(PurelearnError::validation(format!(
                        "topic '{}/{}' has duplicate subtopic slug '{}'",
                        self.slug, topic.slug, subtopic.slug
                    )));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Positions and links
// ---------------------------------------------------------------------------

/// Address of one subtopic page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub course_slug: String,
    pub topic_slug: String,
    pub subtopic_slug: String,
}

impl Position {
    pub fn new(
        course_slug: impl Into<String>,
        topic_slug: impl Into<String>,
        subtopic_slug: impl Into<String>,
    ) -> Self {
        Self {
            course_slug: course_slug.into(),
            topic_slug: topic_slug.into(),
            subtopic_slug: subtopic_slug.into(),
        }
    }

    /// Page path, e.g. `/courses/rust/basics/ownership`.
    pub fn href(&self) -> String {
        format!(
            "{COURSES_PATH_PREFIX}/{}/{}/{}",
            self.course_slug, self.topic_slug, self.subtopic_slug
        )
    }

    /// Progress key of this page.
    pub fn section_id(&self) -> SectionId {
        SectionId::subtopic(&self.course_slug, &self.topic_slug, &self.subtopic_slug)
    }
}

/// A rendered previous/next link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationLink {
    pub href: String,
    pub title: String,
}

/// Previous and next links around one page. Either side may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicNavigation {
    pub prev_link: Option<NavigationLink>,
    pub next_link: Option<NavigationLink>,
}

// ---------------------------------------------------------------------------
// SectionId
// ---------------------------------------------------------------------------

/// Progress key: `course/topic` or `course/topic/subtopic`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(String);

impl SectionId {
    /// Key for a whole topic.
    pub fn topic(course_slug: &str, topic_slug: &str) -> Self {
        Self(format!("{course_slug}/{topic_slug}"))
    }

    /// Key for a single subtopic page.
    pub fn subtopic(course_slug: &str, topic_slug: &str, subtopic_slug: &str) -> Self {
        Self(format!("{course_slug}/{topic_slug}/{subtopic_slug}"))
    }

    /// Derive a key from a page path such as `/courses/rust/basics/ownership`.
    ///
    /// Only a page path (leading `/courses/`) loses its prefix. Raw keys pass
    /// through with surrounding slashes trimmed, so a course named `courses`
    /// keeps its first segment.
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.trim();
        let page_prefix = format!("{COURSES_PATH_PREFIX}/");
        let trimmed = trimmed.strip_prefix(page_prefix.as_str()).unwrap_or(trimmed);
        Self(trimmed.trim_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Segment-aware prefix test: `rust` owns `rust/a` but not `rust-advanced/a`.
pub fn key_belongs_to_course(key: &str, course_slug: &str) -> bool {
    match key.strip_prefix(course_slug) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for SectionId {
    type Err = PurelearnError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let id = Self::from_path(s);
        if id.0.is_empty() || id.0.split('/').any(str::is_empty) {
            return Err(PurelearnError::validation(format!("invalid section id '{s}'")));
        }
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Progress records
// ---------------------------------------------------------------------------

/// Outcome of the latest attempt at a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRecord {
    pub completed: bool,
    pub score: u32,
    pub total: u32,
}

impl QuizRecord {
    /// Build a finished-quiz record, rejecting impossible scores.
    pub fn finished(score: u32, total: u32) -> Result<Self> {
        let record = Self {
            completed: true,
            score,
            total,
        };
        record.check()?;
        Ok(record)
    }

    /// `total > 0` and `score <= total`.
    pub fn check(&self) -> Result<()> {
        if self.total == 0 {
            return Err(PurelearnError::validation("quiz total must be positive"));
        }
        if self.score > self.total {
            return Err(PurelearnError::validation(format!(
                "quiz score {} exceeds total {}",
                self.score, self.total
            )));
        }
        Ok(())
    }

    /// Score as a whole percentage, rounded down.
    pub fn percent(&self) -> u32 {
        let percent = u64::from(self.score) * 100 / u64::from(self.total.max(1));
        u32::try_from(percent).unwrap_or(u32::MAX)
    }
}

/// Section completion flags keyed by section id. Only `true` is ever stored.
pub type SectionProgress = BTreeMap<String, bool>;

/// Latest quiz result keyed by section id.
pub type QuizProgress = BTreeMap<String, QuizRecord>;

/// Bookmarked headings keyed by bookmark key. Only `true` is ever stored.
pub type Bookmarks = BTreeMap<String, bool>;

// ---------------------------------------------------------------------------
// Quiz questions
// ---------------------------------------------------------------------------

/// One multiple-choice question, as declared in a page's `quiz:` front-matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`.
    pub correct_answer: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuizQuestion {
    /// At least one option, and `correct_answer` points at one of them.
    pub fn check(&self) -> Result<()> {
        if self.options.is_empty() {
            return Err(PurelearnError::validation(format!(
                "question '{}' has no options",
                self.question
            )));
        }
        if self.correct_answer >= self.options.len() {
            return Err(PurelearnError::validation(format!(
                "question '{}' answer {} is out of range (options: {})",
                self.question,
                self.correct_answer,
                self.options.len()
            )));
        }
        Ok(())
    }
}
