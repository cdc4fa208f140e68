//! Course content loading.
//!
//! A content root holds one directory per course:
//!
//! ```text
//! <root>/<course>/metadata.json            outline + course metadata
//! <root>/<course>/<topic>/<subtopic>.mdx   one page per subtopic
//! ```
//!
//! Directories whose name starts with `[` are route placeholders and are
//! skipped. Missing courses or pages are reported as `Ok(None)`; malformed
//! files are parse errors.

pub mod frontmatter;
pub mod highlights;

use std::path::PathBuf;

use tracing::{debug, instrument, warn};

use purelearn_shared::{Course, PurelearnError, Result};

pub use frontmatter::FrontMatter;

/// Outline file name inside each course directory.
const METADATA_FILE: &str = "metadata.json";

/// Page extensions, in lookup order.
const PAGE_EXTENSIONS: [&str; 2] = ["mdx", "md"];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A loaded subtopic page.
#[derive(Debug, Clone)]
pub struct SubtopicPage {
    /// File the page was read from.
    pub path: PathBuf,
    /// Parsed front-matter.
    pub front_matter: FrontMatter,
    /// Markdown body with the highlights section removed.
    pub body: String,
    /// Bullet points of the highlights section.
    pub highlights: Vec<String>,
}

impl SubtopicPage {
    /// Parse a page from its full source text.
    ///
    /// Quiz questions declared in the front-matter must be answerable.
    pub fn parse(path: impl Into<PathBuf>, source: &str) -> Result<Self> {
        let (front_matter, body) = frontmatter::split(source)?;
        for question in &front_matter.quiz {
            question.check()?;
        }
        let split = highlights::extract(body);
        Ok(Self {
            path: path.into(),
            front_matter,
            body: split.main,
            highlights: split.points,
        })
    }
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Read-only access to a content directory.
#[derive(Debug, Clone)]
pub struct ContentRepository {
    root: PathBuf,
}

impl ContentRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// All courses under the root, sorted by slug.
    ///
    /// A course directory without `metadata.json` is listed with a
    /// placeholder title and an empty outline.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn list_courses(&self) -> Result<Vec<Course>> {
        if !self.root.is_dir() {
            debug!("content root does not exist");
            return Ok(Vec::new());
        }

        let entries =
            std::fs::read_dir(&self.root).map_err(|e| PurelearnError::io(&self.root, e))?;

        let mut slugs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PurelearnError::io(&self.root, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('[') || name.starts_with('.') {
                continue;
            }
            slugs.push(name);
        }
        slugs.sort();

        let mut courses = Vec::with_capacity(slugs.len());
        for slug in slugs {
            let course = self
                .course(&slug)?
                .unwrap_or_else(|| Course::placeholder(&slug));
            courses.push(course);
        }

        debug!(count = courses.len(), "courses listed");
        Ok(courses)
    }

    /// Load one course outline, or `None` if it has no `metadata.json`.
    #[instrument(skip(self))]
    pub fn course(&self, slug: &str) -> Result<Option<Course>> {
        if !is_safe_segment(slug) {
            return Ok(None);
        }

        let path = self.root.join(slug).join(METADATA_FILE);
        if !path.is_file() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&path).map_err(|e| PurelearnError::io(&path, e))?;
        let mut course: Course = serde_json::from_str(&raw)
            .map_err(|e| PurelearnError::parse(format!("{}: {e}", path.display())))?;
        course.slug = slug.to_string();
        course.validate()?;
        check_reference_urls(&course);

        debug!(
            topics = course.topics.len(),
            subtopics = course.subtopic_count(),
            "course loaded"
        );
        Ok(Some(course))
    }

    /// Load a course or fail with [`PurelearnError::NotFound`].
    pub fn require_course(&self, slug: &str) -> Result<Course> {
        self.course(slug)?
            .ok_or_else(|| PurelearnError::NotFound(format!("course '{slug}'")))
    }

    /// Load the page for one subtopic, or `None` if no page file exists.
    #[instrument(skip(self))]
    pub fn page(
        &self,
        course_slug: &str,
        topic_slug: &str,
        subtopic_slug: &str,
    ) -> Result<Option<SubtopicPage>> {
        if ![course_slug, topic_slug, subtopic_slug]
            .iter()
            .all(|s| is_safe_segment(s))
        {
            return Ok(None);
        }

        let dir = self.root.join(course_slug).join(topic_slug);
        let Some(path) = PAGE_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{subtopic_slug}.{ext}")))
            .find(|p| p.is_file())
        else {
            return Ok(None);
        };

        let source = std::fs::read_to_string(&path).map_err(|e| PurelearnError::io(&path, e))?;
        let page = SubtopicPage::parse(&path, &source)?;
        debug!(
            highlights = page.highlights.len(),
            body_len = page.body.len(),
            "page loaded"
        );
        Ok(Some(page))
    }
}

/// Slugs are single path segments; anything else cannot name content.
fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}

/// Log references whose URL does not parse; they are still rendered.
fn check_reference_urls(course: &Course) {
    for topic in &course.topics {
        for subtopic in &topic.subtopics {
            for reference in &subtopic.references {
                if let Err(e) = url::Url::parse(&reference.url) {
                    warn!(
                        course = %course.slug,
                        topic = %topic.slug,
                        subtopic = %subtopic.slug,
                        url = %reference.url,
                        error = %e,
                        "reference has an invalid URL"
                    );
                }
            }
        }
    }
}
