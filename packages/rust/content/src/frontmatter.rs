//! YAML front-matter splitting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use purelearn_shared::{PurelearnError, QuizQuestion, Result};

/// Page metadata declared between the leading `---` fences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontMatter {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Multiple-choice questions for the page's quiz.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quiz: Vec<QuizQuestion>,
    /// Any other keys, kept for callers that want them.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Split a document into its front-matter and the remaining body.
///
/// A document without an opening `---` line has empty front-matter. An
/// opening fence with no closing fence is treated as plain body text.
pub fn split(source: &str) -> Result<(FrontMatter, &str)> {
    let Some(after_open) = strip_fence_line(source.trim_start_matches('\u{feff}')) else {
        return Ok((FrontMatter::default(), source));
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &after_open[..offset];
            let body = &after_open[offset + line.len()..];
            let front = parse_yaml(yaml)?;
            return Ok((front, body));
        }
        offset += line.len();
    }

    Ok((FrontMatter::default(), source))
}

/// If `source` starts with a `---` line, return what follows it.
fn strip_fence_line(source: &str) -> Option<&str> {
    let first_line_end = source.find('\n')?;
    if source[..first_line_end].trim_end() == "---" {
        Some(&source[first_line_end + 1..])
    } else {
        None
    }
}

fn parse_yaml(yaml: &str) -> Result<FrontMatter> {
    if yaml.trim().is_empty() {
        return Ok(FrontMatter::default());
    }
    serde_yaml::from_str(yaml).map_err(|e| PurelearnError::parse(format!("front-matter: {e}")))
}
