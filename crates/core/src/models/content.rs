use crate::constants::CONTENT_COLLECTION;
use crate::store::Document;
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use mindcare_types::NonEmptyText;
use mindcare_uuid::RecordId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    Article,
    Exercise,
}

impl ContentType {
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(Self::Video),
            "article" => Ok(Self::Article),
            "exercise" => Ok(Self::Exercise),
            other => Err(CoreError::InvalidInput(format!(
                "unknown content type '{}'",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Article => "article",
            Self::Exercise => "exercise",
        }
    }
}

/// Curated self-help material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub id: RecordId,
    pub title: NonEmptyText,
    pub content_type: ContentType,
    pub url: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub owner_id: RecordId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Content {
    const COLLECTION: &'static str = CONTENT_COLLECTION;

    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Clone, Debug)]
pub struct NewContent {
    pub title: NonEmptyText,
    pub content_type: ContentType,
    pub url: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ContentUpdate {
    pub title: Option<NonEmptyText>,
    pub content_type: Option<ContentType>,
    pub url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub description: Option<String>,
}

/// Optional listing filters; tags match case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct ContentQuery {
    pub content_type: Option<ContentType>,
    pub tag: Option<String>,
}

impl ContentQuery {
    pub fn matches(&self, content: &Content) -> bool {
        let type_ok = self
            .content_type
            .map_or(true, |wanted| content.content_type == wanted);
        let tag_ok = self.tag.as_deref().map_or(true, |wanted| {
            content
                .tags
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case(wanted.trim()))
        });
        type_ok && tag_ok
    }
}

/// Trims, lowercases and de-duplicates tags, dropping empty ones.
pub fn normalise_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_normalised() {
        let tags = normalise_tags(vec![
            " Sleep ".into(),
            "sleep".into(),
            "".into(),
            "Breathing".into(),
        ]);
        assert_eq!(tags, vec!["sleep".to_string(), "breathing".to_string()]);
    }
}
