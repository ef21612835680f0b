//! Resume document model.
//!
//! The canonical shape is nested: `{version, header, sections: [{id, title, content}]}`.
//! Older prompts produced a flattened shape with top-level `summary`, `experience`, ...
//! fields; `StructuredResume::from_value` accepts both and converts the flat one
//! through `From<FlatResume>`.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

pub const RESUME_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Error)]
pub enum ResumeShapeError {
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("JSON object does not match the resume schema: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("`sections` must be a list")]
    SectionsNotAList,

    #[error("JSON object contains no resume content")]
    Empty,
}

// ────────────────────────────────────────────────────────────────────────────
// Lenient scalars
// ────────────────────────────────────────────────────────────────────────────

/// Scalar JSON as text. Models emit numbers where strings belong (`"version": 1`,
/// numeric phone numbers); arrays, objects and null carry no usable text.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

fn lenient_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_else(default_version))
}

fn lenient_section_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SectionId, D::Error> {
    scalar_text(Value::deserialize(deserializer)?)
        .map(SectionId::from)
        .ok_or_else(|| de::Error::custom("section id must be a string or a number"))
}

// ────────────────────────────────────────────────────────────────────────────
// Canonical shape
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeHeader {
    #[serde(deserialize_with = "lenient_string")]
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub github: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub portfolio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub headline: Option<String>,
}

/// Well-known section ids. Anything else the model emits is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SectionId {
    Summary,
    Experience,
    Projects,
    Skills,
    Education,
    Certifications,
    Other(String),
}

impl SectionId {
    pub fn as_str(&self) -> &str {
        match self {
            SectionId::Summary => "summary",
            SectionId::Experience => "experience",
            SectionId::Projects => "projects",
            SectionId::Skills => "skills",
            SectionId::Education => "education",
            SectionId::Certifications => "certifications",
            SectionId::Other(id) => id,
        }
    }

    pub fn default_title(&self) -> &str {
        match self {
            SectionId::Summary => "Summary",
            SectionId::Experience => "Experience",
            SectionId::Projects => "Projects",
            SectionId::Skills => "Skills",
            SectionId::Education => "Education",
            SectionId::Certifications => "Certifications",
            SectionId::Other(id) => id,
        }
    }
}

impl From<String> for SectionId {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "summary" => SectionId::Summary,
            "experience" => SectionId::Experience,
            "projects" => SectionId::Projects,
            "skills" => SectionId::Skills,
            "education" => SectionId::Education,
            "certifications" => SectionId::Certifications,
            _ => SectionId::Other(value),
        }
    }
}

impl From<SectionId> for String {
    fn from(value: SectionId) -> Self {
        value.as_str().to_string()
    }
}

/// One entry of a list-valued section (experience, projects, education).
/// Fields the schema does not name are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionItem {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub dates: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bullets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub impact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub degree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub institution: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Section body. Variant order matters: serde tries them top to bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionContent {
    Paragraphs(Vec<String>),
    Items(Vec<SectionItem>),
    Text(String),
    Other(Value),
}

impl Default for SectionContent {
    fn default() -> Self {
        SectionContent::Paragraphs(Vec::new())
    }
}

impl SectionContent {
    pub fn is_empty(&self) -> bool {
        match self {
            SectionContent::Paragraphs(p) => p.is_empty(),
            SectionContent::Items(items) => items.is_empty(),
            SectionContent::Text(text) => text.trim().is_empty(),
            SectionContent::Other(value) => value.is_null(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeSection {
    #[serde(deserialize_with = "lenient_section_id")]
    pub id: SectionId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default)]
    pub content: SectionContent,
}

impl ResumeSection {
    pub fn new(id: SectionId, content: SectionContent) -> Self {
        Self {
            title: id.default_title().to_string(),
            id,
            content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredResume {
    #[serde(default = "default_version", deserialize_with = "lenient_version")]
    pub version: String,
    #[serde(default)]
    pub header: ResumeHeader,
    pub sections: Vec<ResumeSection>,
}

fn default_version() -> String {
    RESUME_SCHEMA_VERSION.to_string()
}

impl StructuredResume {
    /// Converts a parsed model response into the canonical shape.
    ///
    /// A `sections` key selects the nested shape; anything else goes through
    /// the flat adapter. Nested sections are read one at a time, so a bad entry
    /// is skipped instead of failing the whole resume.
    pub fn from_value(value: Value) -> Result<Self, ResumeShapeError> {
        let mut map = match value {
            Value::Object(map) => map,
            other => return Err(ResumeShapeError::NotAnObject(json_kind(&other))),
        };

        match map.remove("sections") {
            Some(sections) => Self::from_nested(map, sections),
            None => {
                let flat: FlatResume = serde_json::from_value(Value::Object(map))?;
                if flat.is_empty() {
                    return Err(ResumeShapeError::Empty);
                }
                Ok(flat.into())
            }
        }
    }

    fn from_nested(frame: Map<String, Value>, sections: Value) -> Result<Self, ResumeShapeError> {
        let frame: ResumeFrame = serde_json::from_value(Value::Object(frame))?;
        let Value::Array(raw) = sections else {
            return Err(ResumeShapeError::SectionsNotAList);
        };

        let total = raw.len();
        let sections: Vec<ResumeSection> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(i, section)| match serde_json::from_value(section) {
                Ok(section) => Some(section),
                Err(e) => {
                    warn!("Skipping resume section {i}: {e}");
                    None
                }
            })
            .collect();

        if total > 0 && sections.is_empty() {
            return Err(ResumeShapeError::Empty);
        }

        Ok(StructuredResume {
            version: frame.version,
            header: frame.header,
            sections,
        })
    }

    pub fn section(&self, id: &SectionId) -> Option<&ResumeSection> {
        self.sections.iter().find(|s| &s.id == id)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shape selection
// ────────────────────────────────────────────────────────────────────────────

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Everything of the nested shape except `sections`.
#[derive(Debug, Deserialize)]
struct ResumeFrame {
    #[serde(default = "default_version", deserialize_with = "lenient_version")]
    version: String,
    #[serde(default)]
    header: ResumeHeader,
}

// ────────────────────────────────────────────────────────────────────────────
// Flattened shape (adapter input only)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_paragraphs(self) -> Vec<String> {
        let items = match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlatResume {
    #[serde(deserialize_with = "lenient_opt_string")]
    pub version: Option<String>,
    pub header: Option<ResumeHeader>,
    pub summary: Option<OneOrMany>,
    pub experience: Vec<SectionItem>,
    pub projects: Vec<SectionItem>,
    pub skills: Vec<String>,
    pub education: Vec<SectionItem>,
    pub certifications: Vec<String>,
}

impl FlatResume {
    fn is_empty(&self) -> bool {
        self.header.is_none()
            && self.summary.is_none()
            && self.experience.is_empty()
            && self.projects.is_empty()
            && self.skills.is_empty()
            && self.education.is_empty()
            && self.certifications.is_empty()
    }
}

impl From<FlatResume> for StructuredResume {
    fn from(flat: FlatResume) -> Self {
        let candidates = [
            (
                SectionId::Summary,
                SectionContent::Paragraphs(
                    flat.summary.map(OneOrMany::into_paragraphs).unwrap_or_default(),
                ),
            ),
            (SectionId::Experience, SectionContent::Items(flat.experience)),
            (SectionId::Projects, SectionContent::Items(flat.projects)),
            (SectionId::Skills, SectionContent::Paragraphs(flat.skills)),
            (SectionId::Education, SectionContent::Items(flat.education)),
            (
                SectionId::Certifications,
                SectionContent::Paragraphs(flat.certifications),
            ),
        ];

        StructuredResume {
            version: flat.version.unwrap_or_else(default_version),
            header: flat.header.unwrap_or_default(),
            sections: candidates
                .into_iter()
                .filter(|(_, content)| !content.is_empty())
                .map(|(id, content)| ResumeSection::new(id, content))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_shape_is_taken_verbatim() {
        let value = json!({
            "version": "1",
            "header": {"fullName": "Jane Doe", "email": "jane@example.com"},
            "sections": [
                {"id": "summary", "title": "Summary", "content": ["Backend engineer."]},
                {"id": "experience", "title": "Experience", "content": [
                    {"title": "Engineer", "company": "Acme", "bullets": ["Cut p99 by 40%"]}
                ]}
            ]
        });
        let resume = StructuredResume::from_value(value).unwrap();
        assert_eq!(resume.header.full_name, "Jane Doe");
        assert_eq!(resume.sections.len(), 2);
        match &resume.section(&SectionId::Experience).unwrap().content {
            SectionContent::Items(items) => {
                assert_eq!(items[0].company.as_deref(), Some("Acme"));
                assert_eq!(items[0].bullets, vec!["Cut p99 by 40%"]);
            }
            other => panic!("expected items, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_section_id_is_preserved() {
        let value = json!({
            "header": {"fullName": "Jane Doe"},
            "sections": [{"id": "volunteering", "title": "Volunteering", "content": "Food bank"}]
        });
        let resume = StructuredResume::from_value(value).unwrap();
        assert_eq!(resume.version, RESUME_SCHEMA_VERSION);
        assert_eq!(
            resume.sections[0].id,
            SectionId::Other("volunteering".to_string())
        );
        assert_eq!(
            resume.sections[0].content,
            SectionContent::Text("Food bank".to_string())
        );
    }

    #[test]
    fn test_flat_shape_is_adapted_to_sections() {
        let value = json!({
            "header": {"fullName": "Sam Lee"},
            "summary": "Platform engineer with a reliability focus.",
            "experience": [{"title": "SRE", "company": "Globex"}],
            "skills": ["Rust", "Postgres"],
            "certifications": []
        });
        let resume = StructuredResume::from_value(value).unwrap();
        let ids: Vec<&str> = resume.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["summary", "experience", "skills"]);
        assert_eq!(resume.sections[0].title, "Summary");
        assert_eq!(
            resume.sections[0].content,
            SectionContent::Paragraphs(vec![
                "Platform engineer with a reliability focus.".to_string()
            ])
        );
    }

    #[test]
    fn test_item_extra_fields_survive_round_trip() {
        let value = json!({
            "sections": [{"id": "projects", "title": "Projects", "content": [
                {"title": "Ledger", "stars": 120}
            ]}]
        });
        let resume = StructuredResume::from_value(value).unwrap();
        let out = serde_json::to_value(&resume).unwrap();
        assert_eq!(out["sections"][0]["content"][0]["stars"], 120);
        assert_eq!(out["sections"][0]["id"], "projects");
    }

    #[test]
    fn test_numeric_scalars_are_read_as_text() {
        let value = json!({
            "version": 1,
            "header": {"fullName": "Jane Doe", "phone": 5551234, "email": null},
            "sections": [{"id": "summary", "title": "Summary", "content": ["Backend engineer."]}]
        });
        let resume = StructuredResume::from_value(value).unwrap();
        assert_eq!(resume.version, "1");
        assert_eq!(resume.header.phone.as_deref(), Some("5551234"));
        assert_eq!(resume.header.email, None);
        assert_eq!(resume.sections.len(), 1);
    }

    #[test]
    fn test_flat_shape_tolerates_numeric_version() {
        let value = json!({"version": 2, "header": {"fullName": "Sam Lee"}, "skills": ["Rust"]});
        let resume = StructuredResume::from_value(value).unwrap();
        assert_eq!(resume.version, "2");
        assert_eq!(resume.section(&SectionId::Skills).unwrap().title, "Skills");
    }

    #[test]
    fn test_bad_section_does_not_drop_the_others() {
        let value = json!({
            "header": {"fullName": "Jane Doe"},
            "sections": [
                {"id": "summary", "title": "Summary", "content": ["Backend engineer."]},
                {"id": 7, "title": "Numbered", "content": ["kept"]},
                {"id": {"nested": true}, "content": ["dropped"]},
                "not a section"
            ]
        });
        let resume = StructuredResume::from_value(value).unwrap();
        let ids: Vec<&str> = resume.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["summary", "7"]);
        assert_eq!(resume.header.full_name, "Jane Doe");
    }

    #[test]
    fn test_sections_key_selects_nested_shape() {
        // top-level flat keys are ignored once `sections` is present
        let value = json!({
            "sections": [{"id": "skills", "content": ["Rust"]}],
            "summary": "ignored"
        });
        let resume = StructuredResume::from_value(value).unwrap();
        assert_eq!(resume.sections.len(), 1);
        assert_eq!(resume.sections[0].id, SectionId::Skills);

        let err = StructuredResume::from_value(json!({"sections": {"id": "skills"}})).unwrap_err();
        assert!(matches!(err, ResumeShapeError::SectionsNotAList));

        let err = StructuredResume::from_value(json!({"sections": ["x", 3]})).unwrap_err();
        assert!(matches!(err, ResumeShapeError::Empty));
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = StructuredResume::from_value(json!(["a", "b"])).unwrap_err();
        assert!(matches!(err, ResumeShapeError::NotAnObject("an array")));
    }

    #[test]
    fn test_object_without_resume_content_is_rejected() {
        let err = StructuredResume::from_value(json!({"note": "sorry"})).unwrap_err();
        assert!(matches!(err, ResumeShapeError::Empty));
    }
}
