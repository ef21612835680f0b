use serde::{Deserialize, Serialize};

/// Contact block of a candidate profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileHeader {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub portfolio: Option<String>,
    pub headline: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperienceItem {
    #[serde(alias = "role")]
    pub title: Option<String>,
    #[serde(alias = "organisation", alias = "organization")]
    pub company: Option<String>,
    pub dates: Option<String>,
    pub location: Option<String>,
    #[serde(alias = "bullets")]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectItem {
    #[serde(alias = "name")]
    pub title: Option<String>,
    pub description: Option<String>,
    pub impact: Option<String>,
    pub link: Option<String>,
    pub dates: Option<String>,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationItem {
    pub degree: Option<String>,
    pub institution: Option<String>,
    pub dates: Option<String>,
    pub highlights: Vec<String>,
}

/// Structured candidate profile edited by the user. Authoritative source for
/// profile-direct prompt composition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CandidateProfile {
    pub header: ProfileHeader,
    pub summary: Option<String>,
    pub experience: Vec<ExperienceItem>,
    pub projects: Vec<ProjectItem>,
    pub skills: Vec<String>,
    pub education: Vec<EducationItem>,
    pub certifications: Vec<String>,
}

/// Trims an optional field, returning `None` for missing or blank values.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
