//! Renders a candidate profile into the bounded plain-text snapshot that goes
//! into profile-direct prompts.
//!
//! Clamps keep the snapshot inside the per-prompt budget for typical profiles;
//! the composer only warns when a large profile still exceeds it.

use crate::models::profile::{non_blank, CandidateProfile, ExperienceItem, ProjectItem};

/// Per-section caps applied while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotLimits {
    pub experience: usize,
    pub bullets_per_experience: usize,
    pub projects: usize,
    pub skills: usize,
    pub education: usize,
    pub highlights_per_education: usize,
    pub certifications: usize,
    pub style: SnapshotStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStyle {
    /// Full contact block, project detail lines, education.
    Resume,
    /// Name and headline only, one summary line per project, no education.
    CoverLetter,
}

impl SnapshotLimits {
    pub const RESUME: SnapshotLimits = SnapshotLimits {
        experience: 5,
        bullets_per_experience: 4,
        projects: 4,
        skills: 15,
        education: 3,
        highlights_per_education: 3,
        certifications: 5,
        style: SnapshotStyle::Resume,
    };

    pub const COVER_LETTER: SnapshotLimits = SnapshotLimits {
        experience: 3,
        bullets_per_experience: 4,
        projects: 2,
        skills: 12,
        education: 0,
        highlights_per_education: 0,
        certifications: 4,
        style: SnapshotStyle::CoverLetter,
    };
}

fn clamp(values: &[String], limit: usize) -> Vec<&str> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .take(limit)
        .collect()
}

fn experience_is_empty(exp: &ExperienceItem) -> bool {
    non_blank(&exp.title).is_none()
        && non_blank(&exp.company).is_none()
        && exp.highlights.iter().all(|h| h.trim().is_empty())
}

fn project_is_empty(project: &ProjectItem) -> bool {
    non_blank(&project.title).is_none()
        && non_blank(&project.description).is_none()
        && non_blank(&project.impact).is_none()
        && project.highlights.iter().all(|h| h.trim().is_empty())
}

/// Renders `profile` under `limits`. Returns an empty string when the profile
/// carries nothing worth sending.
pub fn render_snapshot(profile: &CandidateProfile, limits: &SnapshotLimits) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let header = &profile.header;

    let contact: Vec<(&str, &Option<String>)> = match limits.style {
        SnapshotStyle::Resume => vec![
            ("Name", &header.full_name),
            ("Email", &header.email),
            ("Phone", &header.phone),
            ("Location", &header.location),
            ("LinkedIn", &header.linkedin),
            ("GitHub", &header.github),
            ("Portfolio", &header.portfolio),
            ("Headline", &header.headline),
        ],
        SnapshotStyle::CoverLetter => {
            vec![("Name", &header.full_name), ("Headline", &header.headline)]
        }
    };
    for (label, value) in contact {
        if let Some(value) = non_blank(value) {
            blocks.push(format!("{label}: {value}"));
        }
    }

    if let Some(summary) = non_blank(&profile.summary) {
        blocks.push(format!("Summary: {summary}"));
    }

    let experiences = profile
        .experience
        .iter()
        .filter(|e| !experience_is_empty(e))
        .take(limits.experience);
    for (i, exp) in experiences.enumerate() {
        let role = non_blank(&exp.title).unwrap_or("Role");
        let heading = match non_blank(&exp.company) {
            Some(company) => format!("{role} at {company}"),
            None => role.to_string(),
        };
        let mut lines = vec![format!("Experience {}: {heading}", i + 1)];
        if let Some(dates) = non_blank(&exp.dates) {
            lines.push(format!("Dates: {dates}"));
        }
        if limits.style == SnapshotStyle::Resume {
            if let Some(location) = non_blank(&exp.location) {
                lines.push(format!("Location: {location}"));
            }
        }
        for bullet in clamp(&exp.highlights, limits.bullets_per_experience) {
            lines.push(format!("- {bullet}"));
        }
        blocks.push(lines.join("\n"));
    }

    let projects = profile
        .projects
        .iter()
        .filter(|p| !project_is_empty(p))
        .take(limits.projects);
    for (i, project) in projects.enumerate() {
        let title = non_blank(&project.title)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Project {}", i + 1));
        let mut lines = vec![format!("Project {}: {title}", i + 1)];
        match limits.style {
            SnapshotStyle::Resume => {
                for (label, value) in [
                    ("Description", &project.description),
                    ("Impact", &project.impact),
                    ("Link", &project.link),
                    ("Dates", &project.dates),
                ] {
                    if let Some(value) = non_blank(value) {
                        lines.push(format!("{label}: {value}"));
                    }
                }
            }
            SnapshotStyle::CoverLetter => {
                let summary_line = non_blank(&project.description)
                    .or_else(|| non_blank(&project.impact))
                    .or_else(|| clamp(&project.highlights, 1).into_iter().next());
                if let Some(line) = summary_line {
                    lines.push(line.to_string());
                }
            }
        }
        blocks.push(lines.join("\n"));
    }

    let skills = clamp(&profile.skills, limits.skills);
    if !skills.is_empty() {
        blocks.push(format!("Skills: {}", skills.join(", ")));
    }

    let education = profile
        .education
        .iter()
        .filter(|e| {
            non_blank(&e.degree).is_some()
                || non_blank(&e.institution).is_some()
                || e.highlights.iter().any(|h| !h.trim().is_empty())
        })
        .take(limits.education);
    for (i, edu) in education.enumerate() {
        let mut lines = vec![match non_blank(&edu.degree) {
            Some(degree) => format!("Education {}: {degree}", i + 1),
            None => format!("Education {}", i + 1),
        }];
        if let Some(institution) = non_blank(&edu.institution) {
            lines.push(format!("Institution: {institution}"));
        }
        if let Some(dates) = non_blank(&edu.dates) {
            lines.push(format!("Dates: {dates}"));
        }
        for highlight in clamp(&edu.highlights, limits.highlights_per_education) {
            lines.push(format!("- {highlight}"));
        }
        blocks.push(lines.join("\n"));
    }

    let certifications = clamp(&profile.certifications, limits.certifications);
    if !certifications.is_empty() {
        let label = match limits.style {
            SnapshotStyle::Resume => "Certifications/Achievements",
            SnapshotStyle::CoverLetter => "Certifications",
        };
        blocks.push(format!("{label}: {}", certifications.join(", ")));
    }

    blocks.join("\n\n")
}
