//! Content Catalog
//!
//! Courses are made of ordered chapters (stored as `lessons`), and chapters are
//! made of situations: single scripted scenarios a user practices with the AI
//! partner. The catalog is defined at build time and never mutated at runtime.

mod builtin;

use crate::template::SituationTemplate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use utoipa::ToSchema;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },
    #[error("Course '{0}' not found")]
    CourseNotFound(String),
    #[error("Chapter '{chapter_id}' not found in course '{course_id}'")]
    ChapterNotFound {
        course_id: String,
        chapter_id: String,
    },
    #[error("Situation '{situation_id}' not found in chapter '{chapter_id}'")]
    SituationNotFound {
        chapter_id: String,
        situation_id: String,
    },
    #[error("Situation template '{0}' not found")]
    TemplateNotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

/// A single scripted conversational scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Situation {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    /// Scene-setting text shown to the user and given to the AI partner.
    pub context: String,
    /// What the user is trying to achieve in the conversation.
    pub user_goal: String,
    /// Instructions describing who the AI partner plays.
    pub ai_role: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub tags: Vec<String>,
    /// Optional voice override for the voice vendor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub description: String,
    pub order: u32,
    pub situations: Vec<Situation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub color: String,
    pub icon: String,
    pub chapters: Vec<Chapter>,
    /// Enrollable courses gate their chapters behind an enrollment.
    pub enrollable: bool,
}

impl Course {
    pub fn lesson_ids(&self) -> impl Iterator<Item = &str> {
        self.chapters.iter().map(|c| c.id.as_str())
    }
}

/// The full set of courses and reusable situation templates.
#[derive(Debug, Clone)]
pub struct Catalog {
    courses: Vec<Course>,
    templates: Vec<SituationTemplate>,
}

impl Catalog {
    /// Builds a catalog, sorting chapters by their order index.
    ///
    /// Course, chapter and situation ids must be unique across the whole
    /// catalog so that a situation belongs to exactly one chapter and a lesson
    /// id alone identifies its course. Template ids must be unique too.
    pub fn new(
        mut courses: Vec<Course>,
        templates: Vec<SituationTemplate>,
    ) -> Result<Self, CatalogError> {
        let mut course_ids = HashSet::new();
        let mut chapter_ids = HashSet::new();
        let mut situation_ids = HashSet::new();

        for course in &mut courses {
            if !course_ids.insert(course.id.clone()) {
                return Err(CatalogError::DuplicateId {
                    kind: "course",
                    id: course.id.clone(),
                });
            }
            course.chapters.sort_by_key(|c| c.order);
            for chapter in &course.chapters {
                if !chapter_ids.insert(chapter.id.clone()) {
                    return Err(CatalogError::DuplicateId {
                        kind: "chapter",
                        id: chapter.id.clone(),
                    });
                }
                for situation in &chapter.situations {
                    if !situation_ids.insert(situation.id.clone()) {
                        return Err(CatalogError::DuplicateId {
                            kind: "situation",
                            id: situation.id.clone(),
                        });
                    }
                }
            }
        }

        let mut template_ids = HashSet::new();
        for template in &templates {
            if !template_ids.insert(template.id.clone()) {
                return Err(CatalogError::DuplicateId {
                    kind: "template",
                    id: template.id.clone(),
                });
            }
        }

        Ok(Self { courses, templates })
    }

    /// The catalog shipped with the application.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(builtin::courses(), builtin::templates())
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn templates(&self) -> &[SituationTemplate] {
        &self.templates
    }

    pub fn course(&self, course_id: &str) -> Result<&Course, CatalogError> {
        self.courses
            .iter()
            .find(|c| c.id == course_id)
            .ok_or_else(|| CatalogError::CourseNotFound(course_id.to_string()))
    }

    pub fn chapter(&self, course_id: &str, chapter_id: &str) -> Result<&Chapter, CatalogError> {
        self.course(course_id)?
            .chapters
            .iter()
            .find(|c| c.id == chapter_id)
            .ok_or_else(|| CatalogError::ChapterNotFound {
                course_id: course_id.to_string(),
                chapter_id: chapter_id.to_string(),
            })
    }

    pub fn situation(
        &self,
        course_id: &str,
        chapter_id: &str,
        situation_id: &str,
    ) -> Result<&Situation, CatalogError> {
        self.chapter(course_id, chapter_id)?
            .situations
            .iter()
            .find(|s| s.id == situation_id)
            .ok_or_else(|| CatalogError::SituationNotFound {
                chapter_id: chapter_id.to_string(),
                situation_id: situation_id.to_string(),
            })
    }

    /// Looks a situation up by id alone, returning its owning course too.
    pub fn find_situation(&self, situation_id: &str) -> Option<(&Course, &Situation)> {
        self.courses.iter().find_map(|course| {
            course
                .chapters
                .iter()
                .flat_map(|c| c.situations.iter())
                .find(|s| s.id == situation_id)
                .map(|s| (course, s))
        })
    }

    /// The course owning the given lesson (chapter) id.
    pub fn lesson_course(&self, lesson_id: &str) -> Option<&Course> {
        self.courses
            .iter()
            .find(|course| course.lesson_ids().any(|id| id == lesson_id))
    }

    pub fn template(&self, template_id: &str) -> Result<&SituationTemplate, CatalogError> {
        self.templates
            .iter()
            .find(|t| t.id == template_id)
            .ok_or_else(|| CatalogError::TemplateNotFound(template_id.to_string()))
    }
}
