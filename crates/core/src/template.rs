//! Situation Templates
//!
//! A template is a situation whose text contains `{variableName}` placeholders.
//! Resolving a template is a pure function: the same template, variable values
//! and difficulty always produce the same situation.

use crate::catalog::{Difficulty, Situation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVariable {
    pub name: String,
    #[serde(default)]
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SituationTemplate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub context: String,
    pub user_goal: String,
    pub ai_role: String,
    pub difficulty: Difficulty,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    pub variables: Vec<TemplateVariable>,
}

impl SituationTemplate {
    /// Produces a concrete situation from this template.
    ///
    /// Each declared variable takes the supplied value, else its default, else
    /// the empty string. Placeholders that are not declared stay in the text
    /// literally. `difficulty` overrides the template's own difficulty.
    pub fn resolve(
        &self,
        values: &HashMap<String, String>,
        difficulty: Option<Difficulty>,
    ) -> Situation {
        let resolved: Vec<(&str, &str)> = self
            .variables
            .iter()
            .map(|var| {
                let value = values
                    .get(&var.name)
                    .map(String::as_str)
                    .or(var.default_value.as_deref())
                    .unwrap_or("");
                (var.name.as_str(), value)
            })
            .collect();
        let difficulty = difficulty.unwrap_or(self.difficulty);

        let mut tag_sources = vec![self.category.clone(), difficulty.to_string()];
        tag_sources.extend(resolved.iter().map(|(_, value)| value.to_string()));

        Situation {
            id: self.id.clone(),
            title: substitute(&self.title, &resolved),
            description: substitute(&self.description, &resolved),
            icon: self.icon.clone(),
            context: substitute(&self.context, &resolved),
            user_goal: substitute(&self.user_goal, &resolved),
            ai_role: substitute(&self.ai_role, &resolved),
            difficulty,
            category: self.category.clone(),
            tags: normalize_tags(tag_sources),
            voice: self.voice.clone(),
        }
    }
}

/// Replaces every `{name}` whose name is declared in `values`.
///
/// Substitution is a single left-to-right pass, so a value that itself
/// contains braces is never expanded again.
fn substitute(text: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after_open[..close];
        match values.iter().find(|(n, _)| *n == name) {
            Some((_, value)) => {
                out.push_str(value);
                rest = &after_open[close + 1..];
            }
            None => {
                // Not a declared variable: keep the brace and scan on from
                // the next character so a nested `{` can still match.
                out.push('{');
                rest = after_open;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Lower-cases, joins whitespace-separated words with single hyphens, drops
/// empties and duplicates.
fn normalize_tags(sources: Vec<String>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for source in sources {
        let tag = source
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("-");
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}
