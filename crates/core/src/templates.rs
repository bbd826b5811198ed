//! Template catalog and `{{variable}}` rendering.

use crate::types::{Template, TemplateCategory};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Read-only lookup from template id to template, consumed by email steps.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: HashMap<String, Template>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    pub fn from_templates(templates: impl IntoIterator<Item = Template>) -> Self {
        let mut catalog = Self::new();
        for template in templates {
            catalog.register(template);
        }
        catalog
    }

    pub fn register(&mut self, template: Template) -> String {
        let id = template.id.clone();
        self.templates.insert(id.clone(), template);
        id
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates sorted by name.
    pub fn list(&self) -> Vec<&Template> {
        let mut templates: Vec<&Template> = self.templates.values().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        templates
    }

    /// Render subject and body of `template_id` with the given variables.
    /// Placeholders without a value stay in the output and are listed in
    /// [`RenderedMessage::missing`].
    pub fn render(
        &self,
        template_id: &str,
        variables: &HashMap<String, String>,
    ) -> Option<RenderedMessage> {
        let template = self.templates.get(template_id)?;
        let mut missing = Vec::new();
        let subject = substitute(&template.subject, variables, &mut missing);
        let body = substitute(&template.body, variables, &mut missing);
        debug!(template_id, missing = missing.len(), "Rendered template");

        Some(RenderedMessage {
            template_id: template.id.clone(),
            subject,
            body,
            missing,
            rendered_at: Utc::now(),
        })
    }

    /// Demo catalog used by the CLI and tests.
    pub fn demo() -> Self {
        Self::from_templates([
            Template {
                id: "template-1".to_string(),
                name: "Premier contact".to_string(),
                subject: "{{first_name}}, une question rapide".to_string(),
                body: "Bonjour {{first_name}},\n\nJ'ai vu que {{company}} recrute des commerciaux. \
                       Seriez-vous disponible pour un échange de 15 minutes ?"
                    .to_string(),
                category: TemplateCategory::Prospecting,
            },
            Template {
                id: "template-2".to_string(),
                name: "Relance".to_string(),
                subject: "Re: {{first_name}}, une question rapide".to_string(),
                body: "Bonjour {{first_name}},\n\nJe me permets de revenir vers vous. \
                       Avez-vous eu le temps d'y jeter un œil ?"
                    .to_string(),
                category: TemplateCategory::FollowUp,
            },
            Template {
                id: "template-3".to_string(),
                name: "Invitation webinar".to_string(),
                subject: "Invitation : {{webinar_title}}".to_string(),
                body: "Bonjour {{ first_name }},\n\nNous organisons {{webinar_title}} le {{date}}."
                    .to_string(),
                category: TemplateCategory::Nurturing,
            },
        ])
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedMessage {
    pub template_id: String,
    pub subject: String,
    pub body: String,
    pub missing: Vec<String>,
    pub rendered_at: DateTime<Utc>,
}

/// Distinct placeholder names in `text`, in order of first appearance.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    scan(text, |name| {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        None
    });
    names
}

fn substitute(
    text: &str,
    variables: &HashMap<String, String>,
    missing: &mut Vec<String>,
) -> String {
    scan(text, |name| match variables.get(name) {
        Some(value) => Some(value.clone()),
        None => {
            if !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
            None
        }
    })
}

/// Walk `{{ name }}` tokens, replacing each with whatever `f` returns.
/// `None` keeps the token verbatim; unterminated braces are copied as text.
fn scan<F>(text: &str, mut f: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let token = &rest[start..start + 2 + end + 2];
        let name = after[..end].trim();
        if is_identifier(name) {
            match f(name) {
                Some(value) => out.push_str(&value),
                None => out.push_str(token),
            }
        } else {
            out.push_str(token);
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}
