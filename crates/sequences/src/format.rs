//! Display helpers for the sequence builder (French UI copy).

use leadnectar_core::TemplateCatalog;

use crate::types::{Condition, ConditionType, Delay, DelayUnit, Step, StepKind, Trigger};

/// Shown when an email step has no template selected.
pub const NO_TEMPLATE: &str = "Aucun template";
/// Shown when an email step references a template the catalog does not have.
pub const UNKNOWN_TEMPLATE: &str = "Template inconnu";

/// `1 jour`, `3 jours`, `1 heure`, `45 minutes`.
pub fn format_delay(delay: &Delay) -> String {
    let (singular, plural) = match delay.unit {
        DelayUnit::Minutes => ("minute", "minutes"),
        DelayUnit::Hours => ("heure", "heures"),
        DelayUnit::Days => ("jour", "jours"),
    };
    let unit = if delay.value == 1 { singular } else { plural };
    format!("{} {}", delay.value, unit)
}

pub fn format_condition(condition: &Condition) -> String {
    let positive = condition.value == "true";
    match condition.condition_type {
        ConditionType::EmailOpened if positive => "Email ouvert".to_string(),
        ConditionType::EmailOpened => "Email non ouvert".to_string(),
        ConditionType::EmailClicked if positive => "Lien cliqué".to_string(),
        ConditionType::EmailClicked => "Lien non cliqué".to_string(),
        ConditionType::Custom => condition.value.clone(),
    }
}

/// Name of the referenced template, keeping unset and broken references apart.
pub fn resolve_template_name(template_id: Option<&str>, catalog: &TemplateCatalog) -> String {
    match template_id {
        None => NO_TEMPLATE.to_string(),
        Some(id) => catalog
            .get(id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| UNKNOWN_TEMPLATE.to_string()),
    }
}

pub fn format_trigger(trigger: &Trigger) -> String {
    match trigger {
        Trigger::Manual => "Déclenchement manuel".to_string(),
        Trigger::Automatic { condition } => format!("Automatique : {}", condition),
    }
}

/// One summary line per step, as shown in the builder's step list.
pub fn describe_step(step: &Step, catalog: &TemplateCatalog) -> String {
    let detail = match &step.kind {
        StepKind::Email { template_id } => {
            format!("Email · {}", resolve_template_name(template_id.as_deref(), catalog))
        }
        StepKind::Delay { delay } => format!("Attente · {}", format_delay(delay)),
        StepKind::Condition { condition } => {
            let mut line = format!("Condition · {}", format_condition(condition));
            if condition.target_step_id.is_some() {
                line.push_str(" → branche");
            }
            line
        }
    };
    format!("{} ({})", step.name, detail)
}
