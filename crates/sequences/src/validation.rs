//! Read-side checks over a sequence. Nothing here mutates; callers decide
//! whether a finding blocks the operation or is only reported.

use std::collections::HashSet;

use leadnectar_core::{DanglingReference, NectarError, NectarResult};
use uuid::Uuid;

use crate::types::{ConditionType, Sequence, Step, StepKind, Trigger};

/// Condition steps whose `target_step_id` does not resolve within `sequence`.
pub fn validate_sequence(sequence: &Sequence) -> Vec<DanglingReference> {
    let ids: HashSet<Uuid> = sequence.steps.iter().map(|s| s.id).collect();
    sequence
        .steps
        .iter()
        .filter_map(|step| {
            let target = step.target_step_id()?;
            (!ids.contains(&target)).then_some(DanglingReference {
                step_id: step.id,
                target_step_id: target,
            })
        })
        .collect()
}

/// Payload rules for a single step.
pub fn validate_step(step: &Step) -> NectarResult<()> {
    match &step.kind {
        StepKind::Email { template_id } => {
            if matches!(template_id, Some(id) if id.trim().is_empty()) {
                return Err(NectarError::validation("template id must not be blank"));
            }
        }
        StepKind::Delay { delay } => {
            if delay.value == 0 {
                return Err(NectarError::validation("delay value must be positive"));
            }
        }
        StepKind::Condition { condition } => {
            match condition.condition_type {
                ConditionType::EmailOpened | ConditionType::EmailClicked => {
                    if condition.value != "true" && condition.value != "false" {
                        return Err(NectarError::validation(format!(
                            "condition value must be \"true\" or \"false\", got {:?}",
                            condition.value
                        )));
                    }
                }
                ConditionType::Custom => {
                    if condition.value.trim().is_empty() {
                        return Err(NectarError::validation(
                            "custom condition value must not be empty",
                        ));
                    }
                }
            }
            if condition.target_step_id == Some(step.id) {
                return Err(NectarError::validation(
                    "condition step cannot branch to itself",
                ));
            }
        }
    }
    Ok(())
}

pub fn validate_trigger(trigger: &Trigger) -> NectarResult<()> {
    match trigger {
        Trigger::Automatic { condition } if condition.trim().is_empty() => Err(
            NectarError::validation("automatic trigger requires a trigger condition"),
        ),
        _ => Ok(()),
    }
}

/// Trigger and step payload rules for a whole sequence. Dangling branches
/// are not checked here.
pub fn validate_payloads(sequence: &Sequence) -> NectarResult<()> {
    validate_trigger(&sequence.trigger)?;
    sequence.steps.iter().try_for_each(validate_step)
}

/// Everything that must hold before a draft sequence can go live.
pub fn check_ready(sequence: &Sequence) -> NectarResult<()> {
    if sequence.steps.is_empty() {
        return Err(NectarError::validation("sequence has no steps"));
    }
    validate_payloads(sequence)?;
    let dangling = validate_sequence(sequence);
    if !dangling.is_empty() {
        return Err(NectarError::DanglingReference(dangling));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Condition, Delay, DelayUnit, StepType};

    fn condition_step(condition_type: ConditionType, value: &str, target: Option<Uuid>) -> Step {
        Step {
            id: Uuid::new_v4(),
            name: "c".to_string(),
            kind: StepKind::Condition {
                condition: Condition {
                    condition_type,
                    value: value.to_string(),
                    target_step_id: target,
                },
            },
        }
    }

    #[test]
    fn test_dangling_detected() {
        let mut seq = Sequence::new("s", Trigger::Manual);
        let email = seq.add_step(StepType::Email);
        let ghost = Uuid::new_v4();
        let ok = condition_step(ConditionType::EmailOpened, "true", Some(email.id));
        let bad = condition_step(ConditionType::EmailOpened, "false", Some(ghost));
        let bad_id = bad.id;
        seq.steps.push(ok);
        seq.steps.push(bad);

        let refs = validate_sequence(&seq);
        assert_eq!(
            refs,
            vec![DanglingReference {
                step_id: bad_id,
                target_step_id: ghost
            }]
        );
    }

    #[test]
    fn test_delay_zero_rejected() {
        let step = Step {
            id: Uuid::new_v4(),
            name: "d".to_string(),
            kind: StepKind::Delay {
                delay: Delay::new(0, DelayUnit::Hours),
            },
        };
        assert!(matches!(validate_step(&step), Err(NectarError::Validation(_))));
    }

    #[test]
    fn test_condition_values() {
        assert!(validate_step(&condition_step(ConditionType::EmailClicked, "false", None)).is_ok());
        assert!(validate_step(&condition_step(ConditionType::EmailClicked, "yes", None)).is_err());
        assert!(validate_step(&condition_step(ConditionType::Custom, "replied", None)).is_ok());
        assert!(validate_step(&condition_step(ConditionType::Custom, "  ", None)).is_err());
    }

    #[test]
    fn test_self_branch_rejected() {
        let mut step = condition_step(ConditionType::EmailOpened, "true", None);
        if let StepKind::Condition { condition } = &mut step.kind {
            condition.target_step_id = Some(step.id);
        }
        assert!(validate_step(&step).is_err());
    }

    #[test]
    fn test_trigger_rules() {
        assert!(validate_trigger(&Trigger::Manual).is_ok());
        assert!(validate_trigger(&Trigger::Automatic {
            condition: String::new()
        })
        .is_err());
        assert!(validate_trigger(&Trigger::Automatic {
            condition: "tag = vip".to_string()
        })
        .is_ok());
    }

    #[test]
    fn test_validate_payloads_covers_trigger_and_steps() {
        let mut seq = Sequence::new("s", Trigger::Manual);
        assert!(validate_payloads(&seq).is_ok());

        seq.steps.push(Step {
            id: Uuid::new_v4(),
            name: "d".to_string(),
            kind: StepKind::Delay {
                delay: Delay::new(0, DelayUnit::Days),
            },
        });
        assert!(validate_payloads(&seq).is_err());

        seq.steps.clear();
        seq.trigger = Trigger::Automatic {
            condition: "  ".to_string(),
        };
        assert!(validate_payloads(&seq).is_err());
    }

    #[test]
    fn test_check_ready() {
        let mut seq = Sequence::new("s", Trigger::Manual);
        assert!(check_ready(&seq).is_err());

        seq.add_step(StepType::Email);
        assert!(check_ready(&seq).is_ok());

        seq.steps
            .push(condition_step(ConditionType::EmailOpened, "true", Some(Uuid::new_v4())));
        assert!(matches!(
            check_ready(&seq),
            Err(NectarError::DanglingReference(refs)) if refs.len() == 1
        ));
    }
}
