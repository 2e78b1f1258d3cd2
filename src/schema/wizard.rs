//! Schema-driven interactive prompts
//!
//! Renders one form step at a time in the terminal. Text input that does not
//! match a field's format is re-prompted on the spot; empty input is let
//! through, so required fields and the step as a whole are still decided by
//! the step state machine, which reports every failing field at once. When a
//! step is shown
//! again (after a rejection or going back) the previous values are offered as
//! defaults.

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use miette::{IntoDiagnostic, Result};
use serde_json::Value;

use crate::schema::model::{Field, FieldType, Step};
use crate::schema::validator::{FieldErrors, FormData, StepValidator};

/// Where to go after a step has been filled in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Back,
    Quit,
}

/// Terminal renderer for form steps
pub struct StepWizard {
    theme: ColorfulTheme,
}

impl StepWizard {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// Prompt for every visible field of a step
    pub fn prompt_step(
        &self,
        step: &Step,
        index: usize,
        total: usize,
        prefill: Option<&FormData>,
        errors: Option<&FieldErrors>,
    ) -> Result<FormData> {
        println!();
        println!(
            "{} Step {} of {}: {}",
            style("◆").cyan(),
            index + 1,
            total,
            style(&step.name).bold()
        );
        println!("{}", style("─".repeat(50)).dim());

        if let Some(errors) = errors.filter(|e| !e.is_empty()) {
            for (field, message) in errors.iter() {
                println!("  {} {} {}", style("✗").red(), style(field).dim(), message);
            }
            println!();
        }

        let validator = StepValidator::build(step);
        let mut values = FormData::new();
        for field in step.visible_fields() {
            let previous = prefill.and_then(|p| p.get(field.key()));
            if let Some(value) = self.prompt_field(field, previous, &validator)? {
                values.insert(field.key().to_string(), value);
            }
        }

        Ok(values)
    }

    /// Ask whether to continue, go back or stop
    pub fn prompt_navigation(&self, can_go_back: bool, is_last: bool) -> Result<Navigation> {
        let mut choices = vec![(if is_last { "Submit" } else { "Next step" }, Navigation::Next)];
        if can_go_back {
            choices.push(("Previous step", Navigation::Back));
        }
        choices.push(("Quit without submitting", Navigation::Quit));

        let labels: Vec<&str> = choices.iter().map(|(label, _)| *label).collect();
        let selection = Select::with_theme(&self.theme)
            .with_prompt("Continue")
            .items(&labels)
            .default(0)
            .interact()
            .into_diagnostic()?;

        Ok(choices[selection].1)
    }

    fn prompt_field(
        &self,
        field: &Field,
        previous: Option<&Value>,
        validator: &StepValidator,
    ) -> Result<Option<Value>> {
        let prompt = format_prompt(field);

        match field.field_type {
            FieldType::Checkbox => {
                let default = previous.and_then(Value::as_bool).unwrap_or(false);
                let checked = Confirm::with_theme(&self.theme)
                    .with_prompt(&prompt)
                    .default(default)
                    .interact()
                    .into_diagnostic()?;
                Ok(Some(Value::Bool(checked)))
            }

            FieldType::Select => {
                let mut values: Vec<Option<&str>> = Vec::new();
                let mut labels: Vec<&str> = Vec::new();
                if !field.required {
                    values.push(None);
                    labels.push("(none)");
                }
                for option in &field.options {
                    values.push(Some(&option.value));
                    labels.push(&option.label);
                }

                let previous = previous.and_then(Value::as_str);
                let default = values
                    .iter()
                    .position(|v| *v == previous)
                    .unwrap_or(0);

                let selection = Select::with_theme(&self.theme)
                    .with_prompt(&prompt)
                    .items(&labels)
                    .default(default)
                    .interact()
                    .into_diagnostic()?;

                Ok(values[selection].map(|v| Value::String(v.to_string())))
            }

            _ => {
                let key = field.key();
                let mut input = Input::<String>::with_theme(&self.theme)
                    .with_prompt(&prompt)
                    .allow_empty(true)
                    .validate_with(move |text: &String| check_text(validator, key, text));
                if let Some(text) = previous.and_then(Value::as_str) {
                    input = input.with_initial_text(text);
                }
                let value = input.interact_text().into_diagnostic()?;

                if value.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Value::String(value)))
                }
            }
        }
    }
}

impl Default for StepWizard {
    fn default() -> Self {
        Self::new()
    }
}

/// Format check for typed text; emptiness is left to the step validator
fn check_text(validator: &StepValidator, key: &str, text: &str) -> Result<(), String> {
    if text.is_empty() {
        return Ok(());
    }
    validator.validate_field(key, Some(&Value::String(text.to_string())))
}

/// Label, required marker and placeholder hint
fn format_prompt(field: &Field) -> String {
    let mut prompt = field.display_label().to_string();
    if field.required && field.field_type != FieldType::Checkbox {
        prompt.push_str(" *");
    }
    if let Some(hint) = field.placeholder() {
        let hint = if hint.chars().count() > 50 {
            format!("{}...", hint.chars().take(47).collect::<String>())
        } else {
            hint.to_string()
        };
        prompt = format!("{} ({})", prompt, style(hint).dim());
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fixtures::{checkbox_field, sample_schema, text_field};

    #[test]
    fn test_check_text_rejects_bad_format_only() {
        let schema = sample_schema();
        let validator = StepValidator::build(schema.step(2).unwrap());

        assert_eq!(
            check_text(&validator, "panNumber", "abcde1234f"),
            Err("Invalid PAN".to_string())
        );
        assert!(check_text(&validator, "panNumber", "ABCDE1234F").is_ok());
        // required fields may be left empty here; the step check reports them
        assert!(check_text(&validator, "panNumber", "").is_ok());
        assert!(check_text(&validator, "notAField", "anything").is_ok());
    }

    #[test]
    fn test_prompt_marks_required_text() {
        let mut field = text_field("city", true);
        field.label = "City".to_string();
        assert_eq!(format_prompt(&field), "City *");
    }

    #[test]
    fn test_prompt_checkbox_has_no_marker() {
        let field = checkbox_field("terms", "I agree");
        assert_eq!(format_prompt(&field), "I agree");
    }

    #[test]
    fn test_prompt_includes_placeholder() {
        let mut field = text_field("pincode", false);
        field.placeholder = Some("e.g., 110001".to_string());
        let prompt = format_prompt(&field);
        assert!(prompt.starts_with("pincode ("));
        assert!(prompt.contains("110001"));
    }
}
