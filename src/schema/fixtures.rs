//! Schema builders shared by unit tests

use chrono::{TimeZone, Utc};

use crate::schema::model::{Field, FieldType, Schema, SelectOption, Step};

pub fn text_field(key: &str, required: bool) -> Field {
    Field {
        id: key.to_string(),
        name: key.to_string(),
        label: String::new(),
        field_type: FieldType::Text,
        placeholder: None,
        required,
        pattern: None,
        validation: None,
        options: Vec::new(),
    }
}

pub fn checkbox_field(key: &str, label: &str) -> Field {
    Field {
        label: label.to_string(),
        field_type: FieldType::Checkbox,
        required: true,
        ..text_field(key, true)
    }
}

pub fn select_field(key: &str, values: &[&str]) -> Field {
    Field {
        field_type: FieldType::Select,
        options: values
            .iter()
            .map(|v| SelectOption {
                value: v.to_string(),
                label: v.to_uppercase(),
            })
            .collect(),
        ..text_field(key, true)
    }
}

pub fn step(number: u32, fields: Vec<Field>) -> Step {
    Step {
        step: number,
        name: format!("Step {}", number),
        fields,
    }
}

/// Two steps: Aadhaar identity, then PAN and business details
pub fn sample_schema() -> Schema {
    let mut aadhaar = text_field("aadhaarNumber", true);
    aadhaar.label = "Aadhaar Number".to_string();
    let mut pan = text_field("panNumber", true);
    pan.label = "PAN Number".to_string();

    Schema {
        source: "https://example.test/register".to_string(),
        scraped_at: Utc.with_ymd_and_hms(2025, 8, 20, 10, 15, 0).unwrap(),
        steps: vec![
            step(1, vec![aadhaar, text_field("applicantName", true)]),
            step(
                2,
                vec![
                    pan,
                    text_field("email", false),
                    select_field("businessType", &["manufacturing", "service"]),
                    checkbox_field("terms", "Terms"),
                ],
            ),
        ],
    }
}
