//! Format rule detection
//!
//! Maps a field descriptor to an optional format rule. An explicit pattern on
//! the field always wins; otherwise the field key is matched against a fixed,
//! ordered list of substrings (`pan`, `aadhaar`, `email`, `mobile`, `pin`).
//!
//! Matching is plain substring search, so a key such as `opinion` picks up
//! the PIN code rule. Give such fields an explicit `pattern` to override.

use regex::Regex;
use std::sync::LazyLock;

use crate::schema::model::Field;

/// A compiled format check with the message reported on mismatch
#[derive(Debug, Clone)]
pub struct FormatRule {
    regex: Regex,
    message: String,
}

impl FormatRule {
    pub fn new(regex: Regex, message: impl Into<String>) -> Self {
        Self {
            regex,
            message: message.into(),
        }
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

/// A heuristic rule keyed by a substring of the field key
struct BuiltinRule {
    needle: &'static str,
    regex: Regex,
    message: &'static str,
}

/// Heuristics in priority order, first match wins
static BUILTIN_RULES: LazyLock<Vec<BuiltinRule>> = LazyLock::new(|| {
    [
        ("pan", r"^[A-Z]{5}[0-9]{4}[A-Z]$", "Invalid PAN"),
        ("aadhaar", r"^[0-9]{12}$", "Invalid Aadhaar"),
        ("email", r"^[^@\s]+@[^@\s]+\.[^@\s]+$", "Invalid Email"),
        ("mobile", r"^[6-9][0-9]{9}$", "Invalid Mobile"),
        ("pin", r"^[0-9]{6}$", "Invalid Pincode"),
    ]
    .into_iter()
    .map(|(needle, pattern, message)| BuiltinRule {
        needle,
        regex: Regex::new(pattern).expect("builtin format regex"),
        message,
    })
    .collect()
});

/// Detect the format rule for a field, if any
pub fn detect(field: &Field) -> Option<FormatRule> {
    let key = field.key();

    if let Some(pattern) = field.explicit_pattern() {
        return compile_explicit(key, pattern, format!("Invalid {}", key));
    }

    if let Some(validation) = &field.validation {
        let message = validation
            .message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Invalid {}", key));
        return compile_explicit(key, &validation.regex, message);
    }

    detect_by_key(key)
}

/// Heuristic lookup on a bare key, case-insensitive
pub fn detect_by_key(key: &str) -> Option<FormatRule> {
    let lowered = key.to_lowercase();
    BUILTIN_RULES
        .iter()
        .find(|rule| lowered.contains(rule.needle))
        .map(|rule| FormatRule::new(rule.regex.clone(), rule.message))
}

/// Compile a schema-supplied pattern with ASCII-only `\d` and `\w`
///
/// `\s` and word boundaries keep their Unicode meaning.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&ascii_perl_classes(pattern))
}

/// Rewrite `\d \D \w \W` into ASCII bracket classes
fn ascii_perl_classes(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut class_depth = 0usize;
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let Some(next) = chars.next() else {
                    out.push(c);
                    break;
                };
                let class = match next {
                    'd' => Some("[:digit:]"),
                    'D' => Some("[:^digit:]"),
                    'w' => Some("[:word:]"),
                    'W' => Some("[:^word:]"),
                    _ => None,
                };
                match class {
                    Some(class) if class_depth > 0 => out.push_str(class),
                    Some(class) => {
                        out.push('[');
                        out.push_str(class);
                        out.push(']');
                    }
                    None => {
                        out.push(c);
                        out.push(next);
                    }
                }
            }
            '[' => {
                class_depth += 1;
                out.push(c);
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn compile_explicit(key: &str, pattern: &str, message: String) -> Option<FormatRule> {
    match compile_pattern(pattern) {
        Ok(regex) => Some(FormatRule::new(regex, message)),
        Err(e) => {
            // Checked schemas never get here; see Schema::check
            tracing::warn!(field = key, pattern, error = %e, "explicit pattern does not compile, no format rule applied");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fixtures::text_field;

    #[test]
    fn test_pan_heuristic_accepts_exact_shape() {
        let rule = detect(&text_field("panNumber", true)).unwrap();
        assert_eq!(rule.message(), "Invalid PAN");
        assert!(rule.is_match("ABCDE1234F"));
        assert!(!rule.is_match("abcde1234f"));
        assert!(!rule.is_match("ABCDE123F"));
        assert!(!rule.is_match("ABCDE1234FG"));
    }

    #[test]
    fn test_key_matching_is_case_insensitive() {
        let rule = detect(&text_field("OwnerPAN", true)).unwrap();
        assert_eq!(rule.message(), "Invalid PAN");
    }

    #[test]
    fn test_priority_order_pan_before_aadhaar() {
        let rule = detect(&text_field("panAadhaar", true)).unwrap();
        assert_eq!(rule.message(), "Invalid PAN");
    }

    #[test]
    fn test_each_builtin_rule() {
        let cases = [
            ("aadhaarNumber", "Invalid Aadhaar", "123412341234", "12341234123"),
            ("contactEmail", "Invalid Email", "a@b.co", "a@b"),
            ("mobileNo", "Invalid Mobile", "9876543210", "5876543210"),
            ("pincode", "Invalid Pincode", "110001", "11000"),
        ];
        for (key, message, good, bad) in cases {
            let rule = detect(&text_field(key, true)).unwrap();
            assert_eq!(rule.message(), message, "key {}", key);
            assert!(rule.is_match(good), "{} should accept {}", key, good);
            assert!(!rule.is_match(bad), "{} should reject {}", key, bad);
        }
    }

    #[test]
    fn test_pin_substring_is_naive() {
        let rule = detect(&text_field("opinion", false)).unwrap();
        assert_eq!(rule.message(), "Invalid Pincode");
    }

    #[test]
    fn test_no_match_yields_no_rule() {
        assert!(detect(&text_field("organizationName", true)).is_none());
        assert!(detect(&text_field("city", true)).is_none());
    }

    #[test]
    fn test_explicit_pattern_overrides_heuristic() {
        let mut field = text_field("mobile", true);
        field.pattern = Some(r"^\d{3}$".to_string());

        let rule = detect(&field).unwrap();
        assert_eq!(rule.message(), "Invalid mobile");
        assert!(rule.is_match("123"));
        assert!(!rule.is_match("9876543210"));
    }

    #[test]
    fn test_explicit_digit_class_is_ascii_only() {
        let mut field = text_field("mobile", true);
        field.pattern = Some(r"^\d{3}$".to_string());

        let rule = detect(&field).unwrap();
        assert!(rule.is_match("123"));
        assert!(!rule.is_match("١٢٣"));
        assert!(!rule.is_match("१२३"));
    }

    #[test]
    fn test_ascii_perl_classes_rewrite() {
        assert_eq!(ascii_perl_classes(r"^\d+$"), r"^[[:digit:]]+$");
        assert_eq!(ascii_perl_classes(r"[\w.-]+"), r"[[:word:].-]+");
        assert_eq!(ascii_perl_classes(r"\D\W"), r"[[:^digit:]][[:^word:]]");
        // escaped backslash and other escapes are untouched
        assert_eq!(ascii_perl_classes(r"\\d\s\."), r"\\d\s\.");

        let word = compile_pattern(r"^\w+$").unwrap();
        assert!(word.is_match("abc_1"));
        assert!(!word.is_match("é"));
        assert!(compile_pattern(r"^[\d ]{2}$").unwrap().is_match("1 "));
    }

    #[test]
    fn test_empty_pattern_falls_through_to_heuristic() {
        let mut field = text_field("mobile", true);
        field.pattern = Some(String::new());
        assert_eq!(detect(&field).unwrap().message(), "Invalid Mobile");
    }

    #[test]
    fn test_key_falls_back_to_id() {
        let mut field = text_field("txtPan", true);
        field.name.clear();
        assert_eq!(detect(&field).unwrap().message(), "Invalid PAN");

        field.pattern = Some("^x$".to_string());
        assert_eq!(detect(&field).unwrap().message(), "Invalid txtPan");
    }

    #[test]
    fn test_validation_object_is_explicit() {
        let mut field = text_field("otp", true);
        field.validation = Some(crate::schema::model::FieldValidation {
            regex: "^[0-9]{6}$".to_string(),
            message: Some("Invalid OTP".to_string()),
        });
        let rule = detect(&field).unwrap();
        assert_eq!(rule.message(), "Invalid OTP");
        assert!(rule.is_match("123456"));

        field.validation.as_mut().unwrap().message = None;
        assert_eq!(detect(&field).unwrap().message(), "Invalid otp");
    }

    #[test]
    fn test_pattern_wins_over_validation_object() {
        let mut field = text_field("code", true);
        field.pattern = Some("^a$".to_string());
        field.validation = Some(crate::schema::model::FieldValidation {
            regex: "^b$".to_string(),
            message: None,
        });
        let rule = detect(&field).unwrap();
        assert!(rule.is_match("a"));
        assert!(!rule.is_match("b"));
    }

    #[test]
    fn test_uncompilable_pattern_yields_no_rule() {
        let mut field = text_field("pan", true);
        field.pattern = Some("([A-Z".to_string());
        assert!(detect(&field).is_none());
    }

    #[test]
    fn test_detection_is_deterministic() {
        let field = text_field("emailAddress", false);
        let a = detect(&field).unwrap();
        let b = detect(&field).unwrap();
        assert_eq!(a.pattern(), b.pattern());
        assert_eq!(a.message(), b.message());
    }
}
