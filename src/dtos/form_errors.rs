use std::collections::BTreeMap;

use serde::Serialize;
use validator::ValidationErrors;

/// Key used for errors that belong to the whole form rather than one field.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Message for any check tagged with the `required` code.
pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_CHOICE_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Field name -> messages, keyed in alphabetical order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|v| v.as_slice())
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FormErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for err in field_errors {
                let message = match (&err.message, err.code.as_ref()) {
                    (Some(m), _) => m.to_string(),
                    (None, "required") => REQUIRED_MESSAGE.to_string(),
                    (None, code) => format!("Invalid value ({}).", code),
                };
                out.add(field.to_string(), message);
            }
        }
        out
    }
}
