//! `{{key}}` placeholder substitution for the embedded templates.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template placeholder '{0}' has no value")]
    Unbound(String),
    #[error("template has an unterminated placeholder")]
    Unterminated,
}

/// Replace every `{{key}}` in `template` with its value from `vars`.
///
/// # Errors
///
/// Fails when a placeholder has no binding or is never closed.
pub fn render(template: &str, vars: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or(TemplateError::Unterminated)?;
        let key = after[..end].trim();
        let value = vars
            .iter()
            .find_map(|(k, v)| (*k == key).then_some(*v))
            .ok_or_else(|| TemplateError::Unbound(key.to_string()))?;
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}
