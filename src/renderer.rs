use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::VarValue;

// The single-brace pattern matches (and skips) `{{name}}` first so a
// double-brace placeholder is never half-consumed in single-brace mode.
static SINGLE_BRACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{[A-Za-z_][A-Za-z0-9_]*\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());
static DOUBLE_BRACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Za-z_][A-Za-z0-9_]*)\}\}").unwrap());

/// Which placeholder convention a flow's author uses. The two modes are
/// independent: single-brace mode leaves `{{name}}` untouched and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TemplateMode {
    #[default]
    SingleBrace,
    DoubleBrace,
}

/// Substitutes `{name}` (or `{{name}}`) placeholders with the stringified
/// variable value. Unknown placeholders stay verbatim; rendering never fails.
pub fn render(text: &str, variables: &HashMap<String, VarValue>, mode: TemplateMode) -> String {
    let pattern = match mode {
        TemplateMode::SingleBrace => &*SINGLE_BRACE,
        TemplateMode::DoubleBrace => &*DOUBLE_BRACE,
    };
    pattern
        .replace_all(text, |caps: &Captures| {
            let name = match caps.get(1) {
                Some(m) => m.as_str(),
                // Double-brace alternative matched in single-brace mode.
                None => return caps[0].to_string(),
            };
            match variables.get(name) {
                Some(value) => value.render(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

pub fn render_all(
    messages: impl IntoIterator<Item = String>,
    variables: &HashMap<String, VarValue>,
    mode: TemplateMode,
) -> Vec<String> {
    messages
        .into_iter()
        .map(|m| render(&m, variables, mode))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> HashMap<String, VarValue> {
        let mut v = HashMap::new();
        v.insert("nombre".to_string(), VarValue::String("Carlos".into()));
        v.insert("edad".to_string(), VarValue::Integer(25));
        v
    }

    #[test]
    fn single_brace_substitution() {
        let out = render("Hola {nombre}, tienes {edad}", &vars(), TemplateMode::SingleBrace);
        assert_eq!(out, "Hola Carlos, tienes 25");
    }

    #[test]
    fn double_brace_substitution() {
        let out = render("Hola {{nombre}}", &vars(), TemplateMode::DoubleBrace);
        assert_eq!(out, "Hola Carlos");
    }

    #[test]
    fn unknown_placeholders_stay_verbatim() {
        let out = render("Hola {quien}", &vars(), TemplateMode::SingleBrace);
        assert_eq!(out, "Hola {quien}");
    }

    #[test]
    fn modes_are_independent() {
        // Single-brace mode must not touch double-brace placeholders.
        let out = render("{{nombre}} y {nombre}", &vars(), TemplateMode::SingleBrace);
        assert_eq!(out, "{{nombre}} y Carlos");

        // Double-brace mode resolves `{{nombre}}`; the leftover `{nombre}`
        // is not a double-brace placeholder and stays as typed.
        let out = render("{{nombre}} y {nombre}", &vars(), TemplateMode::DoubleBrace);
        assert_eq!(out, "Carlos y {nombre}");
    }

    #[test]
    fn render_never_fails_on_odd_input() {
        let out = render("sin cerrar {nombre y {edad}", &vars(), TemplateMode::SingleBrace);
        assert_eq!(out, "sin cerrar {nombre y 25");
    }
}
