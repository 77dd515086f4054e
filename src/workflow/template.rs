use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::{common::Vars, workflow::consts::TRIGGER_KEY};

/// Regex pattern for variable references
/// Format: `{{name}}`, `{{node.key.subkey}}`, `{{var:name}}`
const VARIABLE_TEMPLATE_PATTERN: &str = r"\{\{\s*([^{}]+?)\s*\}\}";
/// Regex pattern for block output references
/// Format: `<Node.key>` or `<Node.key.subkey>`
const OUTPUT_TEMPLATE_PATTERN: &str = r"<([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)+)>";

static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(VARIABLE_TEMPLATE_PATTERN).expect("valid variable pattern"));
static OUTPUT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(OUTPUT_TEMPLATE_PATTERN).expect("valid output pattern"));

/// Short form prefix accepted inside `{{ }}`.
const SHORT_VAR_PREFIX: &str = "var:";

/// A reference found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Full token text, delimiters included.
    pub token: String,
    /// Dotted path inside the token.
    pub path: String,
}

impl Reference {
    /// First path segment: a node name, a block type alias or a variable.
    pub fn root(&self) -> &str {
        self.path.split('.').next().unwrap_or_default()
    }
}

/// Resolve `{{path}}` then `<path>` tokens in `template` against `ctx`.
///
/// Tokens that cannot be resolved are left untouched.
pub fn resolve(
    template: &str,
    ctx: &Vars,
) -> String {
    if !template.contains("{{") && !template.contains('<') {
        return template.to_string();
    }

    let pass = VARIABLE_RE.replace_all(template, |caps: &Captures| {
        let path = caps[1].strip_prefix(SHORT_VAR_PREFIX).unwrap_or(&caps[1]).trim();
        lookup(ctx, path).map(stringify).unwrap_or_else(|| caps[0].to_string())
    });

    OUTPUT_RE
        .replace_all(&pass, |caps: &Captures| lookup(ctx, &caps[1]).map(stringify).unwrap_or_else(|| caps[0].to_string()))
        .into_owned()
}

/// Resolve every string leaf of a JSON value. Keys and non-string leaves are kept.
pub fn resolve_json_value(
    value: &Value,
    ctx: &Vars,
) -> Value {
    match value {
        Value::String(s) => Value::String(resolve(s, ctx)),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| resolve_json_value(v, ctx)).collect()),
        Value::Object(obj) => Value::Object(obj.iter().map(|(k, v)| (k.clone(), resolve_json_value(v, ctx))).collect::<Map<_, _>>()),
        _ => value.clone(),
    }
}

/// Lists the references of both grammars in `template`, in source order per grammar.
pub fn references(template: &str) -> Vec<Reference> {
    let vars = VARIABLE_RE.captures_iter(template).map(|caps| Reference {
        token: caps[0].to_string(),
        path: caps[1].strip_prefix(SHORT_VAR_PREFIX).unwrap_or(&caps[1]).trim().to_string(),
    });
    let outputs = OUTPUT_RE.captures_iter(template).map(|caps| Reference {
        token: caps[0].to_string(),
        path: caps[1].to_string(),
    });
    vars.chain(outputs).collect()
}

/// Looks a dotted path up, whole key first, then segment by segment.
pub fn lookup<'a>(
    ctx: &'a Vars,
    path: &str,
) -> Option<&'a Value> {
    if let Some(value) = ctx.get_value(path) {
        return Some(value);
    }

    let mut segments = path.split('.');
    let mut current = ctx.get_value(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(obj) => obj.get(segment)?,
            Value::Array(arr) => arr.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Single-brace placeholders of older message templates: token, trigger
/// field and the text used when the field is missing or empty.
const CONTACT_PLACEHOLDERS: &[(&str, &str, &str)] = &[("{nom}", "userName", "Client"), ("{prenom}", "userFirstName", ""), ("{email}", "userEmail", "")];

/// Replaces `{nom}`, `{prenom}` and `{email}` with the contact fields of the trigger.
pub fn personalize(
    text: &str,
    ctx: &Vars,
) -> String {
    CONTACT_PLACEHOLDERS.iter().fold(text.to_string(), |text, (token, field, fallback)| {
        if !text.contains(token) {
            return text;
        }
        let value = ctx
            .get_value(TRIGGER_KEY)
            .and_then(|t| t.get(*field))
            .filter(|v| !v.is_null())
            .map(stringify)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        text.replace(token, &value)
    })
}

/// String form used for substitution.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        // objects and arrays render as compact JSON
        v => v.to_string(),
    }
}
