use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the rule results are combined.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EvaluationMode {
    /// the first true rule wins
    #[default]
    FirstMatch,
    /// every rule must be true
    AllMatch,
    /// one true rule is enough
    AnyMatch,
}

/// Comparison operator
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComparisonOperator {
    // for text
    #[serde(alias = "eq")]
    Equals,
    #[serde(alias = "ne")]
    NotEquals,
    Contains,
    NotContains,
    #[serde(alias = "starts")]
    StartsWith,
    #[serde(alias = "ends")]
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    /// regular expression
    Matches,
    // for number
    #[serde(alias = "gt")]
    GreaterThan,
    #[serde(alias = "lt")]
    LessThan,
    #[serde(alias = "ge")]
    GreaterOrEqual,
    #[serde(alias = "le")]
    LessOrEqual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRule {
    #[serde(default)]
    pub id: Option<String>,
    /// a context path, a template or a literal; empty means the trigger message
    #[serde(default)]
    pub field: String,
    pub operator: ComparisonOperator,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSettings {
    #[serde(default)]
    pub conditions: Vec<ConditionRule>,
    #[serde(default = "default_branch")]
    pub default_branch: bool,
    #[serde(default)]
    pub evaluation_mode: EvaluationMode,
}

fn default_branch() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::CONDITION_OPERATORS;

    #[test]
    fn test_schema_operators_deserialize() {
        for name in CONDITION_OPERATORS {
            let op: Result<ComparisonOperator, _> = serde_json::from_value(Value::String(name.to_string()));
            assert!(op.is_ok(), "{} is not an operator", name);
        }
        assert_eq!(serde_json::from_value::<ComparisonOperator>(Value::String("ge".into())).unwrap(), ComparisonOperator::GreaterOrEqual);
    }
}
