use async_trait::async_trait;
use regex::RegexBuilder;
use serde_json::Value;

use crate::{
    Result,
    blocks::BlockType,
    common::Vars,
    workflow::{
        actions::{Action, ActionContext, ActionOutput, Route},
        consts::{BRANCH_ELSE, BRANCH_FALSE, BRANCH_TRUE, TRIGGER_KEY},
        template,
    },
};

use super::models::*;

const RESULT_KEY: &str = "result";
const MATCHED_KEY: &str = "matchedCondition";
const BRANCH_KEY: &str = "branch";
const EVALUATED_KEY: &str = "evaluated";

pub struct ConditionAction;

impl ConditionAction {
    /// Value a rule compares against; an empty field means the trigger message.
    fn actual(
        &self,
        ctx: &ActionContext<'_>,
        index: usize,
        field: &str,
    ) -> Option<Value> {
        if field.trim().is_empty() {
            return ctx.vars().get_value(TRIGGER_KEY).and_then(|t| t.get("message")).cloned();
        }
        let raw = ctx.node.config.get_value("conditions").and_then(|c| c.get(index)).and_then(|r| r.get("field"));
        Some(ctx.field_value(raw, field))
    }

    /// Evaluate a single comparison
    fn evaluate_comparison(
        &self,
        actual: Option<&Value>,
        rule: &ConditionRule,
    ) -> Result<bool> {
        let result = match rule.operator {
            ComparisonOperator::IsEmpty => is_empty(actual),
            ComparisonOperator::IsNotEmpty => !is_empty(actual),
            _ => {
                let (Some(actual), expected) = (actual, &rule.value) else {
                    return Ok(false);
                };
                if expected.is_null() {
                    return Ok(false);
                }
                self.evaluate_with_value(actual, rule.operator, expected, rule.case_sensitive)?
            }
        };
        Ok(result)
    }

    /// Evaluate comparison operators that require a value
    fn evaluate_with_value(
        &self,
        actual: &Value,
        operator: ComparisonOperator,
        expected: &Value,
        case_sensitive: bool,
    ) -> Result<bool> {
        let a = text(actual, case_sensitive);
        let e = text(expected, case_sensitive);

        let result = match operator {
            ComparisonOperator::Equals => self.eval_eq(actual, expected, &a, &e),
            ComparisonOperator::NotEquals => !self.eval_eq(actual, expected, &a, &e),
            ComparisonOperator::Contains => self.eval_contains(actual, &a, &e, case_sensitive),
            ComparisonOperator::NotContains => !self.eval_contains(actual, &a, &e, case_sensitive),
            ComparisonOperator::StartsWith => a.starts_with(&e),
            ComparisonOperator::EndsWith => a.ends_with(&e),
            ComparisonOperator::Matches => {
                let re = RegexBuilder::new(&template::stringify(expected)).case_insensitive(!case_sensitive).build()?;
                re.is_match(&template::stringify(actual))
            }
            ComparisonOperator::GreaterThan => self.eval_cmp(actual, expected, |a, b| a > b),
            ComparisonOperator::LessThan => self.eval_cmp(actual, expected, |a, b| a < b),
            ComparisonOperator::GreaterOrEqual => self.eval_cmp(actual, expected, |a, b| a >= b),
            ComparisonOperator::LessOrEqual => self.eval_cmp(actual, expected, |a, b| a <= b),
            ComparisonOperator::IsEmpty | ComparisonOperator::IsNotEmpty => false,
        };
        Ok(result)
    }

    fn eval_eq(
        &self,
        actual: &Value,
        expected: &Value,
        a: &str,
        e: &str,
    ) -> bool {
        match (number(actual), number(expected)) {
            (Some(x), Some(y)) => x == y,
            _ => a == e,
        }
    }

    fn eval_contains(
        &self,
        actual: &Value,
        a: &str,
        e: &str,
        case_sensitive: bool,
    ) -> bool {
        match actual {
            Value::Array(arr) => arr.iter().any(|v| text(v, case_sensitive) == e),
            _ => a.contains(e),
        }
    }

    fn eval_cmp<F>(
        &self,
        actual: &Value,
        expected: &Value,
        cmp: F,
    ) -> bool
    where
        F: Fn(f64, f64) -> bool,
    {
        match (number(actual), number(expected)) {
            (Some(a), Some(e)) => cmp(a, e),
            _ => false,
        }
    }
}

fn text(
    value: &Value,
    case_sensitive: bool,
) -> String {
    let s = template::stringify(value);
    if case_sensitive { s } else { s.to_lowercase() }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(arr)) => arr.is_empty(),
        Some(Value::Object(obj)) => obj.is_empty(),
        _ => false,
    }
}

#[async_trait]
impl Action for ConditionAction {
    type Settings = ConditionSettings;

    fn block_type(&self) -> BlockType {
        BlockType::Condition
    }

    async fn run(
        &self,
        ctx: &ActionContext<'_>,
        settings: ConditionSettings,
    ) -> Result<ActionOutput> {
        let mode = settings.evaluation_mode;
        let mut evaluated = 0;
        let mut matched: Option<usize> = None;
        let mut all_true = !settings.conditions.is_empty();

        for (i, rule) in settings.conditions.iter().enumerate() {
            let actual = self.actual(ctx, i, &rule.field);
            let result = self.evaluate_comparison(actual.as_ref(), rule)?;
            evaluated += 1;

            // Short-circuit on the first decisive rule
            match mode {
                EvaluationMode::FirstMatch | EvaluationMode::AnyMatch if result => {
                    matched = Some(i);
                    break;
                }
                EvaluationMode::AllMatch if !result => {
                    all_true = false;
                    break;
                }
                _ => {}
            }
        }

        let met = match mode {
            EvaluationMode::AllMatch => all_true,
            _ => matched.is_some(),
        };
        let matched_id = matched.and_then(|i| settings.conditions[i].id.clone());

        let mut outputs = Vars::new().with(RESULT_KEY, met).with(EVALUATED_KEY, evaluated).with(MATCHED_KEY, matched_id.clone());

        if met {
            outputs.set(BRANCH_KEY, BRANCH_TRUE);
            let label = match (&matched_id, matched) {
                (Some(id), _) => format!("'{}'", id),
                (None, Some(i)) => format!("#{}", i + 1),
                (None, None) => "all rules".to_string(),
            };
            let keys: Vec<String> = matched_id.into_iter().chain([BRANCH_TRUE.to_string()]).collect();
            return Ok(ActionOutput::success(format!("condition {} met ({})", label, mode.as_ref()))
                .with_outputs(outputs)
                .with_route(Route::branch(&keys, true)));
        }

        if settings.default_branch {
            outputs.set(BRANCH_KEY, BRANCH_FALSE);
            return Ok(ActionOutput::success(format!("no condition met ({}), taking the else branch", mode.as_ref()))
                .with_outputs(outputs)
                .with_route(Route::branch(&[BRANCH_FALSE, BRANCH_ELSE], false)));
        }

        outputs.set(BRANCH_KEY, Value::Null);
        Ok(ActionOutput::skipped(format!("no condition met ({}), no default branch", mode.as_ref())).with_outputs(outputs))
    }
}
