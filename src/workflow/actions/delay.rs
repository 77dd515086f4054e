use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    Result,
    blocks::BlockType,
    common::Vars,
    workflow::actions::{Action, ActionContext, ActionOutput},
};

const WAITED_KEY: &str = "waitedMs";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelaySettings {
    /// number, or numeric text after template resolution
    pub delay_seconds: Value,
}

pub struct DelayAction;

impl DelayAction {
    /// Delay in milliseconds, bounded by `max_delay_ms`.
    fn delay_ms(
        &self,
        ctx: &ActionContext<'_>,
        seconds: &Value,
    ) -> Result<u64> {
        let secs = match seconds {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|s| s.is_finite() && *s >= 0.0)
        .ok_or_else(|| ctx.error(format!("delaySeconds must be a non-negative number, got {}", seconds)))?;

        Ok(((secs * 1000.0).round() as u64).min(ctx.services.config.max_delay_ms))
    }
}

#[async_trait]
impl Action for DelayAction {
    type Settings = DelaySettings;

    fn block_type(&self) -> BlockType {
        BlockType::Delay
    }

    async fn run(
        &self,
        ctx: &ActionContext<'_>,
        settings: DelaySettings,
    ) -> Result<ActionOutput> {
        let ms = self.delay_ms(ctx, &settings.delay_seconds)?;
        if ctx.services.config.honor_delays && ms > 0 {
            debug!(node_id = ctx.node.id, ms, "waiting");
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        Ok(ActionOutput::success(format!("waited {} ms", ms)).with_outputs(Vars::new().with(WAITED_KEY, ms)).with_wait_delay(ms))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing;

    async fn run(
        delay: Value,
        honor: bool,
    ) -> Result<ActionOutput> {
        let mut services = testing::services();
        services.config.honor_delays = honor;
        services.config.max_delay_ms = 2_000;
        let run = testing::run_context(json!({"message": "x"}));
        let node = testing::node(5, "delay", "Pause", json!({"delaySeconds": delay}));
        testing::run_handler(&DelayAction, &node, &run, &services).await
    }

    #[tokio::test]
    async fn test_delay_is_recorded() {
        let output = run(json!(1.5), false).await.unwrap();
        assert_eq!(output.wait_delay, Some(1_500));
        assert_eq!(output.outputs.get::<u64>(WAITED_KEY), Some(1_500));

        let output = run(json!("0.25"), false).await.unwrap();
        assert_eq!(output.wait_delay, Some(250));
    }

    #[tokio::test]
    async fn test_delay_is_clamped() {
        let output = run(json!(3600), false).await.unwrap();
        assert_eq!(output.wait_delay, Some(2_000));
    }

    #[tokio::test]
    async fn test_delay_sleeps() {
        let started = std::time::Instant::now();
        run(json!(0.05), true).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_bad_delay() {
        let err = run(json!("soon"), false).await.unwrap_err();
        assert!(err.to_string().starts_with("node 5 (delay)"));
        assert!(run(json!(-1), false).await.is_err());
    }
}
