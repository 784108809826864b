//! Leaf backend that reports intended desktop effects without performing them
//!
//! Pointer, keyboard and vision backends plug in through [`LeafActions`]; this
//! one lets sequences be exercised end to end on any machine. Waits really
//! wait, so step timing matches a live run.

use async_trait::async_trait;
use tracing::info;

use scout_sequence::leaf::duration_from_secs;
use scout_sequence::{ExecutionContext, Leaf, LeafActions, LeafError, LeafOutcome};

#[derive(Debug, Default)]
pub struct DryRunLeafActions;

#[async_trait]
impl LeafActions for DryRunLeafActions {
    async fn execute(
        &self,
        leaf: Leaf<'_>,
        ctx: &ExecutionContext,
    ) -> Result<LeafOutcome, LeafError> {
        let run_id = ctx.run_id();
        let outcome = match leaf {
            Leaf::Wait(p) => {
                let duration = duration_from_secs(p.duration)?;
                tokio::time::sleep(duration).await;
                LeafOutcome::success(format!("Waited {:.2}s", p.duration))
            }
            Leaf::TemplateSearch(p) => {
                // Nothing to look at: assume the template is where the region says
                let position = p
                    .search_region
                    .map(|[x, y, w, h]| (x + w / 2, y + h / 2))
                    .unwrap_or((0, 0));
                LeafOutcome::success(format!("Dry run: assumed '{}' visible", p.template_path))
                    .with_match(position, p.confidence)
            }
            Leaf::WaitForText(p) => {
                LeafOutcome::success(format!("Dry run: assumed text '{}' visible", p.text))
                    .with_text(p.text.clone())
            }
            Leaf::TypeText(p) => {
                // Typed text may come from secrets
                LeafOutcome::success(format!("Dry run: type {} characters", p.text.chars().count()))
            }
            other => LeafOutcome::success(format!("Dry run: {}", other.describe())),
        };

        info!(%run_id, kind = leaf.name(), "{}", outcome.message);
        Ok(outcome)
    }
}
