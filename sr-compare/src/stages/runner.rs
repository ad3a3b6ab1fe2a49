//! Runs one stage: tool invocation, relocation, suffix rename.

use super::StageSpec;
use crate::context::RunContext;
use crate::errors::{RelocationError, SrCompareError};
use crate::tools::OutputSpec;
use std::path::PathBuf;
use tracing::info;

/// Runs a stage to completion and returns its canonical output directory.
///
/// The tool is always asked to write to the canonical directory. A tool
/// that reports a different location (one with hardcoded output paths)
/// has that directory relocated into the store afterwards. Either way
/// the canonical directory must exist once the stage finishes; a tool
/// that exits cleanly without producing it is a relocation failure, not
/// a tool failure.
pub async fn run_stage(ctx: &RunContext, stage: &StageSpec) -> Result<PathBuf, SrCompareError> {
    let canonical = ctx.store().stage_dir(&stage.name);
    let spec = OutputSpec::new(&canonical);

    info!(stage = %stage.name, tool = %stage.tool.name(), "running stage");
    let location = stage.tool.run(ctx.input_dir(), &spec).await?;

    let dir = if location.dir() == canonical {
        if !canonical.is_dir() {
            return Err(RelocationError::source_missing(&stage.name, &canonical).into());
        }
        canonical
    } else {
        ctx.store().relocate(&stage.name, location.dir())?
    };

    if let Some(rule) = &stage.rename {
        let renamed = rule.apply(&dir)?;
        if renamed > 0 {
            info!(stage = %stage.name, count = renamed, "applied rename rule");
        }
    }

    Ok(dir)
}
