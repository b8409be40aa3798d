// Template + folder -> the ordered list of assignments a run will render.
// Both modes end up here so preview and generate see exactly the same plan.
use std::path::Path;

use crate::error::Result;
use crate::loader::BucketCache;
use crate::pipeline::decision::MissingSymbolDecider;
use crate::pipeline::preset::{Mode, Template};
use crate::pipeline::preview::PreviewReport;
use crate::pipeline::resolver::{ResolveRequest, Resolution, resolve};
use crate::pipeline::sequential::sequential_assignments;

pub fn plan(
    template: &Template,
    folder: &Path,
    cache: &BucketCache,
    decider: &dyn MissingSymbolDecider,
) -> Result<Resolution> {
    template.validate()?;
    let settings = &template.settings;
    match settings.mode {
        Mode::Normal => {
            let assignments = sequential_assignments(folder, settings, template.seed())?;
            Ok(Resolution { assignments, warnings: Vec::new() })
        }
        Mode::Custom => {
            let scan = cache.get_or_scan(folder)?;
            let request = ResolveRequest::from_preset(&template.preset, settings.semitone_count, settings.base());
            log::info!(
                "resolving {} over {} note(s) from {}",
                template.preset.token_string(),
                settings.semitone_count,
                settings.base()
            );
            Ok(resolve(&request, &scan.buckets, decider)?)
        }
    }
}

// Same as `plan`, reported for display; never writes or transforms anything
pub fn preview(
    template: &Template,
    folder: &Path,
    cache: &BucketCache,
    decider: &dyn MissingSymbolDecider,
) -> Result<PreviewReport> {
    plan(template, folder, cache, decider).map(|r| PreviewReport::from_resolution(&r))
}
