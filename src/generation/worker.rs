// One generation run: walk the assignments in order, render each note through
// the transform and write it out. Runs on whatever thread calls it; the
// session is what puts it in the background.

use std::path::{Path, PathBuf};

use crate::audio::{SampleBuffer, Transform, concatenate, write_with_markers};
use crate::error::{GenerationError, TransformError};
use crate::generation::CancelToken;
use crate::generation::report::{FailedNote, ItemOutcome, ProgressEvent, RunReport, SkippedNote, WrittenNote};
use crate::pipeline::preset::ScaleSettings;
use crate::pipeline::resolver::{Assignment, SkipReason};
use crate::shared::CHROMATIC_FILE;

#[derive(Clone, Debug)]
pub struct GenerationJob {
    pub assignments: Vec<Assignment>,
    pub settings: ScaleSettings,
    pub output_dir: PathBuf,
}

impl GenerationJob {
    pub fn new(assignments: Vec<Assignment>, settings: ScaleSettings, output_dir: impl Into<PathBuf>) -> Self {
        Self { assignments, settings, output_dir: output_dir.into() }
    }
}

// load, normalize (pre-pitch), then shift
fn render(transform: &dyn Transform, assignment: &Assignment, sample: &Path, settings: &ScaleSettings) -> Result<SampleBuffer, TransformError> {
    let mut audio = transform.load(sample)?;
    if settings.normalize {
        audio = transform.normalize(audio)?;
    }
    let shift = if settings.pitched { assignment.semitone() as f64 } else { 0.0 };
    transform.shift(audio, shift)
}

pub fn generate(
    job: &GenerationJob,
    transform: &dyn Transform,
    on_progress: &mut dyn FnMut(ProgressEvent),
    cancel: &CancelToken,
) -> Result<RunReport, GenerationError> {
    let out = &job.output_dir;
    std::fs::create_dir_all(out).map_err(|source| GenerationError::Io { path: out.clone(), source })?;

    let total = job.assignments.len();
    log::info!("generating {total} note(s) into {}", out.display());

    let mut report = RunReport::default();
    let mut rendered: Vec<(String, SampleBuffer)> = Vec::new();

    for (index, assignment) in job.assignments.iter().enumerate() {
        if cancel.is_cancelled() {
            log::info!("cancelled before note {} of {total}", index + 1);
            report.cancelled = true;
            break;
        }

        let note = assignment.note;
        let outcome = match &assignment.sample {
            None => {
                report.skipped.push(SkippedNote {
                    position: assignment.position,
                    note,
                    reason: assignment.skip.unwrap_or(SkipReason::MissingSymbol),
                });
                ItemOutcome::Skipped
            }
            Some(sample) => match render(transform, assignment, sample, &job.settings) {
                Ok(audio) => {
                    let path = out.join(note.file_name());
                    // not being able to write is the end of the run
                    audio.write_wav(&path).map_err(|e| GenerationError::from_hound(path.clone(), e))?;
                    log::debug!("{note}: {} -> {}", sample.display(), path.display());
                    report.written.push(WrittenNote { position: assignment.position, note, path });
                    rendered.push((note.label(), audio));
                    ItemOutcome::Written
                }
                Err(e) => {
                    log::warn!("{note}: {e}");
                    report.failed.push(FailedNote {
                        position: assignment.position,
                        note,
                        sample: sample.clone(),
                        message: e.to_string(),
                    });
                    ItemOutcome::Failed
                }
            },
        };
        on_progress(ProgressEvent { index, total, note, outcome });
    }

    if !report.cancelled && !rendered.is_empty() {
        let settings = &job.settings;
        let (scale, markers) = concatenate(&rendered, settings.gap, settings.sample_rate);
        let markers = if settings.slice_markers { markers } else { Vec::new() };
        let path = out.join(CHROMATIC_FILE);
        write_with_markers(&path, &scale, &markers).map_err(|e| GenerationError::from_hound(path.clone(), e))?;
        report.chromatic = Some(path);
    }

    log::info!(
        "run finished: {} written, {} skipped, {} failed{}",
        report.written.len(),
        report.skipped.len(),
        report.failed.len(),
        if report.cancelled { ", cancelled" } else { "" }
    );
    Ok(report)
}
