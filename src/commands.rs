use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};

use chromatty::Error;
use chromatty::audio::Varispeed;
use chromatty::generation::{CancelToken, GenerationJob, Session};
use chromatty::loader::{BucketCache, scan_folder};
use chromatty::pipeline::persistence;
use chromatty::pipeline::preset::builtin_presets;
use chromatty::pipeline::{Decision, PreviewReport, Resolution, ScaleSettings, Template, decision_channel, plan};

use crate::TemplateArgs;
use crate::tui::input::{self, KeyInput};

impl TemplateArgs {
    // template file / preset id / defaults, then whatever flags were given on top
    fn load(&self, folder: &Path) -> anyhow::Result<Template> {
        let mut template = match (&self.template, &self.preset) {
            (Some(path), _) => persistence::load_template(path)
                .map_err(Error::from)
                .with_context(|| format!("loading template {}", path.display()))?,
            (None, Some(id)) => Template::new(persistence::find_preset(folder, id).map_err(Error::from)?, ScaleSettings::default()),
            (None, None) => Template::default(),
        };

        let preset = &mut template.preset;
        if let Some(tokens) = &self.tokens {
            preset.tokens = tokens.clone();
        }
        if let Some(selection) = self.selection {
            preset.selection_policy = selection;
        }
        if let Some(length) = self.length {
            preset.length_policy = length;
        }
        if let Some(missing) = self.missing {
            preset.missing_policy = missing;
        }
        if self.seed.is_some() {
            preset.seed = self.seed;
        }

        let settings = &mut template.settings;
        if let Some(mode) = self.mode {
            settings.mode = mode;
        }
        if let Some(base_note) = self.base_note {
            settings.base_note = base_note;
        }
        if let Some(octave) = self.octave {
            settings.octave = octave;
        }
        if let Some(semitones) = self.semitones {
            settings.semitone_count = semitones;
        }
        if let Some(gap) = self.gap {
            settings.gap = gap;
        }
        settings.normalize |= self.normalize;
        settings.randomize |= self.randomize;
        settings.slice_markers |= self.slice_markers;
        if self.unpitched {
            settings.pitched = false;
        }

        template.validate().map_err(Error::from)?;
        Ok(template)
    }

    fn ask_timeout(&self) -> Option<Duration> {
        self.ask_timeout.map(Duration::from_secs)
    }
}

// Resolve on a helper thread so this one can answer `ask` questions as they come in
fn plan_with_prompts(template: &Template, folder: &Path, timeout: Option<Duration>) -> anyhow::Result<Resolution> {
    let cache = BucketCache::new();
    let (decider, requests) = decision_channel(timeout);

    std::thread::scope(|scope| {
        let worker = scope.spawn(move || plan(template, folder, &cache, &decider));
        // ends when the worker drops its decider
        for request in requests.iter() {
            let decision = input::ask_missing(request.symbol, request.position, timeout).unwrap_or_else(|e| {
                log::warn!("could not read an answer ({e}); aborting");
                Decision::Abort
            });
            request.respond(decision);
        }
        let resolution = worker.join().map_err(|_| anyhow!("resolution thread panicked"))??;
        Ok(resolution)
    })
}

pub fn scan(folder: &Path, json: bool) -> anyhow::Result<()> {
    let scan = scan_folder(folder).map_err(Error::from)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&scan)?);
        return Ok(());
    }

    for (symbol, samples) in scan.buckets.iter() {
        let names: Vec<String> = samples.iter().map(|s| s.file_name()).collect();
        println!("{:<3} {:>3}  {}", symbol, samples.len(), names.join(", "));
    }
    if !scan.untagged.is_empty() {
        println!("untagged: {}", scan.untagged.len());
        for path in &scan.untagged {
            println!("  {}", path.display());
        }
    }
    for (tag, paths) in &scan.unknown_tags {
        println!("unknown tag {tag}: {} file(s)", paths.len());
    }
    for conflict in scan.conflicts() {
        println!("conflict: {conflict}");
    }
    for issue in &scan.issues {
        println!("unreadable: {}: {}", issue.path.display(), issue.message);
    }
    Ok(())
}

pub fn preview(folder: &Path, args: &TemplateArgs, json: bool) -> anyhow::Result<()> {
    let template = args.load(folder)?;
    let report = PreviewReport::from_resolution(&plan_with_prompts(&template, folder, args.ask_timeout())?);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

pub fn generate(folder: &Path, out: &Path, args: &TemplateArgs) -> anyhow::Result<()> {
    let template = args.load(folder)?;
    let resolution = plan_with_prompts(&template, folder, args.ask_timeout())?;
    for warning in &resolution.warnings {
        println!("warning: {warning}");
    }

    let settings = template.settings.clone();
    let transform = Arc::new(Varispeed::new(settings.sample_rate));
    let job = GenerationJob::new(resolution.assignments, settings, out);

    let session = Session::new();
    let handle = session.start(job, transform, CancelToken::new()).map_err(Error::from)?;

    if input::interactive() {
        println!("press Esc or q to stop after the current note");
        let mut stopping = false;
        loop {
            match handle.events().try_recv() {
                Ok(event) => println!("{event}"),
                Err(crossbeam_channel::TryRecvError::Disconnected) => break,
                Err(crossbeam_channel::TryRecvError::Empty) => {
                    if !stopping && input::poll_input(Duration::from_millis(50))? == Some(KeyInput::Cancel) {
                        handle.cancel();
                        stopping = true;
                        println!("stopping after the current note...");
                    } else if stopping {
                        std::thread::sleep(Duration::from_millis(50));
                    }
                }
            }
        }
    } else {
        for event in handle.events().iter() {
            println!("{event}");
        }
    }

    let report = handle.wait().map_err(Error::from)?;
    print!("{report}");
    if report.cancelled {
        log::warn!("run cancelled; {} has a partial set of notes and no chromatic.wav", out.display());
    } else if !report.is_clean() {
        log::warn!("{} note(s) not written to {}", report.skipped.len() + report.failed.len(), out.display());
    }
    Ok(())
}

pub fn init(file: &Path, force: bool) -> anyhow::Result<()> {
    if file.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", file.display());
    }
    persistence::save_template(file, &Template::default()).map_err(Error::from)?;
    println!("wrote {}", file.display());
    Ok(())
}

pub fn presets(folder: &Path) -> anyhow::Result<()> {
    let library = persistence::list_library(folder);
    for (origin, presets) in [("built-in", builtin_presets()), ("library", library)] {
        for p in presets {
            let seed = p.seed.map(|s| format!(" seed={s}")).unwrap_or_default();
            println!(
                "{:<9} {:<16} {:<24} {}/{}/{}{}",
                origin,
                p.id,
                p.token_string(),
                p.selection_policy,
                p.length_policy,
                p.missing_policy,
                seed
            );
        }
    }
    Ok(())
}

pub fn save_preset(folder: &Path, file: &Path) -> anyhow::Result<()> {
    let preset = persistence::load_preset(file)
        .map_err(Error::from)
        .with_context(|| format!("reading {}", file.display()))?;
    let path = persistence::save_to_library(folder, &preset).map_err(Error::from)?;
    println!("saved `{}` to {}", preset.id, path.display());
    Ok(())
}
