// Loading and saving presets/templates as json, plus the per-folder preset library
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::PresetError;
use crate::pipeline::preset::{Preset, Template, builtin_presets};

const LIBRARY_DIR: &str = ".chromatty";
const PRESETS_DIR: &str = "presets";

// <sample_dir>/.chromatty/presets/
pub fn library_dir(sample_dir: &Path) -> PathBuf {
    sample_dir.join(LIBRARY_DIR).join(PRESETS_DIR)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PresetError> {
    let data = std::fs::read_to_string(path).map_err(|source| PresetError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&data).map_err(|source| PresetError::Json { path: path.to_path_buf(), source })
}

// Write pretty json, making parent dirs if they don't exist already
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PresetError> {
    let io_err = |source| PresetError::Io { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| PresetError::Json { path: path.to_path_buf(), source })?;
    std::fs::write(path, json).map_err(io_err)
}

pub fn load_preset(path: &Path) -> Result<Preset, PresetError> {
    let preset: Preset = read_json(path)?;
    preset.validate()?;
    Ok(preset)
}

pub fn save_preset(path: &Path, preset: &Preset) -> Result<(), PresetError> {
    preset.validate()?;
    write_json(path, preset)
}

pub fn load_template(path: &Path) -> Result<Template, PresetError> {
    let template: Template = read_json(path)?;
    template.validate()?;
    Ok(template)
}

pub fn save_template(path: &Path, template: &Template) -> Result<(), PresetError> {
    template.validate()?;
    write_json(path, template)
}

// Store a preset in the folder's library under its id; returns where it went
pub fn save_to_library(sample_dir: &Path, preset: &Preset) -> Result<PathBuf, PresetError> {
    let path = library_dir(sample_dir).join(format!("{}.json", file_stem_for(&preset.id)));
    save_preset(&path, preset)?;
    Ok(path)
}

// Library presets, sorted by id. Broken files are logged and left out.
pub fn list_library(sample_dir: &Path) -> Vec<Preset> {
    let dir = library_dir(sample_dir);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut presets: Vec<Preset> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")))
        .filter_map(|p| match load_preset(&p) {
            Ok(preset) => Some(preset),
            Err(e) => {
                log::warn!("skipping library preset {}: {e}", p.display());
                None
            }
        })
        .collect();
    presets.sort_by(|a, b| a.id.cmp(&b.id));
    presets
}

// Look a preset up by id: the folder library first, then the built-ins
pub fn find_preset(sample_dir: &Path, id: &str) -> Result<Preset, PresetError> {
    list_library(sample_dir)
        .into_iter()
        .chain(builtin_presets())
        .find(|p| p.id.eq_ignore_ascii_case(id))
        .ok_or_else(|| PresetError::NotFound(id.to_string()))
}

// ids can be anything a user typed; keep the file name tame
fn file_stem_for(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
