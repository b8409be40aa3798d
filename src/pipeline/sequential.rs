// Normal mode: the folder holds 1.wav, 2.wav, ... and notes walk through them
// in order (or at random) with no tags involved.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ScanError;
use crate::pipeline::preset::ScaleSettings;
use crate::pipeline::resolver::Assignment;
use crate::shared::AUDIO_EXTENSION;

fn numbered(folder: &Path, n: usize) -> PathBuf {
    folder.join(format!("{n}.{AUDIO_EXTENSION}"))
}

// length of the unbroken run 1.wav, 2.wav, ... (stops at the first gap)
pub fn count_numbered_samples(folder: &Path) -> usize {
    (1..).take_while(|n| numbered(folder, *n).is_file()).count()
}

// 1-based sample number for each of `semitones` notes
pub fn build_default_sequence(file_count: usize, semitones: usize, randomize: bool, seed: Option<u64>) -> Vec<usize> {
    if file_count == 0 {
        return Vec::new();
    }
    if randomize {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        (0..semitones).map(|_| rng.random_range(1..=file_count)).collect()
    } else {
        (0..semitones).map(|i| (i % file_count) + 1).collect()
    }
}

pub fn sequential_assignments(folder: &Path, settings: &ScaleSettings, seed: Option<u64>) -> Result<Vec<Assignment>, ScanError> {
    if let Err(source) = std::fs::read_dir(folder) {
        return Err(ScanError::Unreadable { path: folder.to_path_buf(), source });
    }
    let count = count_numbered_samples(folder);
    if count == 0 {
        return Err(ScanError::NoSequentialSamples(folder.to_path_buf()));
    }
    log::info!("found {count} numbered sample(s) (1.wav..{count}.wav) in {}", folder.display());

    let sequence = build_default_sequence(count, settings.semitone_count, settings.randomize, seed);
    Ok(sequence
        .into_iter()
        .enumerate()
        .map(|(position, n)| Assignment {
            position,
            note: settings.note_at(position),
            token: None,
            sample: Some(numbered(folder, n)),
            skip: None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn in_order_sequence_wraps() {
        assert_eq!(build_default_sequence(3, 5, false, None), vec![1, 2, 3, 1, 2]);
        assert!(build_default_sequence(0, 5, false, None).is_empty());
    }

    #[test]
    fn random_sequence_is_seeded_and_in_range() {
        let a = build_default_sequence(3, 50, true, Some(42));
        let b = build_default_sequence(3, 50, true, Some(42));
        assert_eq!(a, b);
        assert!(a.iter().all(|n| (1..=3).contains(n)));
    }

    #[test]
    fn numbering_stops_at_the_first_gap() {
        let dir = tempfile::tempdir().unwrap();
        for n in [1, 2, 4] {
            fs::write(dir.path().join(format!("{n}.wav")), b"").unwrap();
        }
        assert_eq!(count_numbered_samples(dir.path()), 2);
    }

    #[test]
    fn assignments_walk_the_numbered_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("1.wav"), b"").unwrap();
        fs::write(dir.path().join("2.wav"), b"").unwrap();
        let settings = ScaleSettings { semitone_count: 3, ..Default::default() };
        let out = sequential_assignments(dir.path(), &settings, None).unwrap();
        let files: Vec<_> = out.iter().map(|a| a.sample.clone().unwrap()).collect();
        assert_eq!(files, vec![dir.path().join("1.wav"), dir.path().join("2.wav"), dir.path().join("1.wav")]);
        assert_eq!(out[2].note.label(), "D3");
    }

    #[test]
    fn empty_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ScaleSettings::default();
        assert!(matches!(
            sequential_assignments(dir.path(), &settings, None),
            Err(ScanError::NoSequentialSamples(_))
        ));
        assert!(matches!(
            sequential_assignments(&dir.path().join("missing"), &settings, None),
            Err(ScanError::Unreadable { .. })
        ));
    }
}
