// The one-file scale: every rendered note back to back with a gap after each,
// optionally with RIFF cue points + labels so samplers can slice it by note.

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use super::sample_buffer::SampleBuffer;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceMarker {
    pub offset: u32, // in frames
    pub label: String,
}

pub fn concatenate(notes: &[(String, SampleBuffer)], gap_seconds: f64, sample_rate: u32) -> (SampleBuffer, Vec<SliceMarker>) {
    let gap = SampleBuffer::silence(gap_seconds, sample_rate);
    let mut out = SampleBuffer::new(Vec::new(), sample_rate);
    let mut markers = Vec::with_capacity(notes.len());
    for (label, buffer) in notes {
        markers.push(SliceMarker { offset: out.len() as u32, label: label.clone() });
        out.append(buffer);
        out.append(&gap);
    }
    (out, markers)
}

fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 9);
    out.extend_from_slice(id);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    if body.len() % 2 == 1 {
        out.push(0); // chunks are word aligned
    }
    out
}

fn marker_chunks(markers: &[SliceMarker]) -> Vec<u8> {
    let mut cue = (markers.len() as u32).to_le_bytes().to_vec();
    let mut adtl = b"adtl".to_vec();
    for (i, marker) in markers.iter().enumerate() {
        let id = (i as u32 + 1).to_le_bytes();
        let offset = marker.offset.to_le_bytes();
        cue.extend_from_slice(&id);
        cue.extend_from_slice(&offset); // position
        cue.extend_from_slice(b"data");
        cue.extend_from_slice(&0u32.to_le_bytes()); // chunk start
        cue.extend_from_slice(&0u32.to_le_bytes()); // block start
        cue.extend_from_slice(&offset); // sample offset

        let mut labl = id.to_vec();
        labl.extend_from_slice(marker.label.as_bytes());
        labl.push(0);
        adtl.extend_from_slice(&chunk(b"labl", &labl));
    }
    let mut out = chunk(b"cue ", &cue);
    out.extend_from_slice(&chunk(b"LIST", &adtl));
    out
}

// Write the wav, then tack the marker chunks on after the data chunk and fix the RIFF size
pub fn write_with_markers(path: &Path, buffer: &SampleBuffer, markers: &[SliceMarker]) -> Result<(), hound::Error> {
    buffer.write_wav(path)?;
    if markers.is_empty() {
        return Ok(());
    }
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    file.seek(SeekFrom::End(0))?;
    file.write_all(&marker_chunks(markers))?;
    let len = file.seek(SeekFrom::End(0))?;
    file.seek(SeekFrom::Start(4))?;
    file.write_all(&((len - 8) as u32).to_le_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn notes_are_laid_out_with_gaps() {
        let notes = vec![
            ("C3".to_string(), SampleBuffer::new(vec![0.5; 10], 100)),
            ("C#3".to_string(), SampleBuffer::new(vec![0.5; 4], 100)),
        ];
        let (joined, markers) = concatenate(&notes, 0.05, 100);
        assert_eq!(joined.len(), 10 + 5 + 4 + 5);
        assert_eq!(markers[0], SliceMarker { offset: 0, label: "C3".into() });
        assert_eq!(markers[1].offset, 15);
        assert_eq!(joined.data[12], 0.0);
    }

    #[test]
    fn marked_file_stays_readable_and_carries_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chromatic.wav");
        let buffer = SampleBuffer::new(vec![0.1; 33], 8000);
        let markers = vec![
            SliceMarker { offset: 0, label: "C3".into() },
            SliceMarker { offset: 20, label: "C#3".into() },
        ];
        write_with_markers(&path, &buffer, &markers).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let riff_len = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
        assert_eq!(riff_len, bytes.len() - 8);
        assert!(find(&bytes, b"cue ").is_some());
        assert!(find(&bytes, b"adtl").is_some());
        assert!(find(&bytes, b"C#3\0").is_some());

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 33);
    }

    #[test]
    fn no_markers_means_a_plain_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.wav");
        write_with_markers(&path, &SampleBuffer::new(vec![0.0; 8], 8000), &[]).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(find(&bytes, b"cue ").is_none());
    }
}
