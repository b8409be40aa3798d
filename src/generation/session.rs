use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, unbounded};

use crate::audio::Transform;
use crate::error::GenerationError;
use crate::generation::CancelToken;
use crate::generation::report::{ProgressEvent, RunReport};
use crate::generation::worker::{GenerationJob, generate};

/// One output session. Runs generation jobs on a background thread, one at a time.
#[derive(Debug, Default)]
pub struct Session {
    active: Arc<AtomicBool>,
}

// Clears the session's busy flag when the worker thread exits, panics included
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    // Rejects the job outright if a run is still going
    pub fn start(&self, job: GenerationJob, transform: Arc<dyn Transform>, cancel: CancelToken) -> Result<RunHandle, GenerationError> {
        if self.active.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return Err(GenerationError::AlreadyRunning);
        }
        let guard = ActiveGuard(Arc::clone(&self.active));

        let (tx, rx) = unbounded::<ProgressEvent>();
        let worker_cancel = cancel.clone();
        let join = std::thread::Builder::new()
            .name("chromatty-generate".into())
            .spawn(move || {
                let _guard = guard;
                // nobody listening is fine, the report still comes back through join
                let mut send = |event: ProgressEvent| {
                    let _ = tx.send(event);
                };
                generate(&job, transform.as_ref(), &mut send, &worker_cancel)
            })
            .map_err(GenerationError::Spawn)?;

        Ok(RunHandle { cancel, events: rx, join })
    }
}

/// A running job: cancel it, watch its progress, wait for its report.
pub struct RunHandle {
    cancel: CancelToken,
    events: Receiver<ProgressEvent>,
    join: JoinHandle<Result<RunReport, GenerationError>>,
}

impl RunHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    // Disconnects once the worker is done
    pub fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    pub fn wait(self) -> Result<RunReport, GenerationError> {
        self.join.join().map_err(|_| GenerationError::WorkerPanicked)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleBuffer;
    use crate::error::TransformError;
    use crate::generation::worker::tests::{FakeTransform, assignments, settings};
    use crossbeam_channel::{Sender, bounded};
    use std::path::Path;

    // Blocks every transform until the test lets it through
    struct Gate {
        entered: Sender<()>,
        open: Receiver<()>,
    }

    fn gate() -> (Arc<Gate>, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = unbounded();
        let (open_tx, open_rx) = bounded(0);
        (Arc::new(Gate { entered: entered_tx, open: open_rx }), entered_rx, open_tx)
    }

    impl Transform for Gate {
        fn load(&self, _sample: &Path) -> Result<SampleBuffer, TransformError> {
            let _ = self.entered.send(());
            let _ = self.open.recv();
            Ok(SampleBuffer::new(vec![0.1; 10], 8000))
        }

        fn shift(&self, audio: SampleBuffer, _semitones: f64) -> Result<SampleBuffer, TransformError> {
            Ok(audio)
        }
    }

    #[test]
    fn runs_in_the_background_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new();
        let job = GenerationJob::new(assignments(&[Some("a.wav"), Some("b.wav")]), settings(), dir.path());
        let handle = session.start(job, Arc::new(FakeTransform::default()), CancelToken::new()).unwrap();

        let events: Vec<ProgressEvent> = handle.events().iter().collect();
        assert_eq!(events.len(), 2);
        let report = handle.wait().unwrap();
        assert_eq!(report.written.len(), 2);
        assert!(!session.is_running());
    }

    #[test]
    fn a_second_start_is_rejected_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new();
        let (gate, _entered, open_tx) = gate();

        let job = GenerationJob::new(assignments(&[Some("a.wav")]), settings(), dir.path());
        let handle = session.start(job.clone(), gate, CancelToken::new()).unwrap();
        assert!(session.is_running());

        let again = session.start(job.clone(), Arc::new(FakeTransform::default()), CancelToken::new());
        assert!(matches!(again, Err(GenerationError::AlreadyRunning)));

        open_tx.send(()).unwrap();
        handle.wait().unwrap();
        assert!(!session.is_running());

        // free again once the first run is over
        let third = session.start(job, Arc::new(FakeTransform::default()), CancelToken::new()).unwrap();
        third.wait().unwrap();
    }

    #[test]
    fn cancel_from_the_handle_stops_between_notes() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new();
        let (gate, entered, open_tx) = gate();
        let job = GenerationJob::new(assignments(&[Some("a.wav"), Some("b.wav"), Some("c.wav")]), settings(), dir.path());

        let handle = session.start(job, gate, CancelToken::new()).unwrap();
        // wait until the worker is inside the first note, cancel, then let it finish
        entered.recv().unwrap();
        handle.cancel();
        open_tx.send(()).unwrap();
        let first = handle.events().recv().unwrap();
        assert_eq!(first.index, 0);

        let report = handle.wait().unwrap();
        assert!(report.cancelled);
        assert_eq!(report.written.len(), 1);
        assert!(report.chromatic.is_none());
    }
}
