// The `ask` missing-symbol policy needs an answer from whoever sits in front
// of the tool. The resolver only sees `MissingSymbolDecider`; the channel
// implementation hands the question to another thread and blocks on a reply,
// giving up (abort) on timeout, cancellation, or a hung-up interface.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::generation::CancelToken;
use crate::shared::Symbol;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Skip,
    Abort,
}

pub trait MissingSymbolDecider {
    fn ask_missing_symbol(&self, symbol: Symbol, position: usize) -> Decision;
}

impl<F> MissingSymbolDecider for F
where
    F: Fn(Symbol, usize) -> Decision,
{
    fn ask_missing_symbol(&self, symbol: Symbol, position: usize) -> Decision {
        self(symbol, position)
    }
}

// For callers with nobody to ask
#[derive(Clone, Copy, Debug, Default)]
pub struct AbortOnAsk;

impl MissingSymbolDecider for AbortOnAsk {
    fn ask_missing_symbol(&self, _symbol: Symbol, _position: usize) -> Decision {
        Decision::Abort
    }
}

#[derive(Debug)]
pub struct DecisionRequest {
    pub symbol: Symbol,
    pub position: usize,
    reply: Sender<Decision>,
}

impl DecisionRequest {
    pub fn respond(self, decision: Decision) {
        // the asker may have timed out already; nothing to do then
        let _ = self.reply.send(decision);
    }
}

#[derive(Clone, Debug)]
pub struct ChannelDecider {
    requests: Sender<DecisionRequest>,
    timeout: Option<Duration>,
    cancel: CancelToken,
}

impl ChannelDecider {
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl MissingSymbolDecider for ChannelDecider {
    fn ask_missing_symbol(&self, symbol: Symbol, position: usize) -> Decision {
        if self.cancel.is_cancelled() {
            return Decision::Abort;
        }
        let (reply, answer) = crossbeam_channel::bounded(1);
        if self.requests.send(DecisionRequest { symbol, position, reply }).is_err() {
            log::warn!("nobody is listening for decisions; aborting on missing {symbol}");
            return Decision::Abort;
        }

        let deadline = self.timeout.map(|t| Instant::now() + t);
        loop {
            match answer.recv_timeout(POLL_INTERVAL) {
                Ok(decision) => return decision,
                Err(RecvTimeoutError::Disconnected) => return Decision::Abort,
                Err(RecvTimeoutError::Timeout) => {}
            }
            if self.cancel.is_cancelled() {
                return Decision::Abort;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                log::warn!("no answer for missing {symbol} at position {position}; aborting");
                return Decision::Abort;
            }
        }
    }
}

// `timeout: None` waits until answered, cancelled, or the receiver is dropped
pub fn decision_channel(timeout: Option<Duration>) -> (ChannelDecider, Receiver<DecisionRequest>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let decider = ChannelDecider { requests: tx, timeout, cancel: CancelToken::new() };
    (decider, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn answers_travel_back_to_the_asker() {
        let (decider, requests) = decision_channel(Some(Duration::from_secs(5)));
        let ui = thread::spawn(move || {
            let req = requests.recv().unwrap();
            assert_eq!(req.symbol, Symbol::U);
            assert_eq!(req.position, 3);
            req.respond(Decision::Skip);
        });
        assert_eq!(decider.ask_missing_symbol(Symbol::U, 3), Decision::Skip);
        ui.join().unwrap();
    }

    #[test]
    fn timeout_aborts_instead_of_hanging() {
        let (decider, _requests) = decision_channel(Some(Duration::from_millis(120)));
        let started = Instant::now();
        assert_eq!(decider.ask_missing_symbol(Symbol::A, 0), Decision::Abort);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn hung_up_interface_aborts() {
        let (decider, requests) = decision_channel(None);
        drop(requests);
        assert_eq!(decider.ask_missing_symbol(Symbol::E, 1), Decision::Abort);

        // request accepted, then dropped without an answer
        let (decider, requests) = decision_channel(None);
        let ui = thread::spawn(move || drop(requests.recv().unwrap()));
        assert_eq!(decider.ask_missing_symbol(Symbol::E, 1), Decision::Abort);
        ui.join().unwrap();
    }

    #[test]
    fn cancellation_releases_a_waiting_asker() {
        let cancel = CancelToken::new();
        let (decider, _requests) = decision_channel(None);
        let decider = decider.with_cancel(cancel.clone());
        let asker = thread::spawn(move || decider.ask_missing_symbol(Symbol::O, 2));
        thread::sleep(Duration::from_millis(100));
        cancel.cancel();
        assert_eq!(asker.join().unwrap(), Decision::Abort);
    }

    #[test]
    fn closures_can_decide() {
        let decider = |symbol: Symbol, _pos: usize| if symbol == Symbol::A { Decision::Skip } else { Decision::Abort };
        assert_eq!(decider.ask_missing_symbol(Symbol::A, 0), Decision::Skip);
        assert_eq!(AbortOnAsk.ask_missing_symbol(Symbol::A, 0), Decision::Abort);
    }
}
