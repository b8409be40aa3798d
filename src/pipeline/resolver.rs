//! Order resolution: stretch or cut a preset's token list to the number of
//! notes wanted, then pick one concrete sample per position.
//!
//! All per-run state (cycle cursors, the random source) lives in a
//! [`ResolverContext`] owned by the run, so two resolutions running side by
//! side can't disturb each other's output.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::ResolveError;
use crate::loader::{Buckets, SymbolConflict};
use crate::pipeline::decision::{Decision, MissingSymbolDecider};
use crate::pipeline::preset::{LengthPolicy, MissingPolicy, Preset, SelectionPolicy};
use crate::shared::{NoteId, Symbol};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingSymbol,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::MissingSymbol => "missing_symbol",
        }
    }
}

/// One output note and the sample that will be tuned to it, if any.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub position: usize,
    pub note: NoteId,
    pub token: Option<Symbol>, // None for numbered (normal mode) samples
    pub sample: Option<PathBuf>,
    pub skip: Option<SkipReason>,
}

impl Assignment {
    // semitones above the base note
    pub fn semitone(&self) -> i32 {
        self.position as i32
    }

    pub fn is_skipped(&self) -> bool {
        self.sample.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Warning {
    Conflict(SymbolConflict),
    Skipped { position: usize, symbol: Symbol },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Conflict(c) => c.fmt(f),
            Warning::Skipped { position, symbol } => {
                write!(f, "position {position}: no samples tagged {symbol}, skipped")
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub assignments: Vec<Assignment>,
    pub warnings: Vec<Warning>,
}

impl Resolution {
    pub fn skipped(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter().filter(|a| a.is_skipped())
    }
}

/// Mutable state for exactly one resolution run.
pub struct ResolverContext {
    cursors: HashMap<Symbol, usize>,
    rng: StdRng,
}

impl ResolverContext {
    // a seed makes Random picks reproducible; without one they come from the OS
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { cursors: HashMap::new(), rng }
    }

    // how many times `symbol` has been picked under Cycle so far
    pub fn cursor(&self, symbol: Symbol) -> usize {
        self.cursors.get(&symbol).copied().unwrap_or(0)
    }

    fn next_cycle(&mut self, symbol: Symbol, len: usize) -> usize {
        let cursor = self.cursors.entry(symbol).or_insert(0);
        let idx = *cursor % len;
        *cursor += 1;
        idx
    }

    fn next_random(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }

    fn pick(&mut self, policy: SelectionPolicy, symbol: Symbol, len: usize) -> usize {
        match policy {
            SelectionPolicy::First => 0,
            SelectionPolicy::Cycle => self.next_cycle(symbol, len),
            SelectionPolicy::Random => self.next_random(len),
        }
    }
}

/// Everything a resolution needs besides the buckets.
#[derive(Clone, Copy, Debug)]
pub struct ResolveRequest<'a> {
    pub tokens: &'a [Symbol],
    pub required: usize,
    pub selection: SelectionPolicy,
    pub length: LengthPolicy,
    pub missing: MissingPolicy,
    pub seed: Option<u64>,
    pub base: NoteId,
}

impl<'a> ResolveRequest<'a> {
    pub fn from_preset(preset: &'a Preset, required: usize, base: NoteId) -> Self {
        Self {
            tokens: &preset.tokens,
            required,
            selection: preset.selection_policy,
            length: preset.length_policy,
            missing: preset.missing_policy,
            seed: preset.seed,
            base,
        }
    }
}

/// Step 1: make the token list exactly `required` long, or refuse.
pub fn adjust_length(tokens: &[Symbol], required: usize, policy: LengthPolicy) -> Result<Vec<Symbol>, ResolveError> {
    if tokens.is_empty() {
        return Err(ResolveError::EmptyTokens);
    }
    let mismatch = || ResolveError::LengthMismatch { policy, tokens: tokens.len(), required };
    match policy {
        LengthPolicy::Pad => Ok(tokens.iter().copied().cycle().take(required).collect()),
        LengthPolicy::Truncate if tokens.len() >= required => Ok(tokens[..required].to_vec()),
        LengthPolicy::Truncate => Err(mismatch()),
        LengthPolicy::Error if tokens.len() == required => Ok(tokens.to_vec()),
        LengthPolicy::Error => Err(mismatch()),
    }
}

/// Resolve with a fresh context.
pub fn resolve(
    request: &ResolveRequest<'_>,
    buckets: &Buckets,
    decider: &dyn MissingSymbolDecider,
) -> Result<Resolution, ResolveError> {
    let ctx = ResolverContext::new(request.seed);
    resolve_with(ctx, request, buckets, decider).map(|(resolution, _)| resolution)
}

/// Resolve with a caller-provided context, handing it back afterwards.
pub fn resolve_with(
    mut ctx: ResolverContext,
    request: &ResolveRequest<'_>,
    buckets: &Buckets,
    decider: &dyn MissingSymbolDecider,
) -> Result<(Resolution, ResolverContext), ResolveError> {
    let expanded = adjust_length(request.tokens, request.required, request.length)?;

    let mut warnings: Vec<Warning> = buckets.conflicts().iter().cloned().map(Warning::Conflict).collect();
    let mut assignments = Vec::with_capacity(expanded.len());

    for (position, symbol) in expanded.into_iter().enumerate() {
        let note = request.base.transpose(position as i32);
        let bucket = buckets.get(symbol);

        if bucket.is_empty() {
            match request.missing {
                MissingPolicy::Skip => {}
                MissingPolicy::Ask => match decider.ask_missing_symbol(symbol, position) {
                    Decision::Skip => {}
                    Decision::Abort => return Err(ResolveError::Aborted { symbol, position }),
                },
                MissingPolicy::Error => return Err(ResolveError::MissingSymbol { symbol, position }),
            }
            log::warn!("position {position} ({note}): no samples tagged {symbol}, skipping");
            warnings.push(Warning::Skipped { position, symbol });
            assignments.push(Assignment {
                position,
                note,
                token: Some(symbol),
                sample: None,
                skip: Some(SkipReason::MissingSymbol),
            });
            continue;
        }

        let idx = ctx.pick(request.selection, symbol, bucket.len());
        assignments.push(Assignment {
            position,
            note,
            token: Some(symbol),
            sample: Some(bucket[idx].path.clone()),
            skip: None,
        });
    }

    log::debug!(
        "resolved {} position(s) with {} selection, {} warning(s)",
        assignments.len(),
        request.selection,
        warnings.len()
    );
    Ok((Resolution { assignments, warnings }, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Sample;
    use crate::pipeline::decision::AbortOnAsk;
    use crate::shared::{NoteName, TagSource};
    use std::cell::RefCell;
    use Symbol::*;

    fn bucket_set(spec: Vec<(Symbol, Vec<&str>)>) -> Buckets {
        Buckets::from_samples(
            spec.into_iter()
                .flat_map(|(sym, names)| names.into_iter().map(move |n| Sample::new(n, sym, TagSource::Filename))),
        )
    }

    fn request(tokens: &[Symbol], required: usize, selection: SelectionPolicy) -> ResolveRequest<'_> {
        ResolveRequest {
            tokens,
            required,
            selection,
            length: LengthPolicy::Pad,
            missing: MissingPolicy::Skip,
            seed: None,
            base: NoteId::new(NoteName::C, 3),
        }
    }

    fn picked(resolution: &Resolution) -> Vec<String> {
        resolution
            .assignments
            .iter()
            .map(|a| a.sample.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "-".into()))
            .collect()
    }

    #[test]
    fn pad_always_yields_the_required_length() {
        let tokens = [A, E, I];
        for required in 0..20 {
            for len in 1..=tokens.len() {
                let out = adjust_length(&tokens[..len], required, LengthPolicy::Pad).unwrap();
                assert_eq!(out.len(), required);
                for (i, t) in out.iter().enumerate() {
                    assert_eq!(*t, tokens[i % len]);
                }
            }
        }
    }

    #[test]
    fn truncate_cuts_long_lists_and_rejects_short_ones() {
        assert_eq!(adjust_length(&[A, E, I, O], 2, LengthPolicy::Truncate).unwrap(), vec![A, E]);
        let err = adjust_length(&[A, E], 3, LengthPolicy::Truncate).unwrap_err();
        assert_eq!(err.code(), "length_mismatch");
    }

    #[test]
    fn error_policy_demands_an_exact_match() {
        assert_eq!(adjust_length(&[A, E], 2, LengthPolicy::Error).unwrap(), vec![A, E]);
        assert!(adjust_length(&[A, E], 1, LengthPolicy::Error).is_err());
        assert!(adjust_length(&[A, E], 3, LengthPolicy::Error).is_err());
        assert!(matches!(adjust_length(&[], 3, LengthPolicy::Pad), Err(ResolveError::EmptyTokens)));
    }

    #[test]
    fn cycle_round_robins_each_symbol_independently() {
        let buckets = bucket_set(vec![(A, vec!["a1", "a2"]), (E, vec!["e1"])]);
        let out = resolve(&request(&[A, E, A], 5, SelectionPolicy::Cycle), &buckets, &AbortOnAsk).unwrap();
        assert_eq!(picked(&out), vec!["a1", "e1", "a2", "a1", "e1"]);
    }

    #[test]
    fn cycle_ith_occurrence_is_bucket_i_mod_k() {
        let buckets = bucket_set(vec![(O, vec!["o1", "o2", "o3"]), (U, vec!["u1", "u2"])]);
        let tokens = [O, U, O, O, U, O, U, U, O];
        let out = resolve(&request(&tokens, 30, SelectionPolicy::Cycle), &buckets, &AbortOnAsk).unwrap();
        let mut seen: HashMap<Symbol, usize> = HashMap::new();
        for a in &out.assignments {
            let sym = a.token.unwrap();
            let i = seen.entry(sym).or_insert(0);
            let bucket = buckets.get(sym);
            assert_eq!(a.sample.as_ref().unwrap(), &bucket[*i % bucket.len()].path);
            *i += 1;
        }
    }

    #[test]
    fn context_cursors_survive_the_run() {
        let buckets = bucket_set(vec![(A, vec!["a1", "a2"])]);
        let req = request(&[A], 3, SelectionPolicy::Cycle);
        let (first, ctx) = resolve_with(ResolverContext::new(None), &req, &buckets, &AbortOnAsk).unwrap();
        assert_eq!(ctx.cursor(A), 3);
        assert_eq!(picked(&first), vec!["a1", "a2", "a1"]);
        // continuing with the same context picks up where it left off
        let (second, _) = resolve_with(ctx, &req, &buckets, &AbortOnAsk).unwrap();
        assert_eq!(picked(&second), vec!["a2", "a1", "a2"]);
    }

    #[test]
    fn first_always_takes_the_head() {
        let buckets = bucket_set(vec![(A, vec!["a1", "a2"]), (E, vec!["e1"])]);
        let out = resolve(&request(&[A, A, E], 3, SelectionPolicy::First), &buckets, &AbortOnAsk).unwrap();
        assert_eq!(picked(&out), vec!["a1", "a1", "e1"]);
    }

    #[test]
    fn seeded_random_is_reproducible() {
        let names: Vec<String> = (0..10).map(|i| format!("a{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let buckets = bucket_set(vec![(A, refs)]);
        let mut req = request(&[A], 40, SelectionPolicy::Random);
        req.seed = Some(7);
        let one = resolve(&req, &buckets, &AbortOnAsk).unwrap();
        let two = resolve(&req, &buckets, &AbortOnAsk).unwrap();
        assert_eq!(one, two);

        req.seed = Some(8);
        let other = resolve(&req, &buckets, &AbortOnAsk).unwrap();
        assert_ne!(picked(&one), picked(&other));
    }

    #[test]
    fn unseeded_random_stays_inside_the_bucket() {
        let buckets = bucket_set(vec![(A, vec!["a1", "a2", "a3"])]);
        let out = resolve(&request(&[A], 50, SelectionPolicy::Random), &buckets, &AbortOnAsk).unwrap();
        assert!(picked(&out).iter().all(|p| ["a1", "a2", "a3"].contains(&p.as_str())));
    }

    #[test]
    fn skip_marks_every_missing_position() {
        let buckets = bucket_set(vec![(A, vec!["a1"])]);
        let out = resolve(&request(&[A, U, A, U], 6, SelectionPolicy::First), &buckets, &AbortOnAsk).unwrap();
        assert_eq!(out.assignments.len(), 6);
        let skipped: Vec<usize> = out.skipped().map(|a| a.position).collect();
        assert_eq!(skipped, vec![1, 3, 5]);
        assert!(out.skipped().all(|a| a.skip == Some(SkipReason::MissingSymbol)));
        assert_eq!(out.warnings.iter().filter(|w| matches!(w, Warning::Skipped { .. })).count(), 3);
    }

    #[test]
    fn error_policy_aborts_on_missing_symbol() {
        let buckets = bucket_set(vec![(A, vec!["a1"])]);
        let mut req = request(&[A, E], 2, SelectionPolicy::First);
        req.missing = MissingPolicy::Error;
        match resolve(&req, &buckets, &AbortOnAsk) {
            Err(ResolveError::MissingSymbol { symbol: E, position: 1 }) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ask_policy_defers_to_the_decider() {
        let buckets = bucket_set(vec![(A, vec!["a1"])]);
        let mut req = request(&[A, E, I], 3, SelectionPolicy::First);
        req.missing = MissingPolicy::Ask;

        let asked = RefCell::new(Vec::new());
        let skip_all = |symbol: Symbol, position: usize| {
            asked.borrow_mut().push((symbol, position));
            Decision::Skip
        };
        let out = resolve(&req, &buckets, &skip_all).unwrap();
        assert_eq!(out.skipped().count(), 2);
        assert_eq!(*asked.borrow(), vec![(E, 1), (I, 2)]);

        let err = resolve(&req, &buckets, &AbortOnAsk).unwrap_err();
        assert_eq!(err.code(), "aborted");
    }

    #[test]
    fn notes_climb_one_semitone_per_position() {
        let buckets = bucket_set(vec![(A, vec!["a1"])]);
        let out = resolve(&request(&[A], 13, SelectionPolicy::First), &buckets, &AbortOnAsk).unwrap();
        assert_eq!(out.assignments[0].note.label(), "C3");
        assert_eq!(out.assignments[12].note.label(), "C4");
        assert_eq!(out.assignments[12].semitone(), 12);
    }

    #[test]
    fn scan_conflicts_come_back_as_warnings() {
        let mut buckets = bucket_set(vec![(E, vec!["A/x__E.wav"])]);
        buckets.record_conflict(SymbolConflict {
            path: "A/x__E.wav".into(),
            filename_symbol: E,
            folder_symbol: A,
        });
        let out = resolve(&request(&[E], 2, SelectionPolicy::First), &buckets, &AbortOnAsk).unwrap();
        assert_eq!(out.warnings.iter().filter(|w| matches!(w, Warning::Conflict(_))).count(), 1);
    }

    #[test]
    fn parallel_resolutions_match_their_solo_runs() {
        let names: Vec<String> = (0..6).map(|i| format!("a{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let buckets = bucket_set(vec![(A, refs), (E, vec!["e1", "e2", "e3"])]);
        let tokens = [A, E, A, A, E];

        let requests: Vec<ResolveRequest<'_>> = (0..8u64)
            .map(|n| {
                let selection = if n % 2 == 0 { SelectionPolicy::Cycle } else { SelectionPolicy::Random };
                let mut req = request(&tokens, 30, selection);
                req.seed = Some(n);
                req
            })
            .collect();
        let solo: Vec<Resolution> = requests.iter().map(|r| resolve(r, &buckets, &AbortOnAsk).unwrap()).collect();

        let shared = &buckets;
        let parallel: Vec<Resolution> = std::thread::scope(|scope| {
            let workers: Vec<_> = requests
                .iter()
                .map(|req| scope.spawn(move || resolve(req, shared, &AbortOnAsk).unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        assert_eq!(parallel, solo);
    }
}
