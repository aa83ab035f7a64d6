//! The value generator handed to every harness.

use std::any::{type_name, TypeId};
use std::collections::{HashMap, VecDeque};
use std::path::Path;

use ramfuzz_range::{RangeError, RangeTracker};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace, warn};

use crate::config::RuntimeConfig;
use crate::log::{control_path, read_control, LogReader, LogWriter, SkipRange};
use crate::oracle::{self, Channel};
use crate::scalar::Scalar;
use crate::RuntimeError;

/// Where values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Local random engine.
    Generate,
    /// A previous run's log, except for regions its control file names.
    Replay,
    /// An external oracle.
    Oracle,
}

enum Source {
    Random,
    Replay {
        input: LogReader,
        skips: VecDeque<SkipRange>,
    },
    Oracle(Box<dyn Channel>),
}

/// An open region. Must be passed back to [`Gen::end_region`].
#[derive(Debug)]
#[must_use]
pub struct Region {
    id: u64,
}

impl Region {
    pub fn id(&self) -> u64 {
        self.id
    }
}

struct OpenRegion {
    id: u64,
    /// Input offset to resume replay at, when this region is regenerated.
    resume_at: Option<u64>,
}

/// Produces, logs and replays values.
///
/// Every value is logged with its value id, whatever its source. Regions
/// bracket spans of values that a replay may regenerate as a unit while
/// replaying the rest verbatim.
pub struct Gen {
    config: RuntimeConfig,
    rng: ChaCha8Rng,
    source: Source,
    log: LogWriter,
    /// Region ids are shared with single-value regions.
    next_region: u64,
    open: Vec<OpenRegion>,
    /// Call depth per harness type.
    depths: HashMap<TypeId, u32>,
    tracker: RangeTracker,
}

fn seeded(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

impl Gen {
    /// Random values, logged to `olog` with its index in `olog.i`.
    pub fn generate(olog: impl AsRef<Path>, config: RuntimeConfig) -> Result<Self, RuntimeError> {
        Self::new(Source::Random, olog.as_ref(), config)
    }

    /// Values replayed from `ilog`, regenerating the regions `ilog.c` names,
    /// and logged again to `olog`.
    pub fn replay(
        ilog: impl AsRef<Path>,
        olog: impl AsRef<Path>,
        config: RuntimeConfig,
    ) -> Result<Self, RuntimeError> {
        let ilog = ilog.as_ref();
        let input = LogReader::open(ilog)?;
        let skips = read_control(&control_path(ilog))?;
        debug!(input = %ilog.display(), regenerated = skips.len(), "replaying");
        let source = Source::Replay {
            input,
            skips: skips.into(),
        };
        Self::new(source, olog.as_ref(), config)
    }

    /// Values requested from an oracle over `channel`, logged to `olog`.
    pub fn with_oracle(
        channel: impl Channel + 'static,
        olog: impl AsRef<Path>,
        config: RuntimeConfig,
    ) -> Result<Self, RuntimeError> {
        Self::new(Source::Oracle(Box::new(channel)), olog.as_ref(), config)
    }

    fn new(source: Source, olog: &Path, config: RuntimeConfig) -> Result<Self, RuntimeError> {
        Ok(Self {
            rng: seeded(config.seed),
            config,
            source,
            log: LogWriter::create(olog)?,
            next_region: 0,
            open: Vec::new(),
            depths: HashMap::new(),
            tracker: RangeTracker::new(),
        })
    }

    pub fn mode(&self) -> Mode {
        match self.source {
            Source::Random => Mode::Generate,
            Source::Replay { .. } => Mode::Replay,
            Source::Oracle(_) => Mode::Oracle,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    // ── Values ───────────────────────────────────────────────────────

    /// A value in `[lo, hi]`, logged as a region of its own.
    pub fn between<T: Scalar>(&mut self, lo: T, hi: T, valueid: u64) -> Result<T, RuntimeError> {
        let value = self.produce(lo, hi, valueid)?;
        let id = self.next_region;
        self.next_region += 1;
        self.log.mark_value(id)?;
        Ok(value)
    }

    /// A value in `[lo, hi]` tied to `region`: a replay can only change it by
    /// regenerating the whole region.
    pub fn between_in<T: Scalar>(
        &mut self,
        region: &Region,
        lo: T,
        hi: T,
        valueid: u64,
    ) -> Result<T, RuntimeError> {
        debug_assert!(self.open.iter().any(|r| r.id == region.id));
        self.produce(lo, hi, valueid)
    }

    /// Any value of `T`.
    pub fn any<T: Scalar>(&mut self, valueid: u64) -> Result<T, RuntimeError> {
        self.between(T::MIN, T::MAX, valueid)
    }

    /// True with probability `p`.
    pub fn coin(&mut self, p: f64, valueid: u64) -> Result<bool, RuntimeError> {
        Ok(self.between(0.0f64, 1.0, valueid)? < p)
    }

    fn produce<T: Scalar>(&mut self, lo: T, hi: T, valueid: u64) -> Result<T, RuntimeError> {
        if !(lo <= hi) {
            return Err(RuntimeError::Protocol(format!(
                "empty range [{lo:?}, {hi:?}] for value {valueid}"
            )));
        }
        let regenerating = self.regenerating();
        let value = match &mut self.source {
            Source::Random => T::sample(lo, hi, &mut self.rng),
            Source::Replay { .. } if regenerating => T::sample(lo, hi, &mut self.rng),
            Source::Replay { input, .. } => input.read::<T>()?.0,
            Source::Oracle(channel) => {
                let wide = oracle::request_value(channel.as_mut(), valueid, lo.widen(), hi.widen())?;
                match T::narrow(wide) {
                    Some(v) if lo <= v && v <= hi => v,
                    _ => {
                        return Err(RuntimeError::Protocol(format!(
                            "oracle answered {wide:?} for [{lo:?}, {hi:?}] (tag {})",
                            T::TAG
                        )))
                    }
                }
            }
        };
        self.log.record(value, valueid)?;
        trace!(valueid, ?value, "value");
        Ok(value)
    }

    // ── Regions ──────────────────────────────────────────────────────

    fn regenerating(&self) -> bool {
        self.open.iter().any(|r| r.resume_at.is_some())
    }

    /// Opens a region. During replay, a region starting where a control
    /// entry starts is regenerated, and replay resumes at the entry's end.
    pub fn begin_region(&mut self) -> Result<Region, RuntimeError> {
        let id = self.next_region;
        self.next_region += 1;
        self.log.begin_region(id)?;

        let mut resume_at = None;
        let regenerating = self.regenerating();
        if let Source::Replay { input, skips } = &mut self.source {
            let offset = input.offset();
            while skips.front().is_some_and(|s| s.start < offset) {
                skips.pop_front();
            }
            if !regenerating && skips.front().is_some_and(|s| s.start == offset) {
                resume_at = skips.pop_front().map(|s| s.end);
                debug!(region = id, offset, "regenerating region");
            }
        }
        self.open.push(OpenRegion { id, resume_at });
        Ok(Region { id })
    }

    /// Closes the innermost region, which must be `region`.
    pub fn end_region(&mut self, region: Region) -> Result<(), RuntimeError> {
        match self.open.pop() {
            Some(open) if open.id == region.id => {
                self.log.end_region(region.id)?;
                if let (Some(end), Source::Replay { input, .. }) = (open.resume_at, &mut self.source) {
                    input.seek(end)?;
                }
                Ok(())
            }
            Some(open) => {
                self.open.push(open);
                Err(RuntimeError::Protocol(format!(
                    "region {} closed out of order",
                    region.id
                )))
            }
            None => Err(RuntimeError::Protocol(format!(
                "region {} closed twice",
                region.id
            ))),
        }
    }

    // ── Call depth ───────────────────────────────────────────────────

    /// Runs `f` one call deeper in harness `H`. `f` is told whether the depth
    /// limit is breached, in which case it must not recurse further.
    pub fn with_depth<H: 'static, R>(&mut self, f: impl FnOnce(&mut Self, bool) -> R) -> R {
        let key = TypeId::of::<H>();
        let depth = {
            let d = self.depths.entry(key).or_insert(0);
            *d += 1;
            *d
        };
        let breached = depth > self.config.depth_limit;
        if breached {
            debug!(harness = type_name::<H>(), depth, "depth limit reached");
        }
        let result = f(self, breached);
        if let Some(d) = self.depths.get_mut(&key) {
            *d = d.saturating_sub(1);
        }
        result
    }

    /// Current call depth in harness `H`.
    pub fn depth<H: 'static>(&self) -> u32 {
        self.depths.get(&TypeId::of::<H>()).copied().unwrap_or(0)
    }

    // ── Constraints ──────────────────────────────────────────────────

    /// Linear constraints over value ids, consulted by
    /// [`between_constrained`](Self::between_constrained).
    pub fn constraints(&mut self) -> &mut RangeTracker {
        &mut self.tracker
    }

    /// Like [`between`](Self::between), with `[lo, hi]` narrowed to what the
    /// constraints on `valueid` allow. The value is then fixed in the
    /// remaining constraints.
    pub fn between_constrained<T: Scalar>(
        &mut self,
        lo: T,
        hi: T,
        valueid: u64,
    ) -> Result<T, RuntimeError> {
        let var = valueid as usize;
        let (blo, bhi) = self.tracker.bounds(var)?;
        let (blo, bhi) = if T::INTEGRAL {
            (blo.ceil(), bhi.floor())
        } else {
            (blo, bhi)
        };
        let nlo = if blo > lo.to_f64() { T::from_f64(blo) } else { lo };
        let nhi = if bhi < hi.to_f64() { T::from_f64(bhi) } else { hi };
        if !(nlo <= nhi) {
            return Err(RangeError::Infeasible {
                var,
                lo: nlo.to_f64(),
                hi: nhi.to_f64(),
            }
            .into());
        }
        let value = self.between(nlo, nhi, valueid)?;
        self.tracker.fix(var, value.to_f64())?;
        Ok(value)
    }

    // ── Termination ──────────────────────────────────────────────────

    /// Flushes the log and, with an oracle, reports how the run ended.
    pub fn finish(mut self, success: bool) -> Result<(), RuntimeError> {
        if !self.open.is_empty() {
            warn!(open = self.open.len(), "finishing with open regions");
        }
        self.log.flush()?;
        if let Source::Oracle(channel) = &mut self.source {
            oracle::notify_termination(channel.as_mut(), success)?;
        }
        debug!(success, logged = self.log.offset(), "run finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramfuzz_range::{LinearCombination, LinearInequality};

    fn seeded_gen(dir: &tempfile::TempDir) -> Gen {
        let config = RuntimeConfig {
            seed: Some(42),
            ..Default::default()
        };
        Gen::generate(dir.path().join("log"), config).unwrap()
    }

    #[test]
    fn test_between_in_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = seeded_gen(&dir);
        assert_eq!(g.mode(), Mode::Generate);
        for i in 0..100 {
            let v = g.between(-10i32, 10, i).unwrap();
            assert!((-10..=10).contains(&v));
        }
        assert_eq!(g.between(3u8, 3, 0).unwrap(), 3);
    }

    #[test]
    fn test_empty_range_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = seeded_gen(&dir);
        assert!(matches!(g.between(5i32, 4, 0), Err(RuntimeError::Protocol(_))));
        assert!(g.between(f64::NAN, 1.0, 0).is_err());
    }

    #[test]
    fn test_regions_close_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = seeded_gen(&dir);
        let outer = g.begin_region().unwrap();
        let inner = g.begin_region().unwrap();
        let outer_id = outer.id();
        assert!(g.end_region(outer).is_err());
        g.end_region(inner).unwrap();
        g.end_region(Region { id: outer_id }).unwrap();
        g.finish(true).unwrap();
        let index = std::fs::read_to_string(dir.path().join("log.i")).unwrap();
        assert_eq!(index, "0{0\n1{0\n1}0\n0}0\n");
    }

    #[test]
    fn test_depth_counts_per_harness() {
        struct A;
        struct B;
        let dir = tempfile::tempdir().unwrap();
        let mut g = seeded_gen(&dir);
        let limit = g.config().depth_limit;
        fn recurse(g: &mut Gen, levels: &mut u32) {
            g.with_depth::<A, _>(|g, breached| {
                if !breached {
                    *levels += 1;
                    recurse(g, levels);
                }
            })
        }
        let mut levels = 0;
        g.with_depth::<B, _>(|g, _| recurse(g, &mut levels));
        assert_eq!(levels, limit);
        assert_eq!(g.depth::<A>(), 0);
        assert_eq!(g.depth::<B>(), 0);
    }

    #[test]
    fn test_constrained_sampling() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = seeded_gen(&dir);
        // v1 >= 100, v2 - v1 >= 0
        g.constraints().narrow(1, 100.0, f64::MAX);
        g.constraints().add(LinearInequality::new(
            LinearCombination::term(2, 1.0).with_term(1, -1.0),
        ));
        let a: i32 = g.between_constrained(0, 1000, 1).unwrap();
        assert!((100..=1000).contains(&a));
        let b: i32 = g.between_constrained(0, 1000, 2).unwrap();
        assert!(b >= a);
    }

    #[test]
    fn test_infeasible_constraint() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = seeded_gen(&dir);
        g.constraints().narrow(1, 50.0, 60.0);
        let err = g.between_constrained(0u8, 10, 1).unwrap_err();
        assert!(matches!(err, RuntimeError::Range(RangeError::Infeasible { var: 1, .. })));
    }
}
