//! Driving objects under test through random constructors and methods.

use tracing::trace;

use crate::gen::{Gen, Region};
use crate::RuntimeError;

/// Value ids of the runtime's own choices. Generated call sites number
/// theirs from zero, so these sit at the top of the range.
pub const CTOR_CHOICE: u64 = u64::MAX;
pub const SPIN_COUNT: u64 = u64::MAX - 1;
pub const METHOD_CHOICE: u64 = u64::MAX - 2;
pub const SUBCLASS_COIN: u64 = u64::MAX - 3;
pub const SUBCLASS_CHOICE: u64 = u64::MAX - 4;

/// Builds an object, or None when no constructor may run (depth limit
/// breached with no safe constructor).
pub type Ctor<H> = fn(&mut Gen) -> Result<Option<<H as Harness>::Target>, RuntimeError>;

/// Calls one method of the object under test with random arguments.
pub type Method<H> = fn(&mut H, &mut Gen) -> Result<(), RuntimeError>;

/// Builds one public subclass, upcast to the harnessed type.
pub type Submaker<H> = Ctor<H>;

/// A wrapper exercising one type under test.
///
/// Constructors and methods are numbered roulettes. A constructor that may
/// recurse into other harnesses wraps its body in [`Gen::with_depth`] and,
/// once the limit is breached, falls back to a constructor that cannot
/// recurse (or returns None); methods simply return.
pub trait Harness: Sized + 'static {
    type Target: 'static;

    const CROULETTE: &'static [fn(&mut Gen) -> Result<Option<Self::Target>, RuntimeError>];
    const MROULETTE: &'static [fn(&mut Self, &mut Gen) -> Result<(), RuntimeError>];
    /// Direct public subclasses.
    const SUBMAKERS: &'static [fn(&mut Gen) -> Result<Option<Self::Target>, RuntimeError>] = &[];

    /// Harnesses an object built elsewhere.
    fn wrap(obj: Self::Target) -> Self;

    fn into_target(self) -> Self::Target;
}

/// Picks an index into a roulette of `len` entries.
fn spin(g: &mut Gen, len: usize, valueid: u64) -> Result<usize, RuntimeError> {
    let last = u32::try_from(len - 1)
        .map_err(|_| RuntimeError::Protocol(format!("roulette of {len} entries")))?;
    Ok(g.between(0u32, last, valueid)? as usize)
}

/// Builds an `H` with a random constructor, then calls up to `spin_limit`
/// random methods on it, all in one region.
pub fn spin_roulette<H: Harness>(g: &mut Gen) -> Result<Option<H>, RuntimeError> {
    let region = g.begin_region()?;
    let harness = construct_and_spin::<H>(g, &region)?;
    g.end_region(region)?;
    Ok(harness)
}

fn construct_and_spin<H: Harness>(g: &mut Gen, region: &Region) -> Result<Option<H>, RuntimeError> {
    if H::CROULETTE.is_empty() {
        return Ok(None);
    }
    let ctr = spin(g, H::CROULETTE.len(), CTOR_CHOICE)?;
    let Some(obj) = (H::CROULETTE[ctr])(g)? else {
        trace!(harness = std::any::type_name::<H>(), ctr, "constructor yielded nothing");
        return Ok(None);
    };
    let mut harness = H::wrap(obj);
    if !H::MROULETTE.is_empty() {
        let limit = g.config().spin_limit;
        let spins = g.between_in(region, 0u32, limit, SPIN_COUNT)?;
        for _ in 0..spins {
            let m = spin(g, H::MROULETTE.len(), METHOD_CHOICE)?;
            (H::MROULETTE[m])(&mut harness, g)?;
        }
    }
    Ok(Some(harness))
}

/// A random object of type `H::Target`. With `allow_subclass`, a coin flip
/// may hand the job to a random subclass's submaker.
pub fn make_object<H: Harness>(g: &mut Gen, allow_subclass: bool) -> Result<Option<H::Target>, RuntimeError> {
    if allow_subclass && !H::SUBMAKERS.is_empty() {
        let p = g.config().subclass_probability;
        if g.coin(p, SUBCLASS_COIN)? {
            let k = spin(g, H::SUBMAKERS.len(), SUBCLASS_CHOICE)?;
            return (H::SUBMAKERS[k])(g);
        }
    }
    Ok(spin_roulette::<H>(g)?.map(H::into_target))
}
