//! Random values of whole types, built from scalar draws.

use std::ffi::CString;

use tracing::trace;

use crate::gen::Gen;
use crate::RuntimeError;

/// Types `Gen` can build from nothing but random draws. Classes under test
/// go through [`make_object`](crate::make_object) instead.
pub trait Make: Sized {
    fn make(g: &mut Gen, valueid: u64) -> Result<Self, RuntimeError>;
}

macro_rules! make_any {
    ($($t:ty),*) => {
        $(
            impl Make for $t {
                fn make(g: &mut Gen, valueid: u64) -> Result<Self, RuntimeError> {
                    g.any(valueid)
                }
            }
        )*
    };
}

make_any!(bool, i8, u8, i16, u16, i32, u32, i64, f32, f64);

impl Make for u64 {
    /// Capped at `wide_unsigned_cap`, since callers size allocations by it.
    fn make(g: &mut Gen, valueid: u64) -> Result<Self, RuntimeError> {
        let cap = g.config().wide_unsigned_cap;
        g.between(0, cap, valueid)
    }
}

/// The pointer case: a fresh pointee.
impl<T: Make> Make for Box<T> {
    fn make(g: &mut Gen, valueid: u64) -> Result<Self, RuntimeError> {
        T::make(g, valueid).map(Box::new)
    }
}

/// Length and elements form one region.
impl<T: Make> Make for Vec<T> {
    fn make(g: &mut Gen, valueid: u64) -> Result<Self, RuntimeError> {
        let max = g.config().max_collection_len;
        let region = g.begin_region()?;
        let len = g.between_in(&region, 0u32, max, valueid)?;
        let mut items = Vec::with_capacity(len as usize);
        for _ in 0..len {
            items.push(T::make(g, valueid)?);
        }
        g.end_region(region)?;
        Ok(items)
    }
}

/// Printable ASCII.
impl Make for String {
    fn make(g: &mut Gen, valueid: u64) -> Result<Self, RuntimeError> {
        let max = g.config().max_cstring_len;
        let bytes = random_bytes(g, valueid, max, b' ', b'~')?;
        Ok(bytes.into_iter().map(char::from).collect())
    }
}

/// The `char *` case: a NUL-terminated run of non-NUL bytes.
impl Make for CString {
    fn make(g: &mut Gen, valueid: u64) -> Result<Self, RuntimeError> {
        let max = g.config().max_cstring_len;
        let bytes = random_bytes(g, valueid, max, 1, u8::MAX)?;
        CString::new(bytes).map_err(|e| RuntimeError::Protocol(e.to_string()))
    }
}

/// Placeholder storage for a `void` pointee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoidBuffer(pub Vec<u8>);

impl Make for VoidBuffer {
    fn make(g: &mut Gen, valueid: u64) -> Result<Self, RuntimeError> {
        let max = g.config().max_void_buffer;
        let len = g.between(1u32, max.max(1), valueid)?;
        Ok(VoidBuffer(vec![0; len as usize]))
    }
}

fn random_bytes(
    g: &mut Gen,
    valueid: u64,
    max_len: u32,
    lo: u8,
    hi: u8,
) -> Result<Vec<u8>, RuntimeError> {
    let region = g.begin_region()?;
    let len = g.between_in(&region, 0u32, max_len, valueid)?;
    let mut bytes = Vec::with_capacity(len as usize);
    for _ in 0..len {
        bytes.push(g.between_in(&region, lo, hi, valueid)?);
    }
    g.end_region(region)?;
    Ok(bytes)
}

/// One of `variants`, uniformly.
pub fn make_enum<E: Copy>(g: &mut Gen, variants: &[E], valueid: u64) -> Result<E, RuntimeError> {
    let Some(last) = variants.len().checked_sub(1) else {
        return Err(RuntimeError::Protocol("enum without enumerators".to_string()));
    };
    let k = g.between(0u32, last as u32, valueid)?;
    Ok(variants[k as usize])
}

/// Function values are not generated; the result is always None.
pub fn make_function<F>(_g: &mut Gen, valueid: u64) -> Option<F> {
    trace!(valueid, "function value requested; yielding none");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RuntimeConfig;

    fn small_gen(dir: &tempfile::TempDir) -> Gen {
        let config = RuntimeConfig {
            seed: Some(11),
            max_collection_len: 8,
            max_cstring_len: 16,
            max_void_buffer: 4,
            wide_unsigned_cap: 100,
            ..Default::default()
        };
        Gen::generate(dir.path().join("log"), config).unwrap()
    }

    #[test]
    fn test_collections_respect_caps() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = small_gen(&dir);
        for _ in 0..20 {
            let v: Vec<u16> = Vec::make(&mut g, 0).unwrap();
            assert!(v.len() <= 8);
            let s = String::make(&mut g, 1).unwrap();
            assert!(s.len() <= 16);
            assert!(s.bytes().all(|b| (b' '..=b'~').contains(&b)));
            let c = CString::make(&mut g, 2).unwrap();
            assert!(c.as_bytes().len() <= 16);
            let buf = VoidBuffer::make(&mut g, 3).unwrap();
            assert!((1..=4).contains(&buf.0.len()));
            assert!(u64::make(&mut g, 4).unwrap() <= 100);
        }
    }

    #[test]
    fn test_enums_and_functions() {
        #[derive(Debug, Clone, Copy, PartialEq)]
        enum Color {
            Red,
            Green,
        }
        let dir = tempfile::tempdir().unwrap();
        let mut g = small_gen(&dir);
        let c = make_enum(&mut g, &[Color::Red, Color::Green], 0).unwrap();
        assert!(c == Color::Red || c == Color::Green);
        assert!(make_enum::<Color>(&mut g, &[], 0).is_err());
        assert!(make_function::<fn(i32) -> i32>(&mut g, 1).is_none());
    }

    #[test]
    fn test_boxed_pointee() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = small_gen(&dir);
        let b: Box<Box<i8>> = Make::make(&mut g, 0).unwrap();
        let _ = **b;
    }
}
