//! Hash policy resolver.
//!
//! A table hashes keys through a [`KeyHasher`], which is either resolved
//! from a `(key width, policy)` pair or supplied directly by the caller
//! (the "custom" policy — it bypasses resolution entirely). Resolution
//! dispatches on the key's byte width so each integer family gets a hash
//! function specialized for its bit count; width validation is the
//! resolver's job, and anything other than 1/2/4/8 bytes or the string
//! sentinel is rejected up front.
//!
//! Tier choices (the policy names are contract, the algorithms are this
//! crate's documented decisions):
//! - `Simple`: XOR-fold — value XOR (value >> half its bit width); strings
//!   fold byte-wise into a running word before the final fold.
//! - `Robust`: golden-ratio multiply with an xor-shift finalizer for the
//!   integer widths; FNV-1a for strings.
//! - `Secure`: keyed SipHash via `std`'s `RandomState`, one instance per
//!   resolution, so every structure sharing the resolved hasher (clones,
//!   copies) hashes identically while distinct resolutions do not.

use crate::errors::Error;
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::rc::Rc;
use std::sync::Arc;

/// Byte width of a key as seen by the resolver. `Str` is the sentinel for
/// length-delimited byte-string keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWidth {
    Fixed(usize),
    Str,
}

/// Hashing policy tier. Callers wanting full control construct a
/// [`KeyHasher::custom`] instead of picking a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashPolicy {
    Simple,
    Robust,
    Secure,
}

/// A key's presentation to the resolved hash function: fixed-width keys
/// widen to `u64`, string keys expose their bytes.
#[derive(Debug, Clone, Copy)]
pub enum Repr<'a> {
    Fixed(u64),
    Bytes(&'a [u8]),
}

/// How a key type presents itself to the policy layer.
///
/// Provided for the integer families (1/2/4/8 bytes; `usize`/`isize` cover
/// pointer-width keys) and for string types. Implementations with widths
/// outside the supported set are legal to write; [`resolve`] rejects them
/// with `InvalidArgument`.
pub trait KeyRepr {
    fn width() -> KeyWidth;
    fn repr(&self) -> Repr<'_>;
}

macro_rules! fixed_repr {
    ($($t:ty => $w:expr),* $(,)?) => {$(
        impl KeyRepr for $t {
            fn width() -> KeyWidth {
                KeyWidth::Fixed($w)
            }
            fn repr(&self) -> Repr<'_> {
                Repr::Fixed(*self as u64)
            }
        }
    )*};
}

fixed_repr!(
    u8 => 1, u16 => 2, u32 => 4, u64 => 8,
    i8 => 1, i16 => 2, i32 => 4, i64 => 8,
    usize => core::mem::size_of::<usize>(),
    isize => core::mem::size_of::<isize>(),
);

impl KeyRepr for str {
    fn width() -> KeyWidth {
        KeyWidth::Str
    }
    fn repr(&self) -> Repr<'_> {
        Repr::Bytes(self.as_bytes())
    }
}

impl KeyRepr for String {
    fn width() -> KeyWidth {
        KeyWidth::Str
    }
    fn repr(&self) -> Repr<'_> {
        Repr::Bytes(self.as_bytes())
    }
}

macro_rules! deref_repr {
    ($($outer:ty),* $(,)?) => {$(
        impl<K: KeyRepr + ?Sized> KeyRepr for $outer {
            fn width() -> KeyWidth {
                K::width()
            }
            fn repr(&self) -> Repr<'_> {
                (**self).repr()
            }
        }
    )*};
}

deref_repr!(&K, Rc<K>, Arc<K>, Box<K>);

// Width-specialized XOR-folds. Each truncates to its own width first so the
// sign-extension of negative signed keys cannot bleed across families.
fn simple_w1(v: u64) -> u64 {
    let x = v as u8;
    u64::from(x ^ (x >> 4))
}

fn simple_w2(v: u64) -> u64 {
    let x = v as u16;
    u64::from(x ^ (x >> 8))
}

fn simple_w4(v: u64) -> u64 {
    let x = v as u32;
    u64::from(x ^ (x >> 16))
}

fn simple_w8(v: u64) -> u64 {
    v ^ (v >> 32)
}

fn simple_str(bytes: &[u8]) -> u64 {
    let mut acc = 0u64;
    for &b in bytes {
        acc = acc.rotate_left(8) ^ u64::from(b);
    }
    simple_w8(acc)
}

// 2^64 / golden ratio.
const GOLDEN: u64 = 0x9e37_79b9_7f4a_7c15;

fn robust_mix(v: u64) -> u64 {
    let mut h = v.wrapping_mul(GOLDEN);
    h ^= h >> 32;
    h
}

fn robust_w1(v: u64) -> u64 {
    robust_mix(u64::from(v as u8))
}

fn robust_w2(v: u64) -> u64 {
    robust_mix(u64::from(v as u16))
}

fn robust_w4(v: u64) -> u64 {
    robust_mix(u64::from(v as u32))
}

fn robust_w8(v: u64) -> u64 {
    robust_mix(v)
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn robust_str(bytes: &[u8]) -> u64 {
    let mut h = FNV_OFFSET;
    for &b in bytes {
        h ^= u64::from(b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// A concrete hash function family selected by [`resolve`].
#[derive(Clone)]
pub enum ResolvedHash {
    Fixed(fn(u64) -> u64),
    Bytes(fn(&[u8]) -> u64),
    Keyed(RandomState),
}

impl ResolvedHash {
    /// Total over every representation: a fixed-width function receiving
    /// bytes folds them into a word first, and a byte function receiving a
    /// fixed value hashes its little-endian bytes. Through [`resolve`] the
    /// representation always matches the selected family.
    pub fn apply(&self, repr: Repr<'_>) -> u64 {
        match self {
            ResolvedHash::Fixed(f) => match repr {
                Repr::Fixed(v) => f(v),
                Repr::Bytes(b) => f(simple_str(b)),
            },
            ResolvedHash::Bytes(f) => match repr {
                Repr::Fixed(v) => f(&v.to_le_bytes()),
                Repr::Bytes(b) => f(b),
            },
            ResolvedHash::Keyed(rs) => match repr {
                Repr::Fixed(v) => rs.hash_one(v),
                Repr::Bytes(b) => rs.hash_one(b),
            },
        }
    }
}

/// Select the hash function for a key width and policy. Fixed widths other
/// than 1, 2, 4, or 8 bytes fail with `InvalidArgument`.
pub fn resolve(width: KeyWidth, policy: HashPolicy) -> Result<ResolvedHash, Error> {
    let resolved = match width {
        KeyWidth::Fixed(w) => match (policy, w) {
            (HashPolicy::Simple, 1) => ResolvedHash::Fixed(simple_w1),
            (HashPolicy::Simple, 2) => ResolvedHash::Fixed(simple_w2),
            (HashPolicy::Simple, 4) => ResolvedHash::Fixed(simple_w4),
            (HashPolicy::Simple, 8) => ResolvedHash::Fixed(simple_w8),
            (HashPolicy::Robust, 1) => ResolvedHash::Fixed(robust_w1),
            (HashPolicy::Robust, 2) => ResolvedHash::Fixed(robust_w2),
            (HashPolicy::Robust, 4) => ResolvedHash::Fixed(robust_w4),
            (HashPolicy::Robust, 8) => ResolvedHash::Fixed(robust_w8),
            (HashPolicy::Secure, 1 | 2 | 4 | 8) => ResolvedHash::Keyed(RandomState::new()),
            _ => return Err(Error::InvalidArgument),
        },
        KeyWidth::Str => match policy {
            HashPolicy::Simple => ResolvedHash::Bytes(simple_str),
            HashPolicy::Robust => ResolvedHash::Bytes(robust_str),
            HashPolicy::Secure => ResolvedHash::Keyed(RandomState::new()),
        },
    };
    Ok(resolved)
}

/// Function object producing a `u64` hash from a key. Cloning shares the
/// underlying function and any captured state, so clones hash identically.
pub struct KeyHasher<K> {
    f: Rc<dyn Fn(&K) -> u64>,
}

impl<K> KeyHasher<K> {
    /// Caller-supplied hash function; bypasses the resolver. Captured state
    /// is the custom function's context.
    pub fn custom(f: impl Fn(&K) -> u64 + 'static) -> Self {
        Self { f: Rc::new(f) }
    }

    pub fn hash(&self, key: &K) -> u64 {
        (self.f)(key)
    }
}

impl<K: KeyRepr + 'static> KeyHasher<K> {
    /// Resolve a policy tier for `K`'s width.
    pub fn resolve(policy: HashPolicy) -> Result<Self, Error> {
        let resolved = resolve(K::width(), policy)?;
        Ok(Self {
            f: Rc::new(move |key: &K| resolved.apply(key.repr())),
        })
    }
}

impl<K> Clone for KeyHasher<K> {
    fn clone(&self) -> Self {
        Self { f: self.f.clone() }
    }
}

impl<K> core::fmt::Debug for KeyHasher<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("KeyHasher(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: the simple tier is the half-width XOR-fold, per width.
    #[test]
    fn simple_is_half_width_xor_fold() {
        assert_eq!(simple_w1(0xa5), u64::from(0xa5u8 ^ 0x0a));
        assert_eq!(simple_w2(0x1234), u64::from(0x1234u16 ^ 0x12));
        assert_eq!(simple_w4(0xdead_beef), u64::from(0xdead_beefu32 ^ 0xdead));
        let v = 0x0123_4567_89ab_cdefu64;
        assert_eq!(simple_w8(v), v ^ (v >> 32));
    }

    /// Invariant: widths other than 1/2/4/8 are rejected for every tier;
    /// the string sentinel is always accepted.
    #[test]
    fn resolver_validates_width() {
        for policy in [HashPolicy::Simple, HashPolicy::Robust, HashPolicy::Secure] {
            for w in [0usize, 3, 5, 7, 16] {
                assert_eq!(
                    resolve(KeyWidth::Fixed(w), policy).err(),
                    Some(Error::InvalidArgument),
                    "width {} must be rejected",
                    w
                );
            }
            for w in [1usize, 2, 4, 8] {
                assert!(resolve(KeyWidth::Fixed(w), policy).is_ok());
            }
            assert!(resolve(KeyWidth::Str, policy).is_ok());
        }
    }

    /// Invariant: resolved hashers are deterministic, and the robust tier
    /// actually separates nearby keys (the point of the finalizer).
    #[test]
    fn robust_tier_is_deterministic_and_spreads() {
        let h: KeyHasher<u64> = KeyHasher::resolve(HashPolicy::Robust).unwrap();
        assert_eq!(h.hash(&42), h.hash(&42));
        let a = h.hash(&1);
        let b = h.hash(&2);
        assert_ne!(a, b);
        // Consecutive keys should differ in high bits too, unlike the raw value.
        assert_ne!(a >> 32, b >> 32);

        let s: KeyHasher<String> = KeyHasher::resolve(HashPolicy::Robust).unwrap();
        assert_eq!(s.hash(&"abc".to_string()), s.hash(&"abc".to_string()));
        assert_ne!(s.hash(&"abc".to_string()), s.hash(&"abd".to_string()));
    }

    /// Invariant: the secure tier is keyed per resolution — clones agree,
    /// distinct resolutions (almost surely) do not.
    #[test]
    fn secure_tier_is_keyed_per_resolution() {
        let h1: KeyHasher<String> = KeyHasher::resolve(HashPolicy::Secure).unwrap();
        let h2 = h1.clone();
        let key = "payload".to_string();
        assert_eq!(h1.hash(&key), h2.hash(&key), "clones share the key");

        let other: KeyHasher<String> = KeyHasher::resolve(HashPolicy::Secure).unwrap();
        let spread = (0..16).any(|i| {
            let k = format!("k{}", i);
            h1.hash(&k) != other.hash(&k)
        });
        assert!(spread, "independent resolutions should disagree somewhere");
    }

    /// Invariant: KeyRepr widths line up with the type's byte count, and
    /// wrapper types delegate to the inner key.
    #[test]
    fn key_repr_widths_and_delegation() {
        assert_eq!(<u8 as KeyRepr>::width(), KeyWidth::Fixed(1));
        assert_eq!(<i16 as KeyRepr>::width(), KeyWidth::Fixed(2));
        assert_eq!(<u32 as KeyRepr>::width(), KeyWidth::Fixed(4));
        assert_eq!(<i64 as KeyRepr>::width(), KeyWidth::Fixed(8));
        assert_eq!(
            <usize as KeyRepr>::width(),
            KeyWidth::Fixed(core::mem::size_of::<usize>())
        );
        assert_eq!(<String as KeyRepr>::width(), KeyWidth::Str);
        assert_eq!(<Rc<str> as KeyRepr>::width(), KeyWidth::Str);
        assert_eq!(<&u32 as KeyRepr>::width(), KeyWidth::Fixed(4));

        let s: Rc<str> = Rc::from("abc");
        match s.repr() {
            Repr::Bytes(b) => assert_eq!(b, b"abc"),
            Repr::Fixed(_) => panic!("string keys present bytes"),
        }
    }

    /// Invariant: a custom hasher bypasses resolution — no width check.
    #[test]
    fn custom_hasher_bypasses_resolution() {
        // A 3-byte key type would be rejected by the resolver.
        struct Rgb([u8; 3]);
        let h: KeyHasher<Rgb> = KeyHasher::custom(|k: &Rgb| {
            u64::from(k.0[0]) << 16 | u64::from(k.0[1]) << 8 | u64::from(k.0[2])
        });
        assert_eq!(h.hash(&Rgb([1, 2, 3])), 0x010203);
    }

    /// Invariant: signed keys hash like their unsigned counterpart of the
    /// same width (truncation masks off the sign extension).
    #[test]
    fn signed_keys_truncate_to_width() {
        let hi: KeyHasher<i8> = KeyHasher::resolve(HashPolicy::Simple).unwrap();
        let hu: KeyHasher<u8> = KeyHasher::resolve(HashPolicy::Simple).unwrap();
        assert_eq!(hi.hash(&-1i8), hu.hash(&0xffu8));
    }
}
