//! The Fingerprint primitive: an immutable f-bit integer with a
//! Hamming-distance operator, built by feature-weighted bit voting.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::hash::{FingerprintHash, Md5Hash};
use crate::tokenize::{IdfWeights, Tokenize};

/// `f` is backed by `u128` rather than a bignum, so it tops out here.
/// Covers every fingerprint width actually used in practice (64 and 128
/// bit SimHash are the common cases); wider corpora should shard across
/// multiple indexes instead.
pub const MAX_F: u32 = 128;

/// The six construction shapes the reference implementation accepted
/// through runtime type checks, re-architected as a tagged enum so an
/// invalid shape is a compile error rather than a `BadInput` at runtime.
#[derive(Debug, Clone)]
pub enum FeatureInput {
    /// A raw fingerprint value, taken verbatim (masked to `f` bits).
    Integer(u128),
    /// Free text, tokenized and TF*IDF-weighted by the caller-supplied
    /// collaborators before folding into bits.
    Text(String),
    /// Bare tokens; each gets an implicit weight of 1.
    Tokens(Vec<String>),
    /// Explicit `(token, weight)` pairs.
    Weighted(Vec<(String, f64)>),
    /// A token -> weight map, equivalent to `Weighted` with dedup applied.
    Map(HashMap<String, f64>),
    /// Reuse another fingerprint's value verbatim.
    Same(Fingerprint),
}

/// An immutable, fixed-width SimHash fingerprint.
///
/// Two fingerprints are equal iff their value and bit width both match.
/// The canonical textual form is lowercase hex with no prefix or padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    value: u128,
    f: u32,
}

impl Fingerprint {
    /// Bit width this fingerprint was constructed with.
    pub fn f(&self) -> u32 {
        self.f
    }

    /// The raw integer value, masked to `f` bits.
    pub fn value(&self) -> u128 {
        self.value
    }

    /// Takes an integer verbatim (masked to `f` bits).
    pub fn from_int(value: u128, f: u32) -> Result<Self> {
        validate_f(f)?;
        Ok(Self {
            value: mask(value, f),
            f,
        })
    }

    /// Parses the canonical lowercase-hex textual form.
    pub fn from_hex(hex: &str, f: u32) -> Result<Self> {
        validate_f(f)?;
        let value = u128::from_str_radix(hex, 16)
            .map_err(|e| Error::BadInput(format!("invalid hex fingerprint {hex:?}: {e}")))?;
        Ok(Self {
            value: mask(value, f),
            f,
        })
    }

    /// The canonical textual form: lowercase hex, no prefix, no padding.
    pub fn to_hex(&self) -> String {
        format!("{:x}", self.value)
    }

    /// Builds a fingerprint from any of the non-text [`FeatureInput`]
    /// shapes using `hasher` as the pluggable hash collaborator. Use
    /// [`Fingerprint::from_text`] for the `Text` variant, since that shape
    /// also needs a tokenizer and an IDF dictionary.
    pub fn from_features<H: FingerprintHash>(
        features: FeatureInput,
        f: u32,
        hasher: &H,
    ) -> Result<Self> {
        validate_f(f)?;
        match features {
            FeatureInput::Same(fp) => {
                if fp.f != f {
                    return Err(Error::DimensionMismatch {
                        expected: f,
                        actual: fp.f,
                    });
                }
                Ok(fp)
            }
            FeatureInput::Integer(v) => Ok(Self {
                value: mask(v, f),
                f,
            }),
            FeatureInput::Tokens(tokens) => {
                let weighted: Vec<(String, f64)> = tokens.into_iter().map(|t| (t, 1.0)).collect();
                build_weighted(&weighted, f, hasher)
            }
            FeatureInput::Weighted(weighted) => build_weighted(&weighted, f, hasher),
            FeatureInput::Map(map) => {
                let weighted: Vec<(String, f64)> = map.into_iter().collect();
                build_weighted(&weighted, f, hasher)
            }
            FeatureInput::Text(_) => Err(Error::BadInput(
                "Text variant requires from_text (tokenizer + IDF collaborators)".to_string(),
            )),
        }
    }

    /// Builds a fingerprint from free text: tokenize, fold into a
    /// term-frequency multiset, multiply each count by its IDF weight,
    /// then feed the weighted multiset into the bit-voting builder.
    pub fn from_text<H: FingerprintHash, T: Tokenize>(
        text: &str,
        f: u32,
        hasher: &H,
        tokenizer: &T,
        idf: &IdfWeights,
    ) -> Result<Self> {
        validate_f(f)?;
        let mut tf: HashMap<String, f64> = HashMap::new();
        for token in tokenizer.tokenize(text) {
            *tf.entry(token).or_insert(0.0) += 1.0;
        }
        let weighted: Vec<(String, f64)> = tf
            .into_iter()
            .map(|(token, count)| {
                let w = idf.weight(&token);
                (token, count * w)
            })
            .collect();
        build_weighted(&weighted, f, hasher)
    }

    /// Hamming distance: `popcount((a XOR b) & mask)`. Fails with
    /// `DimensionMismatch` if the two fingerprints have different `f`.
    pub fn distance(&self, other: &Self) -> Result<u32> {
        if self.f != other.f {
            return Err(Error::DimensionMismatch {
                expected: self.f,
                actual: other.f,
            });
        }
        Ok((self.value ^ other.value).count_ones())
    }
}

fn build_weighted<H: FingerprintHash>(
    features: &[(String, f64)],
    f: u32,
    hasher: &H,
) -> Result<Fingerprint> {
    let mut acc = vec![0f64; f as usize];
    for (token, weight) in features {
        let h = hasher.hash(token.as_bytes());
        for (i, slot) in acc.iter_mut().enumerate() {
            if (h >> i) & 1 == 1 {
                *slot += weight;
            } else {
                *slot -= weight;
            }
        }
    }
    let mut value: u128 = 0;
    for (i, &v) in acc.iter().enumerate() {
        if v > 0.0 {
            value |= 1u128 << i;
        }
    }
    Ok(Fingerprint { value, f })
}

fn validate_f(f: u32) -> Result<()> {
    if f == 0 || f > MAX_F {
        return Err(Error::BadInput(format!(
            "f must be in 1..={MAX_F}, got {f}"
        )));
    }
    Ok(())
}

fn mask(v: u128, f: u32) -> u128 {
    if f >= 128 {
        v
    } else {
        v & ((1u128 << f) - 1)
    }
}

/// Convenience builder bundling an `f` and a hash collaborator, mirroring
/// the reference implementation's `Simhash(value, f, hashfunc, idf_dic)`
/// constructor without needing to thread the hasher through every call.
pub struct FingerprintBuilder<H: FingerprintHash = Md5Hash> {
    f: u32,
    hasher: H,
}

impl FingerprintBuilder<Md5Hash> {
    /// A builder using the default MD5 hash collaborator.
    pub fn new(f: u32) -> Result<Self> {
        validate_f(f)?;
        Ok(Self {
            f,
            hasher: Md5Hash,
        })
    }
}

impl<H: FingerprintHash> FingerprintBuilder<H> {
    pub fn with_hash(f: u32, hasher: H) -> Result<Self> {
        validate_f(f)?;
        Ok(Self { f, hasher })
    }

    pub fn f(&self) -> u32 {
        self.f
    }

    pub fn build(&self, features: FeatureInput) -> Result<Fingerprint> {
        Fingerprint::from_features(features, self.f, &self.hasher)
    }

    pub fn build_text<T: Tokenize>(
        &self,
        text: &str,
        tokenizer: &T,
        idf: &IdfWeights,
    ) -> Result<Fingerprint> {
        Fingerprint::from_text(text, self.f, &self.hasher, tokenizer, idf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_int_and_hex() {
        let fp = Fingerprint::from_int(0xDEADBEEFCAFEBABE, 64).unwrap();
        assert_eq!(fp.value(), 0xDEADBEEFCAFEBABE);
        let hex = fp.to_hex();
        let back = Fingerprint::from_hex(&hex, 64).unwrap();
        assert_eq!(back, fp);
    }

    #[test]
    fn from_int_masks_to_f_bits() {
        let fp = Fingerprint::from_int(0xFFFF, 8).unwrap();
        assert_eq!(fp.value(), 0xFF);
    }

    #[test]
    fn rejects_zero_and_oversized_f() {
        assert!(Fingerprint::from_int(0, 0).is_err());
        assert!(Fingerprint::from_int(0, MAX_F + 1).is_err());
        assert!(Fingerprint::from_int(0, MAX_F).is_ok());
    }

    #[test]
    fn distance_symmetry_identity_and_bounds() {
        let a = Fingerprint::from_int(0b1010, 64).unwrap();
        let b = Fingerprint::from_int(0b1001, 64).unwrap();
        let d_ab = a.distance(&b).unwrap();
        let d_ba = b.distance(&a).unwrap();
        assert_eq!(d_ab, d_ba);
        assert_eq!(a.distance(&a).unwrap(), 0);
        assert!(d_ab <= 64);
    }

    #[test]
    fn distance_dimension_mismatch() {
        let a = Fingerprint::from_int(0, 64).unwrap();
        let b = Fingerprint::from_int(0, 32).unwrap();
        match a.distance(&b) {
            Err(Error::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 64);
                assert_eq!(actual, 32);
            }
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }

    #[test]
    fn identical_tokens_produce_identical_fingerprints() {
        let builder = FingerprintBuilder::new(64).unwrap();
        let fp1 = builder
            .build(FeatureInput::Tokens(vec!["a".into(), "b".into(), "c".into()]))
            .unwrap();
        let fp2 = builder
            .build(FeatureInput::Tokens(vec!["a".into(), "b".into(), "c".into()]))
            .unwrap();
        assert_eq!(fp1, fp2);
    }

    #[test]
    fn weighted_and_map_variants_agree() {
        let builder = FingerprintBuilder::new(64).unwrap();
        let weighted = builder
            .build(FeatureInput::Weighted(vec![
                ("a".into(), 2.0),
                ("b".into(), 1.0),
            ]))
            .unwrap();
        let mut map = HashMap::new();
        map.insert("a".to_string(), 2.0);
        map.insert("b".to_string(), 1.0);
        let from_map = builder.build(FeatureInput::Map(map)).unwrap();
        assert_eq!(weighted, from_map);
    }

    #[test]
    fn same_variant_reuses_value() {
        let builder = FingerprintBuilder::new(64).unwrap();
        let fp = Fingerprint::from_int(12345, 64).unwrap();
        let same = builder.build(FeatureInput::Same(fp)).unwrap();
        assert_eq!(fp, same);
    }

    #[test]
    fn text_variant_rejected_by_from_features() {
        let builder = FingerprintBuilder::new(64).unwrap();
        let err = builder.build(FeatureInput::Text("hello".into())).unwrap_err();
        assert!(matches!(err, Error::BadInput(_)));
    }

    #[test]
    fn text_builder_is_deterministic() {
        use crate::tokenize::{IdfWeights, WordBoundaryTokenizer};
        let builder = FingerprintBuilder::new(64).unwrap();
        let tokenizer = WordBoundaryTokenizer::default();
        let idf = IdfWeights::new();
        let fp1 = builder
            .build_text("The quick brown fox", &tokenizer, &idf)
            .unwrap();
        let fp2 = builder
            .build_text("The quick brown fox", &tokenizer, &idf)
            .unwrap();
        assert_eq!(fp1, fp2);
    }

    #[test]
    fn similar_text_has_low_distance_dissimilar_has_higher() {
        use crate::tokenize::{IdfWeights, WordBoundaryTokenizer};
        let builder = FingerprintBuilder::new(64).unwrap();
        let tokenizer = WordBoundaryTokenizer::default();
        let idf = IdfWeights::new();
        let fp1 = builder
            .build_text("the quick brown fox jumps over the lazy dog", &tokenizer, &idf)
            .unwrap();
        let fp2 = builder
            .build_text("the quick brown fox leaps over the lazy dog", &tokenizer, &idf)
            .unwrap();
        let fp3 = builder
            .build_text("lorem ipsum dolor sit amet consectetur adipiscing", &tokenizer, &idf)
            .unwrap();
        let near = fp1.distance(&fp2).unwrap();
        let far = fp1.distance(&fp3).unwrap();
        assert!(near < far, "expected {near} < {far}");
    }
}
