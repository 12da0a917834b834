use strum::{Display, EnumString, VariantArray};

/// How each node's distance from its root is encoded.
///
/// Both are exact; they differ in clause shape.
#[derive(Clone, Copy, Debug, Default, Display, EnumString, VariantArray, Eq, PartialEq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum DistanceEncoding {
    /// One "at least d" variable per possible distance, chained so each implies the one below.
    /// Parent edges relate thresholds by plain implications.
    #[default]
    Unary,
    /// A `ceil(log2(N + 1))`-bit unsigned number per node.
    /// Parent edges go through a ripple-carry incrementer, bounds through comparator circuits.
    Binary,
}

/// Knobs for [`compile`](crate::compile).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CompileOptions {
    /// See [`DistanceEncoding`].
    pub encoding: DistanceEncoding,
}

impl CompileOptions {
    /// Options using `encoding` for distances.
    pub fn with_encoding(encoding: DistanceEncoding) -> Self {
        Self { encoding }
    }
}

#[cfg(test)]
mod tests {
    use strum::VariantArray;

    use super::DistanceEncoding;

    #[test]
    fn encodings_parse_from_their_names() {
        for encoding in DistanceEncoding::VARIANTS {
            assert_eq!(encoding.to_string().parse::<DistanceEncoding>().unwrap(), *encoding);
        }
        assert_eq!("binary".parse::<DistanceEncoding>().unwrap(), DistanceEncoding::Binary);
        assert!("ternary".parse::<DistanceEncoding>().is_err());
    }
}
