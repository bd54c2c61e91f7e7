//! CLI value enums and their domain conversions.

use clap::ValueEnum;

use crate::domain::FeatureType;

/// Feature type for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureTypeArg {
    /// Available to every account
    Basic,
    /// Paid tier
    Premium,
    /// Enterprise contracts
    Enterprise,
}

impl std::fmt::Display for FeatureTypeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", FeatureType::from(*self))
    }
}

impl From<FeatureTypeArg> for FeatureType {
    fn from(arg: FeatureTypeArg) -> Self {
        match arg {
            FeatureTypeArg::Basic => FeatureType::Basic,
            FeatureTypeArg::Premium => FeatureType::Premium,
            FeatureTypeArg::Enterprise => FeatureType::Enterprise,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(FeatureTypeArg::Basic, FeatureType::Basic)]
    #[case(FeatureTypeArg::Premium, FeatureType::Premium)]
    #[case(FeatureTypeArg::Enterprise, FeatureType::Enterprise)]
    fn test_feature_type_conversion(#[case] arg: FeatureTypeArg, #[case] expected: FeatureType) {
        assert_eq!(FeatureType::from(arg), expected);
        assert_eq!(arg.to_string(), expected.to_string());
    }
}
