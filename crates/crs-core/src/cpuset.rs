//! CPU core-id sets.
//!
//! Accepts the docker/cgroup style list syntax: single ids and inclusive
//! ranges separated by commas, e.g. `0-3,8,12-15`. Formatting always emits
//! the fully expanded, ascending list (`0,1,2,3,8,12,13,14,15`) so that the
//! result can be pasted directly into a compose `cpuset:` field.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

/// Highest core id accepted, matching the kernel's largest `NR_CPUS`.
pub const MAX_CORE_ID: u32 = 8191;

/// An ordered, deduplicated set of CPU core ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CpuSet(BTreeSet<u32>);

impl CpuSet {
    /// Parse a cpuset spec such as `0-7`, `4`, `0,2,4` or `0-3, 8, 12-15`.
    pub fn parse(spec: &str) -> Result<Self, ParseError> {
        if spec.trim().is_empty() {
            return Err(ParseError::cpuset(spec, "empty cpuset"));
        }

        let mut cores = BTreeSet::new();
        for token in spec.split(',') {
            let token = token.trim();
            if token.is_empty() {
                return Err(ParseError::cpuset(spec, "empty entry in list"));
            }

            match token.split_once('-') {
                Some((start, end)) => {
                    let start = parse_core(spec, start)?;
                    let end = parse_core(spec, end)?;
                    if start > end {
                        return Err(ParseError::cpuset(
                            spec,
                            format!("range {start}-{end} is inverted"),
                        ));
                    }
                    cores.extend(start..=end);
                }
                None => {
                    cores.insert(parse_core(spec, token)?);
                }
            }
        }

        Ok(CpuSet(cores))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, core: u32) -> bool {
        self.0.contains(&core)
    }

    /// Iterate core ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn max(&self) -> Option<u32> {
        self.0.last().copied()
    }

    pub fn is_subset(&self, other: &CpuSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_disjoint(&self, other: &CpuSet) -> bool {
        self.0.is_disjoint(&other.0)
    }

    /// Cores in `self` that are not in `other`.
    pub fn difference(&self, other: &CpuSet) -> CpuSet {
        CpuSet(self.0.difference(&other.0).copied().collect())
    }

    pub fn intersection(&self, other: &CpuSet) -> CpuSet {
        CpuSet(self.0.intersection(&other.0).copied().collect())
    }

    /// Add every core of `other` to `self`.
    pub fn extend_from(&mut self, other: &CpuSet) {
        self.0.extend(other.iter());
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }
}

fn parse_core(spec: &str, raw: &str) -> Result<u32, ParseError> {
    let raw = raw.trim();
    let core = raw
        .parse::<u32>()
        .map_err(|_| ParseError::cpuset(spec, format!("'{raw}' is not a core id")))?;
    if core > MAX_CORE_ID {
        return Err(ParseError::cpuset(
            spec,
            format!("core id {core} exceeds the maximum of {MAX_CORE_ID}"),
        ));
    }
    Ok(core)
}

impl fmt::Display for CpuSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for core in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{core}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for CpuSet {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CpuSet::parse(s)
    }
}

impl FromIterator<u32> for CpuSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        CpuSet(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CpuSet {
    type Item = &'a u32;
    type IntoIter = std::collections::btree_set::Iter<'a, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for CpuSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CpuSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let spec = String::deserialize(deserializer)?;
        CpuSet::parse(&spec).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cores(spec: &str) -> Vec<u32> {
        CpuSet::parse(spec).unwrap().to_vec()
    }

    #[test]
    fn parses_simple_range() {
        assert_eq!(cores("0-7"), vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(cores("4-11"), vec![4, 5, 6, 7, 8, 9, 10, 11]);
        assert_eq!(cores("0-15"), (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn parses_single_core() {
        assert_eq!(cores("5"), vec![5]);
        assert_eq!(cores("3-3"), vec![3]);
    }

    #[test]
    fn parses_lists_and_mixed_forms() {
        assert_eq!(cores("0,2,4,6"), vec![0, 2, 4, 6]);
        assert_eq!(cores("0-3,8,12-15"), vec![0, 1, 2, 3, 8, 12, 13, 14, 15]);
        assert_eq!(cores("0-3, 8, 12-15"), vec![0, 1, 2, 3, 8, 12, 13, 14, 15]);
        assert_eq!(cores(" 0 - 3 "), vec![0, 1, 2, 3]);
    }

    #[test]
    fn deduplicates_and_sorts() {
        assert_eq!(cores("0-3,2-5"), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(cores("8,0-3,5"), vec![0, 1, 2, 3, 5, 8]);
    }

    #[test]
    fn rejects_malformed_specs() {
        for bad in ["", "  ", "a", "0-", "-3", "1-2-3", "7-4", "0,,2", "0-3,", "1.5", "-1"] {
            let err = CpuSet::parse(bad).unwrap_err();
            assert!(
                matches!(err, ParseError::CpuSet { .. }),
                "expected cpuset error for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn rejects_core_ids_past_the_ceiling() {
        for bad in ["0-4294967295", "0-20000000", "8192", "8000-8192"] {
            let err = CpuSet::parse(bad).unwrap_err();
            assert!(err.to_string().contains("exceeds"), "{bad:?}: {err}");
        }
        assert_eq!(CpuSet::parse("8190-8191").unwrap().to_vec(), vec![8190, 8191]);
    }

    #[test]
    fn formats_as_expanded_list() {
        let set: CpuSet = [0, 1, 2, 3].into_iter().collect();
        assert_eq!(set.to_string(), "0,1,2,3");

        let set: CpuSet = [6, 0, 4, 2].into_iter().collect();
        assert_eq!(set.to_string(), "0,2,4,6");

        let set: CpuSet = [5].into_iter().collect();
        assert_eq!(set.to_string(), "5");

        assert_eq!(CpuSet::default().to_string(), "");
    }

    #[test]
    fn range_survives_reformatting() {
        let parsed = CpuSet::parse("0-7").unwrap();
        let formatted = parsed.to_string();
        assert_eq!(formatted, "0,1,2,3,4,5,6,7");
        assert_eq!(CpuSet::parse(&formatted).unwrap(), parsed);
    }

    #[test]
    fn set_operations() {
        let worker = CpuSet::parse("0-7").unwrap();
        let claim = CpuSet::parse("2-3,9").unwrap();

        assert!(!claim.is_subset(&worker));
        assert_eq!(claim.difference(&worker).to_vec(), vec![9]);
        assert_eq!(claim.intersection(&worker).to_vec(), vec![2, 3]);
        assert_eq!(worker.difference(&claim).to_string(), "0,1,4,5,6,7");
        assert!(CpuSet::parse("4-7").unwrap().is_disjoint(&claim));
        assert_eq!(worker.max(), Some(7));
    }

    #[test]
    fn serde_uses_string_form() {
        let set = CpuSet::parse("1-3").unwrap();
        let yaml = serde_yaml::to_string(&set).unwrap();
        assert_eq!(yaml.trim().trim_matches(|c| c == '\'' || c == '"'), "1,2,3");

        let back: CpuSet = serde_yaml::from_str("0-1,4").unwrap();
        assert_eq!(back.to_vec(), vec![0, 1, 4]);

        assert!(serde_yaml::from_str::<CpuSet>("4-1").is_err());
    }

    fn token() -> impl Strategy<Value = String> {
        (0u32..64, proptest::option::of(0u32..8)).prop_map(|(start, span)| match span {
            Some(span) => format!("{start}-{}", start + span),
            None => start.to_string(),
        })
    }

    fn spec() -> impl Strategy<Value = String> {
        (proptest::collection::vec(token(), 1..8), any::<bool>())
            .prop_map(|(tokens, spaced)| tokens.join(if spaced { ", " } else { "," }))
    }

    proptest! {
        #[test]
        fn format_is_canonical(s in spec()) {
            let parsed = CpuSet::parse(&s).unwrap();
            let formatted = parsed.to_string();
            let reparsed = CpuSet::parse(&formatted).unwrap();

            prop_assert_eq!(&reparsed, &parsed);
            prop_assert_eq!(reparsed.to_string(), formatted.clone());

            let ids: Vec<u32> = formatted.split(',').map(|c| c.parse().unwrap()).collect();
            prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
