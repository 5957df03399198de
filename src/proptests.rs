use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::{BTreeMap, BTreeSet};

fn lower(k: &String) -> String {
    k.to_lowercase()
}

fn validate_dict<K, V, F>(d: &SimilarKeyDict<K, V, F>)
where
    K: Eq + Hash + Ord + Clone + fmt::Debug,
    F: Similarity<K>,
    F::Key: fmt::Debug,
{
    assert_eq!(
        d.index.len(),
        d.map.len(),
        "index must hold one tuple per entry"
    );
    for (i, w) in d.index.windows(2).enumerate() {
        assert!(
            w[0] < w[1],
            "index must be strictly increasing (idx={i}): {:?} !< {:?}",
            w[0],
            w[1]
        );
    }
    for (sk, k) in &d.index {
        assert!(d.map.contains_key(k), "indexed key {k:?} missing from map");
        assert!(
            *sk == d.similarity.simkey(k),
            "stored SimKey for {k:?} is stale"
        );
    }
}

fn key_strategy() -> impl Strategy<Value = String> + Clone {
    // A small alphabet with mixed case so lowercase similarity collides often.
    "[aAbBcC]{0,6}"
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 5)]
    Insert(#[proptest(strategy = "key_strategy()")] String, u8),
    #[proptest(weight = 3)]
    Remove(#[proptest(strategy = "key_strategy()")] String),
    #[proptest(weight = 2)]
    Get(#[proptest(strategy = "key_strategy()")] String),
    #[proptest(weight = 1)]
    PopItem,
    #[proptest(weight = 1)]
    Update(
        #[proptest(strategy = "prop::collection::vec((key_strategy(), any::<u8>()), 0..8)")]
        Vec<(String, u8)>,
    ),
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(any::<Op>(), 0..=300)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_with_btreemap(ops in ops_strategy()) {
        let mut d = SimilarKeyDict::with_similarity(lower);
        let mut m: BTreeMap<String, u8> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let old_d = d.insert(key.clone(), value);
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_d, old_m);
                }
                Op::Remove(key) => {
                    prop_assert_eq!(d.remove(&key), m.remove(&key));
                }
                Op::Get(key) => {
                    prop_assert_eq!(d.get(&key), m.get(&key));
                }
                Op::PopItem => {
                    let expected = m
                        .keys()
                        .max_by_key(|k| (lower(k), (*k).clone()))
                        .cloned();
                    match d.pop_item() {
                        Ok((k, v)) => {
                            prop_assert_eq!(Some(k.clone()), expected);
                            prop_assert_eq!(m.remove(&k), Some(v));
                        }
                        Err(e) => {
                            prop_assert_eq!(e, Error::Empty);
                            prop_assert!(m.is_empty());
                        }
                    }
                }
                Op::Update(items) => {
                    d.update(items.clone());
                    m.extend(items);
                }
            }

            prop_assert_eq!(d.len(), m.len());
            prop_assert_eq!(d.sorted_index().len(), m.len());
        }

        validate_dict(&d);
        let mut got: Vec<(String, u8)> = d.iter().map(|(k, v)| (k.clone(), *v)).collect();
        got.sort();
        let expected: Vec<(String, u8)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_insert_twice_is_idempotent(
        items in prop::collection::vec((key_strategy(), any::<u8>()), 0..50),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut once = SimilarKeyDict::from_items(lower, items.clone());
        let mut twice = once.clone();
        prop_assume!(!items.is_empty());
        let (k, v) = items[pick.index(items.len())].clone();

        once.insert(k.clone(), v);
        twice.insert(k.clone(), v);
        twice.insert(k, v);

        prop_assert_eq!(once.sorted_index(), twice.sorted_index());
        prop_assert!(once == twice);
    }

    #[test]
    fn prop_bulk_build_matches_incremental(
        items in prop::collection::vec((key_strategy(), any::<u8>()), 0..100),
    ) {
        let bulk = SimilarKeyDict::from_items(lower, items.clone());
        let mut incremental = SimilarKeyDict::with_similarity(lower);
        for (k, v) in items {
            incremental.insert(k, v);
        }

        validate_dict(&bulk);
        validate_dict(&incremental);
        prop_assert_eq!(bulk.sorted_index(), incremental.sorted_index());
        prop_assert!(bulk == incremental);
    }

    #[test]
    fn prop_similar_keys_match_linear_scan(
        keys in prop::collection::btree_set(key_strategy(), 0..60),
        probe in key_strategy(),
    ) {
        let d = SimilarKeyDict::from_items(lower, keys.iter().map(|k| (k.clone(), ())));

        let got: Vec<&String> = d.get_similar_keys(&probe, None);
        let target = lower(&probe);
        let mut expected: Vec<&String> = keys.iter().filter(|k| lower(k) == target).collect();
        expected.sort();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_nearby_keys_window(
        keys in prop::collection::btree_set(any::<u16>(), 0..60),
        probe in any::<u16>(),
        count in 0usize..20,
    ) {
        let d: SimilarKeyDict<u16, ()> = keys.iter().map(|k| (*k, ())).collect();
        let got = d.get_nearby_keys(&probe, count);
        let sorted: Vec<u16> = keys.iter().copied().collect();

        prop_assert_eq!(got.len(), count.min(sorted.len()));
        // A contiguous run of the sorted keys.
        if let Some(first) = got.first() {
            let start = sorted.binary_search(*first).unwrap_or_else(|i| i);
            let window: Vec<&u16> = sorted[start..start + got.len()].iter().collect();
            prop_assert_eq!(&got, &window);
        }
        // The probe's position sits inside the window unless clamped.
        if keys.contains(&probe) && count > 0 {
            prop_assert!(got.contains(&&probe));
        }
    }

    #[test]
    fn prop_prefix_match_matches_linear_scan(
        keys in prop::collection::btree_set("[abc\u{e9}\u{10FFFF}]{0,5}", 0..60),
        prefix in "[abc\u{e9}\u{10FFFF}]{0,3}",
    ) {
        let d: StringSimilarityDict<()> = keys.iter().map(|k| (k.clone(), ())).collect();

        let got: BTreeSet<&String> = d.prefix_match_keys(&prefix, None).into_iter().collect();
        let expected: BTreeSet<&String> =
            keys.iter().filter(|k| k.starts_with(prefix.as_str())).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_prefix_match_lowercase_matches_linear_scan(
        keys in prop::collection::btree_set(key_strategy(), 0..60),
        prefix in "[aAbB]{0,3}",
    ) {
        let d = SimilarKeyDict::from_items(lower, keys.iter().map(|k| (k.clone(), ())));
        let sk_prefix = lower(&prefix);

        let got: BTreeSet<&String> = d.prefix_match_keys(&prefix, None).into_iter().collect();
        let expected: BTreeSet<&String> =
            keys.iter().filter(|k| lower(k).starts_with(sk_prefix.as_str())).collect();
        prop_assert_eq!(got, expected);
    }
}

#[cfg(feature = "regex")]
proptest! {
    #[test]
    fn prop_regex_match_matches_linear_scan(
        keys in prop::collection::btree_set("[ab]{0,5}", 0..40),
        pattern in "[ab]{0,2}[.]?[ab*]{0,2}",
    ) {
        let d: StringSimilarityDict<()> = keys.iter().map(|k| (k.clone(), ())).collect();
        let Ok(got) = d.regex_match_keys(&pattern, None) else {
            return Ok(());
        };

        let re = regex::Regex::new(&format!("^(?:{pattern})")).unwrap();
        let expected: Vec<&String> = keys.iter().filter(|k| re.is_match(k)).collect();
        prop_assert_eq!(got, expected);
    }
}
