//! Attribute set canonicalization.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use otelpush_core::{AttributeSet, KeyValue, Value};

fn hash_of(s: &AttributeSet) -> u64 {
    let mut h = DefaultHasher::new();
    s.hash(&mut h);
    h.finish()
}

#[test]
fn permutations_are_equal() {
    let a = AttributeSet::from_slice(&[KeyValue::new("a", 1), KeyValue::new("b", 2)]);
    let b = AttributeSet::from_slice(&[KeyValue::new("b", 2), KeyValue::new("a", 1)]);
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
}

#[test]
fn duplicate_keys_last_write_wins() {
    let s = AttributeSet::from_slice(&[
        KeyValue::new("route", "/a"),
        KeyValue::new("method", "GET"),
        KeyValue::new("route", "/b"),
    ]);
    assert_eq!(s.len(), 2);
    assert_eq!(s.get("route"), Some(&Value::from("/b")));

    let same = AttributeSet::from_slice(&[KeyValue::new("method", "GET"), KeyValue::new("route", "/b")]);
    assert_eq!(s, same);
}

#[test]
fn value_types_distinguish_sets() {
    let int = AttributeSet::from_slice(&[KeyValue::new("code", 200)]);
    let text = AttributeSet::from_slice(&[KeyValue::new("code", "200")]);
    assert_ne!(int, text);
}

#[test]
fn floats_compare_by_bits() {
    let a = AttributeSet::from_slice(&[KeyValue::new("ratio", f64::NAN)]);
    let b = AttributeSet::from_slice(&[KeyValue::new("ratio", f64::NAN)]);
    assert_eq!(a, b);

    let pos = AttributeSet::from_slice(&[KeyValue::new("z", 0.0)]);
    let neg = AttributeSet::from_slice(&[KeyValue::new("z", -0.0)]);
    assert_ne!(pos, neg);
}

#[test]
fn empty_and_iterator_forms_agree() {
    assert_eq!(AttributeSet::empty(), AttributeSet::from_slice(&[]));
    assert!(AttributeSet::default().is_empty());

    let collected: AttributeSet = vec![KeyValue::new("y", true), KeyValue::new("x", "1")]
        .into_iter()
        .collect();
    let keys: Vec<&str> = collected.iter().map(|kv| &*kv.key).collect();
    assert_eq!(keys, vec!["x", "y"]);
}
