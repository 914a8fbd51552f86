//! Splits event values into tags and fields.

use std::collections::{BTreeMap, HashSet};

use crate::event::Value;
use crate::internal_events::InfluxDbUnsupportedTagType;

/// The set of value names that are written as tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagFields(HashSet<String>);

impl TagFields {
    /// Empty names are ignored.
    pub fn new<I>(names: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        TagFields(
            names
                .into_iter()
                .filter(|name| !name.as_ref().is_empty())
                .map(|name| name.as_ref().to_owned())
                .collect(),
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Partitions `values` into `(tags, fields)`.
///
/// Names outside `tag_fields` are copied to the fields unchanged. Tag values
/// must be strings or integers (rendered in base 10); a tag holding any other
/// kind of value is dropped from both sets with a warning.
pub fn classify(
    values: &BTreeMap<String, Value>,
    tag_fields: &TagFields,
) -> (BTreeMap<String, String>, BTreeMap<String, Value>) {
    let mut tags = BTreeMap::new();
    let mut fields = BTreeMap::new();

    for (name, value) in values {
        if !tag_fields.contains(name) {
            fields.insert(name.clone(), value.clone());
            continue;
        }

        match value {
            Value::String(s) => {
                tags.insert(name.clone(), s.clone());
            }
            Value::Integer(i) => {
                tags.insert(name.clone(), i.to_string());
            }
            other => {
                emit!(InfluxDbUnsupportedTagType {
                    name,
                    kind: other.kind(),
                });
            }
        }
    }

    (tags, fields)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::event::Integer;

    fn values(pairs: Vec<(&str, Value)>) -> BTreeMap<String, Value> {
        pairs.into_iter().map(|(k, v)| (k.to_owned(), v)).collect()
    }

    #[test]
    fn splits_tags_and_fields() {
        let (tags, fields) = classify(
            &values(vec![("host", Value::from("a")), ("cpu", Value::from(42i64))]),
            &TagFields::new(["host"]),
        );

        assert_eq!(
            tags,
            [("host".to_owned(), "a".to_owned())]
                .into_iter()
                .collect::<BTreeMap<_, _>>()
        );
        assert_eq!(fields, values(vec![("cpu", Value::from(42i64))]));
    }

    #[test]
    fn integer_tags_of_every_width() {
        let input = values(vec![
            ("a", Value::from(-8i8)),
            ("b", Value::from(16i16)),
            ("c", Value::from(32i32)),
            ("d", Value::from(64i64)),
            ("e", Value::from(7u16)),
            ("f", Value::from(u64::MAX)),
        ]);
        let (tags, fields) = classify(&input, &TagFields::new(["a", "b", "c", "d", "e", "f"]));

        assert!(fields.is_empty());
        assert_eq!(tags["a"], "-8");
        assert_eq!(tags["b"], "16");
        assert_eq!(tags["c"], "32");
        assert_eq!(tags["d"], "64");
        assert_eq!(tags["e"], "7");
        assert_eq!(tags["f"], "18446744073709551615");
    }

    #[test]
    fn unsupported_tag_values_are_dropped() {
        let input = values(vec![
            ("ratio", Value::from(0.5)),
            ("ok", Value::from(true)),
            ("nothing", Value::Null),
            ("keep", Value::from(1.0)),
        ]);
        let (tags, fields) = classify(&input, &TagFields::new(["ratio", "ok", "nothing"]));

        assert!(tags.is_empty());
        assert_eq!(fields, values(vec![("keep", Value::from(1.0))]));
    }

    #[test]
    fn empty_tag_names_are_ignored() {
        let tag_fields = TagFields::new(["", "host"]);
        assert_eq!(tag_fields.len(), 1);
        assert!(!tag_fields.contains(""));
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<String>().prop_map(Value::String),
            any::<i8>().prop_map(|v| Value::Integer(Integer::I8(v))),
            any::<i64>().prop_map(|v| Value::Integer(Integer::I64(v))),
            any::<u32>().prop_map(|v| Value::Integer(Integer::U32(v))),
            any::<bool>().prop_map(Value::Boolean),
            (-1.0e9..1.0e9f64).prop_map(Value::Float),
            Just(Value::Null),
        ]
    }

    proptest! {
        #[test]
        fn tags_and_fields_are_disjoint(
            input in prop::collection::btree_map("[a-e]{1,2}", arb_value(), 0..12),
            tag_names in prop::collection::vec("[a-e]{1,2}", 0..6),
        ) {
            let tag_fields = TagFields::new(&tag_names);
            let (tags, fields) = classify(&input, &tag_fields);

            for name in tags.keys() {
                prop_assert!(!fields.contains_key(name));
                prop_assert!(tag_fields.contains(name));
            }
            for (name, value) in &input {
                if tag_fields.contains(name) {
                    let supported = matches!(value, Value::String(_) | Value::Integer(_));
                    prop_assert_eq!(tags.contains_key(name), supported);
                    prop_assert!(!fields.contains_key(name));
                } else {
                    prop_assert_eq!(fields.get(name), Some(value));
                }
            }
        }
    }
}
