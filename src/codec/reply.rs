//! Shapes native read replies into record values.
//!
//! Both extraction paths end here, which keeps their output identical for
//! the same live data.

use std::collections::{BTreeMap, BTreeSet};

use crate::store::RawValue;
use crate::types::{CodecError, CodecResult, RecordValue, ScoredMember, ValueType};

pub fn decode_reply(value_type: ValueType, raw: RawValue) -> CodecResult<RecordValue> {
    match (value_type, raw) {
        (ValueType::String, RawValue::Text(value)) => Ok(RecordValue::String(value)),
        (ValueType::List, RawValue::Array(values)) => Ok(RecordValue::List(values)),
        (ValueType::Set, RawValue::Array(members)) => {
            Ok(RecordValue::Set(members.into_iter().collect::<BTreeSet<_>>()))
        }
        (ValueType::SortedSet, RawValue::Array(flat)) => {
            let members = into_pairs(value_type, flat)?
                .into_iter()
                .map(|(member, score)| Ok(ScoredMember::new(member, parse_score(&score)?)))
                .collect::<CodecResult<Vec<_>>>()?;
            Ok(RecordValue::SortedSet(members))
        }
        (ValueType::Hash, RawValue::Array(flat)) => Ok(RecordValue::Hash(
            into_pairs(value_type, flat)?
                .into_iter()
                .collect::<BTreeMap<_, _>>(),
        )),
        (value_type, raw) => Err(CodecError::UnexpectedReply {
            value_type,
            detail: format!("{:?}", raw),
        }),
    }
}

fn into_pairs(value_type: ValueType, flat: Vec<String>) -> CodecResult<Vec<(String, String)>> {
    if flat.len() % 2 != 0 {
        return Err(CodecError::OddPairs {
            value_type,
            len: flat.len(),
        });
    }
    let mut pairs = Vec::with_capacity(flat.len() / 2);
    let mut items = flat.into_iter();
    while let (Some(first), Some(second)) = (items.next(), items.next()) {
        pairs.push((first, second));
    }
    Ok(pairs)
}

/// Parses a score as the store prints it (`1`, `2.5`, `inf`, `-inf`).
pub fn parse_score(score: &str) -> CodecResult<f64> {
    match score.parse::<f64>() {
        Ok(value) if !value.is_nan() => Ok(value),
        _ => Err(CodecError::InvalidScore(score.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn array(items: &[&str]) -> RawValue {
        RawValue::Array(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_decode_sorted_set_pairs() {
        let value = decode_reply(ValueType::SortedSet, array(&["a", "1", "b", "inf"])).unwrap();
        assert_eq!(
            value,
            RecordValue::SortedSet(vec![
                ScoredMember::new("a", 1.0),
                ScoredMember::new("b", f64::INFINITY),
            ])
        );
    }

    #[test]
    fn test_decode_hash_pairs() {
        let value = decode_reply(ValueType::Hash, array(&["name", "John", "age", "25"])).unwrap();
        let expected = BTreeMap::from([
            ("name".to_string(), "John".to_string()),
            ("age".to_string(), "25".to_string()),
        ]);
        assert_eq!(value, RecordValue::Hash(expected));
    }

    #[test]
    fn test_decode_set_is_order_independent() {
        let a = decode_reply(ValueType::Set, array(&["x", "y", "z"])).unwrap();
        let b = decode_reply(ValueType::Set, array(&["z", "x", "y"])).unwrap();
        assert_eq!(a, b);
    }

    #[rstest]
    #[case(ValueType::Hash, array(&["field"]))]
    #[case(ValueType::SortedSet, array(&["member", "not-a-number"]))]
    #[case(ValueType::String, array(&["a"]))]
    #[case(ValueType::List, RawValue::Text("a".into()))]
    #[case(ValueType::String, RawValue::Nil)]
    fn test_malformed_replies_are_rejected(#[case] value_type: ValueType, #[case] raw: RawValue) {
        assert!(decode_reply(value_type, raw).is_err());
    }
}
