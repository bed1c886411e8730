//! Field value conversion and merge algebra.
//!
//! Only `String`, `Int` and `Double` take part in type conversion. Every
//! other pairing is rejected. Conversion never errors: an impossible
//! conversion yields `None` and the caller decides what that means.

use super::value::{FieldType, FieldValue};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

/// How several field values are folded into one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Join the string form of every value with a separator.
    Concatenate {
        /// Text placed between joined values.
        separator: String,
    },
    /// Keep the value of the field being merged away.
    ///
    /// Callers pass `[source, target]`, so this is the first non-empty value.
    PreferSource,
    /// Keep the value of the field being merged into.
    ///
    /// Callers pass `[source, target]`, so this is the last non-empty value.
    PreferTarget,
}

impl MergeStrategy {
    /// Concatenate with the given separator.
    pub fn concatenate(separator: impl Into<String>) -> Self {
        MergeStrategy::Concatenate {
            separator: separator.into(),
        }
    }
}

impl Default for MergeStrategy {
    fn default() -> Self {
        MergeStrategy::concatenate(", ")
    }
}

/// Whether a conversion between two field types is supported.
pub fn is_conversion_supported(from: FieldType, to: FieldType) -> bool {
    from.is_convertible() && to.is_convertible()
}

/// Convert a value to the target type.
pub fn convert(value: &FieldValue, target: FieldType) -> Option<FieldValue> {
    match (value, target) {
        (FieldValue::String(s), FieldType::String) => Some(FieldValue::String(s.clone())),
        (FieldValue::Int(n), FieldType::Int) => Some(FieldValue::Int(*n)),
        (FieldValue::Double(d), FieldType::Double) => Some(FieldValue::Double(*d)),

        (FieldValue::String(s), FieldType::Int) => {
            let trimmed = s.trim();
            match trimmed.parse::<i64>() {
                Ok(n) => Some(FieldValue::Int(n)),
                Err(_) => trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(truncate_to_int)
                    .map(FieldValue::Int),
            }
        }
        (FieldValue::String(s), FieldType::Double) => {
            s.trim().parse::<f64>().ok().map(FieldValue::Double)
        }
        (FieldValue::Int(n), FieldType::String) => Some(FieldValue::String(n.to_string())),
        (FieldValue::Int(n), FieldType::Double) => Some(FieldValue::Double(*n as f64)),
        (FieldValue::Double(d), FieldType::String) => Some(FieldValue::String(format_double(*d))),
        (FieldValue::Double(d), FieldType::Int) => truncate_to_int(*d).map(FieldValue::Int),

        _ => None,
    }
}

/// Merge several optional values into one.
///
/// Missing values are dropped first; if nothing remains the result is `None`.
pub fn merge(values: &[Option<FieldValue>], strategy: &MergeStrategy) -> Option<FieldValue> {
    let present: Vec<&FieldValue> = values.iter().flatten().collect();
    if present.is_empty() {
        return None;
    }

    match strategy {
        MergeStrategy::Concatenate { separator } => {
            let parts: Vec<String> = present
                .iter()
                .filter_map(|value| stringify(value))
                .filter(|s| !s.is_empty())
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(FieldValue::String(parts.join(separator)))
            }
        }
        MergeStrategy::PreferSource => present.into_iter().find(|v| !v.is_empty()).cloned(),
        MergeStrategy::PreferTarget => present.into_iter().rev().find(|v| !v.is_empty()).cloned(),
    }
}

/// String form of a value, or `None` for values with no textual form.
pub fn stringify(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::String(s) => Some(s.clone()),
        FieldValue::Int(n) => Some(n.to_string()),
        FieldValue::Double(d) => Some(format_double(*d)),
        FieldValue::Bool(b) => Some(b.to_string()),
        FieldValue::Date(date) => Some(date.to_rfc3339_opts(SecondsFormat::Secs, true)),
        FieldValue::StringArray(items) => Some(items.join(", ")),
        FieldValue::AttachmentIdList(_) => None,
    }
}

/// Whole numbers print without decimals; everything else uses the shortest
/// representation that parses back to the same value.
fn format_double(d: f64) -> String {
    if d.is_finite() && d.fract() == 0.0 {
        format!("{:.0}", d)
    } else {
        d.to_string()
    }
}

/// Truncate toward zero, rejecting values outside the `i64` range.
fn truncate_to_int(d: f64) -> Option<i64> {
    if !d.is_finite() {
        return None;
    }
    let truncated = d.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
    if truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Some(truncated as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const ALL_TYPES: [FieldType; 7] = [
        FieldType::String,
        FieldType::Int,
        FieldType::Double,
        FieldType::Bool,
        FieldType::Date,
        FieldType::StringArray,
        FieldType::AttachmentIdList,
    ];

    fn sample(ty: FieldType) -> FieldValue {
        match ty {
            FieldType::String => FieldValue::from("12"),
            FieldType::Int => FieldValue::Int(12),
            FieldType::Double => FieldValue::Double(12.0),
            FieldType::Bool => FieldValue::Bool(true),
            FieldType::Date => {
                FieldValue::Date(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap())
            }
            FieldType::StringArray => FieldValue::StringArray(vec!["12".to_string()]),
            FieldType::AttachmentIdList => FieldValue::AttachmentIdList(vec![[1u8; 16]]),
        }
    }

    #[test]
    fn test_identity_conversions() {
        for ty in [FieldType::String, FieldType::Int, FieldType::Double] {
            assert_eq!(convert(&sample(ty), ty), Some(sample(ty)));
        }
    }

    #[test]
    fn test_conversion_closure() {
        for from in ALL_TYPES {
            for to in ALL_TYPES {
                let supported = is_conversion_supported(from, to);
                assert_eq!(supported, from.is_convertible() && to.is_convertible());
                if !supported {
                    assert_eq!(convert(&sample(from), to), None, "{from} -> {to}");
                }
            }
        }
    }

    #[test]
    fn test_string_to_int() {
        assert_eq!(convert(&FieldValue::from(" 42 "), FieldType::Int), Some(FieldValue::Int(42)));
        assert_eq!(convert(&FieldValue::from("-7"), FieldType::Int), Some(FieldValue::Int(-7)));
        assert_eq!(convert(&FieldValue::from("3.99"), FieldType::Int), Some(FieldValue::Int(3)));
        assert_eq!(convert(&FieldValue::from("-3.99"), FieldType::Int), Some(FieldValue::Int(-3)));
        assert_eq!(convert(&FieldValue::from("abc"), FieldType::Int), None);
        assert_eq!(convert(&FieldValue::from(""), FieldType::Int), None);
        assert_eq!(convert(&FieldValue::from("1e30"), FieldType::Int), None);
    }

    #[test]
    fn test_string_to_double() {
        assert_eq!(
            convert(&FieldValue::from(" 98.6\n"), FieldType::Double),
            Some(FieldValue::Double(98.6))
        );
        assert_eq!(convert(&FieldValue::from("120/80"), FieldType::Double), None);
    }

    #[test]
    fn test_int_conversions() {
        assert_eq!(
            convert(&FieldValue::Int(-15), FieldType::String),
            Some(FieldValue::from("-15"))
        );
        assert_eq!(convert(&FieldValue::Int(3), FieldType::Double), Some(FieldValue::Double(3.0)));
    }

    #[test]
    fn test_double_to_string_formatting() {
        assert_eq!(
            convert(&FieldValue::Double(5.0), FieldType::String),
            Some(FieldValue::from("5"))
        );
        assert_eq!(
            convert(&FieldValue::Double(-2.0), FieldType::String),
            Some(FieldValue::from("-2"))
        );
        assert_eq!(
            convert(&FieldValue::Double(2.5), FieldType::String),
            Some(FieldValue::from("2.5"))
        );
        assert_eq!(
            convert(&FieldValue::Double(0.1), FieldType::String),
            Some(FieldValue::from("0.1"))
        );
    }

    #[test]
    fn test_truncation_not_rounding() {
        assert_eq!(convert(&FieldValue::Double(2.9), FieldType::Int), Some(FieldValue::Int(2)));
        assert_eq!(convert(&FieldValue::Double(-2.9), FieldType::Int), Some(FieldValue::Int(-2)));
    }

    #[test]
    fn test_double_to_int_overflow() {
        assert_eq!(convert(&FieldValue::Double(1e19), FieldType::Int), None);
        assert_eq!(convert(&FieldValue::Double(-1e19), FieldType::Int), None);
        assert_eq!(convert(&FieldValue::Double(f64::NAN), FieldType::Int), None);
        assert_eq!(convert(&FieldValue::Double(f64::INFINITY), FieldType::Int), None);
    }

    #[test]
    fn test_int_string_round_trip() {
        for n in [0, 1, -1, 42, i64::MAX, i64::MIN, 9_007_199_254_740_993] {
            let as_string = convert(&FieldValue::Int(n), FieldType::String).unwrap();
            assert_eq!(convert(&as_string, FieldType::Int), Some(FieldValue::Int(n)));
        }
    }

    #[test]
    fn test_merge_order_semantics() {
        let source = Some(FieldValue::from("A"));
        let target = Some(FieldValue::from("B"));
        let values = [source, target];

        assert_eq!(merge(&values, &MergeStrategy::PreferSource), Some(FieldValue::from("A")));
        assert_eq!(merge(&values, &MergeStrategy::PreferTarget), Some(FieldValue::from("B")));
        assert_eq!(
            merge(&values, &MergeStrategy::concatenate(", ")),
            Some(FieldValue::from("A, B"))
        );
    }

    #[test]
    fn test_merge_skips_missing_and_empty() {
        let values = [None, Some(FieldValue::from("")), Some(FieldValue::from("B"))];
        assert_eq!(merge(&values, &MergeStrategy::PreferSource), Some(FieldValue::from("B")));

        let values = [Some(FieldValue::from("A")), Some(FieldValue::StringArray(vec![]))];
        assert_eq!(merge(&values, &MergeStrategy::PreferTarget), Some(FieldValue::from("A")));

        assert_eq!(merge(&[None, None], &MergeStrategy::PreferSource), None);
        assert_eq!(merge(&[], &MergeStrategy::default()), None);
    }

    #[test]
    fn test_merge_all_empty_prefers_nothing() {
        let values = [Some(FieldValue::from("")), Some(FieldValue::from(""))];
        assert_eq!(merge(&values, &MergeStrategy::PreferSource), None);
        assert_eq!(merge(&values, &MergeStrategy::concatenate(" ")), None);
    }

    #[test]
    fn test_numbers_are_never_empty() {
        let values = [Some(FieldValue::Int(0)), Some(FieldValue::from("B"))];
        assert_eq!(merge(&values, &MergeStrategy::PreferSource), Some(FieldValue::Int(0)));
    }

    #[test]
    fn test_concatenate_stringifies_every_kind() {
        let date = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let values = [
            Some(FieldValue::Int(3)),
            Some(FieldValue::Double(2.5)),
            Some(FieldValue::Bool(false)),
            Some(FieldValue::Date(date)),
            Some(FieldValue::StringArray(vec!["x".to_string(), "y".to_string()])),
            Some(FieldValue::AttachmentIdList(vec![[1u8; 16]])),
            Some(FieldValue::from("")),
        ];

        assert_eq!(
            merge(&values, &MergeStrategy::concatenate(" | ")),
            Some(FieldValue::from("3 | 2.5 | false | 2024-01-15T10:30:00Z | x, y"))
        );
    }

    #[test]
    fn test_concatenate_attachments_only() {
        let values = [Some(FieldValue::AttachmentIdList(vec![[1u8; 16]]))];
        assert_eq!(merge(&values, &MergeStrategy::default()), None);
    }
}
