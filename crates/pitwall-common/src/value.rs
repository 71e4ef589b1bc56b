use std::fmt::{self, Display};

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Raw content of one engine cell, exactly as the engine reports it.
///
/// Request payload scalars decode into this type as well, so inbound JSON and
/// engine reads go through the same coercion path.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            CellValue::Empty => serializer.serialize_none(),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CellVisitor;

        impl<'de> Visitor<'de> for CellVisitor {
            type Value = CellValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a scalar cell value (null, boolean, number or string)")
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(CellValue::Empty)
            }

            fn visit_none<E>(self) -> Result<Self::Value, E> {
                Ok(CellValue::Empty)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_any(self)
            }

            fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
                Ok(CellValue::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
                Ok(CellValue::Number(v as f64))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
                Ok(CellValue::Number(v as f64))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
                Ok(CellValue::Number(v))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(CellValue::Text(v.to_string()))
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(CellValue::Text(v))
            }
        }

        deserializer.deserialize_any(CellVisitor)
    }
}

/// Closed set of option keywords the calculator uses as sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Opt,
    Best,
    Tyres,
}

impl Keyword {
    pub const fn as_str(self) -> &'static str {
        match self {
            Keyword::Opt => "Opt",
            Keyword::Best => "Best",
            Keyword::Tyres => "Tyres",
        }
    }

    /// Case-insensitive match against the canonical spellings.
    pub fn parse(text: &str) -> Option<Self> {
        [Keyword::Opt, Keyword::Best, Keyword::Tyres]
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(text))
    }
}

/// Domain-side value after coercion.
///
/// `Int` and `Real` compare numerically so a value that went out as an
/// integer and came back from the engine as a float still matches.
#[derive(Debug, Clone, Default)]
pub enum DomainValue {
    #[default]
    Absent,
    Keyword(Keyword),
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

impl DomainValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, DomainValue::Absent)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DomainValue::Int(i) => Some(*i as f64),
            DomainValue::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DomainValue::Text(s) => Some(s),
            DomainValue::Keyword(k) => Some(k.as_str()),
            _ => None,
        }
    }

    /// `self` unless absent, otherwise `fallback`.
    pub fn or(self, fallback: DomainValue) -> DomainValue {
        if self.is_absent() { fallback } else { self }
    }
}

impl PartialEq for DomainValue {
    fn eq(&self, other: &Self) -> bool {
        use DomainValue::*;
        match (self, other) {
            (Absent, Absent) => true,
            (Keyword(a), Keyword(b)) => a == b,
            (Bool(a), Bool(b)) => a == b,
            (Text(a), Text(b)) => a == b,
            (Int(_) | Real(_), Int(_) | Real(_)) => match (self, other) {
                (Int(a), Int(b)) => a == b,
                _ => self.as_f64() == other.as_f64(),
            },
            _ => false,
        }
    }
}

impl From<i64> for DomainValue {
    fn from(value: i64) -> Self {
        DomainValue::Int(value)
    }
}

impl From<f64> for DomainValue {
    fn from(value: f64) -> Self {
        DomainValue::Real(value)
    }
}

impl From<&str> for DomainValue {
    fn from(value: &str) -> Self {
        DomainValue::Text(value.to_string())
    }
}

impl Display for DomainValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainValue::Absent => Ok(()),
            DomainValue::Keyword(k) => f.write_str(k.as_str()),
            DomainValue::Bool(b) => write!(f, "{b}"),
            DomainValue::Int(i) => write!(f, "{i}"),
            DomainValue::Real(r) => write!(f, "{r}"),
            DomainValue::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for DomainValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            DomainValue::Absent => serializer.serialize_none(),
            DomainValue::Keyword(k) => serializer.serialize_str(k.as_str()),
            DomainValue::Bool(b) => serializer.serialize_bool(*b),
            DomainValue::Int(i) => serializer.serialize_i64(*i),
            DomainValue::Real(r) => serializer.serialize_f64(*r),
            DomainValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_variants_compare_by_value() {
        assert_eq!(DomainValue::Int(20), DomainValue::Real(20.0));
        assert_ne!(DomainValue::Int(20), DomainValue::Real(20.5));
        assert_ne!(DomainValue::Int(1), DomainValue::Bool(true));
        assert_ne!(DomainValue::Text("1".into()), DomainValue::Int(1));
    }

    #[test]
    fn keyword_parse_is_case_insensitive() {
        assert_eq!(Keyword::parse("oPT"), Some(Keyword::Opt));
        assert_eq!(Keyword::parse("TYRES"), Some(Keyword::Tyres));
        assert_eq!(Keyword::parse("optimal"), None);
    }

    #[test]
    fn or_only_replaces_absent() {
        assert_eq!(DomainValue::Absent.or(DomainValue::Int(1)), DomainValue::Int(1));
        assert_eq!(DomainValue::Int(0).or(DomainValue::Int(1)), DomainValue::Int(0));
    }
}
