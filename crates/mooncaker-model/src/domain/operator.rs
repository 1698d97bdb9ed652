use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{
    Deserialize, Deserializer, Serialize,
    de::{self, SeqAccess, Visitor},
};

use crate::ModelError;

/// Identity of an external caller (e.g. a chat user id).
///
/// Deserializes from a string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub struct OperatorId(String);

impl OperatorId {
    pub fn new(s: impl Into<String>) -> Result<Self, ModelError> {
        Self::try_from(s.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OperatorId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::EmptyOperator);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl From<OperatorId> for String {
    fn from(id: OperatorId) -> Self {
        id.0
    }
}

impl From<i64> for OperatorId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct OperatorIdVisitor;

impl<'de> Visitor<'de> for OperatorIdVisitor {
    type Value = OperatorId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an operator id as string or integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        OperatorId::new(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(OperatorId::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(OperatorId(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for OperatorId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(OperatorIdVisitor)
    }
}

/// Set of callers allowed to supply keys through an external channel.
///
/// Deserializes from a sequence of ids, a separated string (`"42 77"`) or a single integer.
/// An empty list authorizes nobody.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AllowList(BTreeSet<OperatorId>);

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: OperatorId) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: &OperatorId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperatorId> {
        self.0.iter()
    }
}

impl FromIterator<OperatorId> for AllowList {
    fn from_iter<I: IntoIterator<Item = OperatorId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Parses a whitespace or comma separated list, e.g. `"1234 5678"`.
impl FromStr for AllowList {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(|c: char| c.is_whitespace() || c == ',')
            .filter(|part| !part.is_empty())
            .map(OperatorId::new)
            .collect()
    }
}

struct AllowListVisitor;

impl<'de> Visitor<'de> for AllowListVisitor {
    type Value = AllowList;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a list of operator ids or a whitespace/comma separated string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok([OperatorId::from(v)].into_iter().collect())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok([OperatorId(v.to_string())].into_iter().collect())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut list = AllowList::new();
        while let Some(id) = seq.next_element::<OperatorId>()? {
            list.insert(id);
        }
        Ok(list)
    }
}

impl<'de> Deserialize<'de> for AllowList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AllowListVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> OperatorId {
        OperatorId::new(s).unwrap()
    }

    #[test]
    fn operator_id_is_trimmed_and_non_empty() {
        assert_eq!(id("  42 ").as_str(), "42");
        assert_eq!(OperatorId::new("   "), Err(ModelError::EmptyOperator));
    }

    #[test]
    fn parses_mixed_separators() {
        let list: AllowList = "111 222,333\n444".parse().unwrap();

        assert_eq!(list.len(), 4);
        for member in ["111", "222", "333", "444"] {
            assert!(list.contains(&id(member)), "missing {member}");
        }
        assert!(!list.contains(&id("555")));
    }

    #[test]
    fn empty_list_authorizes_nobody() {
        let list: AllowList = "".parse().unwrap();
        assert!(list.is_empty());
        assert!(!list.contains(&id("1")));
    }

    #[test]
    fn numeric_ids_match_string_ids() {
        let list: AllowList = [OperatorId::from(987_i64)].into_iter().collect();
        assert!(list.contains(&id("987")));
    }

    #[test]
    fn deserializes_from_json_array() {
        let list: AllowList = serde_json::from_str(r#"["7", "8"]"#).unwrap();
        assert!(list.contains(&id("7")));
        assert!(serde_json::from_str::<AllowList>(r#"["7", " "]"#).is_err());
    }

    #[test]
    fn deserializes_integer_ids_and_separated_string() {
        let list: AllowList = serde_json::from_str("[42, 77]").unwrap();
        assert!(list.contains(&id("42")) && list.contains(&id("77")));

        let list: AllowList = serde_json::from_str(r#""42 77,99""#).unwrap();
        assert_eq!(list.len(), 3);

        let list: AllowList = serde_json::from_str("42").unwrap();
        assert!(list.contains(&id("42")));

        let single: OperatorId = serde_json::from_str("-100123").unwrap();
        assert_eq!(single.as_str(), "-100123");
        assert!(serde_json::from_str::<OperatorId>("true").is_err());
    }
}
