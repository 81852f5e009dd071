//! Compact rendering of equipment ids in log lines.
//!
//! Equipment ids coming from real networks are long; the dictionary maps them to
//! short aliases for display. Nothing algorithmic ever looks at the aliases.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::equipment::Equipment;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortIdDictionary {
    aliases: BTreeMap<String, String>,
}

impl ShortIdDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds aliases `0`, `1`, ... for the ids in sorted order.
    pub fn generate<'a, I: IntoIterator<Item = &'a str>>(ids: I) -> Self {
        let mut sorted: Vec<&str> = ids.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();
        Self {
            aliases: sorted
                .into_iter()
                .enumerate()
                .map(|(i, id)| (id.to_string(), i.to_string()))
                .collect(),
        }
    }

    pub fn insert(&mut self, id: impl Into<String>, alias: impl Into<String>) {
        self.aliases.insert(id.into(), alias.into());
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Alias of `id`, or `id` itself when unknown.
    pub fn get<'a>(&'a self, id: &'a str) -> &'a str {
        self.aliases.get(id).map(String::as_str).unwrap_or(id)
    }

    pub fn display<'a>(&'a self, equipment: &'a Equipment) -> ShortEquipment<'a> {
        ShortEquipment {
            dictionary: self,
            equipment,
        }
    }

    /// Renders a list of ids, comma separated.
    pub fn join<'a, I: IntoIterator<Item = &'a str>>(&'a self, ids: I) -> String {
        ids.into_iter()
            .map(|id| self.get(id))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// [`fmt::Display`] adapter for an equipment through a dictionary.
pub struct ShortEquipment<'a> {
    dictionary: &'a ShortIdDictionary,
    equipment: &'a Equipment,
}

impl fmt::Display for ShortEquipment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.dictionary.get(&self.equipment.id);
        if self.equipment.index == 0 {
            write!(f, "{id}")
        } else {
            write!(f, "{id}#{}", self.equipment.index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_id_renders_as_is() {
        let dict = ShortIdDictionary::new();
        assert_eq!(dict.get("LONG.LINE.ID"), "LONG.LINE.ID");
    }

    #[test]
    fn test_generate_is_sorted_and_deduplicated() {
        let dict = ShortIdDictionary::generate(["B", "A", "B"]);
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get("A"), "0");
        assert_eq!(dict.join(["B", "C"]), "1, C");
    }

    #[test]
    fn test_display_keeps_duplicate_index() {
        let mut dict = ShortIdDictionary::new();
        dict.insert("LONG.LINE.ID", "L");
        let eq = Equipment::new("LONG.LINE.ID").with_index(1);
        assert_eq!(dict.display(&eq).to_string(), "L#1");
    }
}
