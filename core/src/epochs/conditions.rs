use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::prelude::{StageError, StageResult};

/// A named experimental condition and the event code that marks its trials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    pub id: i64,
}

/// Condition name → identifier mapping, held sorted by ascending identifier.
///
/// Iteration order is the processing order of the whole pipeline, so the
/// report and the manifest list conditions in the same order regardless of
/// how the input file ordered its keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionMap {
    conditions: Vec<Condition>,
}

impl ConditionMap {
    pub fn new<I>(pairs: I) -> StageResult<Self>
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        let mut conditions: Vec<Condition> = pairs
            .into_iter()
            .map(|(name, id)| Condition { name, id })
            .collect();

        let mut seen = HashSet::new();
        for condition in &conditions {
            if !seen.insert(condition.id) {
                return Err(StageError::Parse(format!(
                    "event identifier {} is assigned to more than one condition",
                    condition.id
                )));
            }
        }

        conditions.sort_by_key(|condition| condition.id);
        Ok(Self { conditions })
    }

    pub fn from_event_id(event_id: &BTreeMap<String, i64>) -> StageResult<Self> {
        Self::new(event_id.iter().map(|(name, id)| (name.clone(), *id)))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Condition> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn contains_id(&self, id: i64) -> bool {
        self.conditions.iter().any(|condition| condition.id == id)
    }

    pub fn get(&self, name: &str) -> Option<&Condition> {
        self.conditions.iter().find(|condition| condition.name == name)
    }
}

impl<'a> IntoIterator for &'a ConditionMap {
    type Item = &'a Condition;
    type IntoIter = std::slice::Iter<'a, Condition>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
