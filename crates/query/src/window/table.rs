//! Per-window group state.

use crate::aggregate::AggregateSpec;
use hashbrown::HashMap;
use rivulet_core::{Error, Result, Value};
use rivulet_incremental::Accumulator;

/// A flushed group: its first record and one result per aggregate.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupRow {
    pub sample: Value,
    pub aggregates: Vec<Value>,
}

#[derive(Debug)]
struct Group {
    sample: Value,
    accumulators: Vec<Box<dyn Accumulator>>,
}

/// Groups of one window instance, in order of first appearance.
#[derive(Debug, Default)]
pub struct GroupTable {
    groups: Vec<Group>,
    index: HashMap<Vec<Value>, usize>,
}

impl GroupTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Fails with `GroupLimit` if `key` would open a group beyond `max_groups`.
    pub fn admits(&self, key: &[Value], max_groups: Option<usize>) -> Result<()> {
        match max_groups {
            Some(limit) if !self.index.contains_key(key) && self.groups.len() >= limit => {
                Err(Error::GroupLimit { limit })
            }
            _ => Ok(()),
        }
    }

    /// Merges one record into the group for `key`.
    ///
    /// `operands` holds the evaluated operand of every spec. Opening a group beyond
    /// `max_groups` fails with `GroupLimit`.
    pub fn update(
        &mut self,
        key: &[Value],
        row: &Value,
        operands: &[Value],
        specs: &[AggregateSpec],
        max_groups: Option<usize>,
    ) -> Result<()> {
        let slot = match self.index.get(key) {
            Some(&slot) => slot,
            None => {
                self.admits(key, max_groups)?;
                self.groups.push(Group {
                    sample: row.clone(),
                    accumulators: specs.iter().map(AggregateSpec::accumulator).collect(),
                });
                self.index.insert(key.to_vec(), self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[slot];
        for (acc, operand) in group.accumulators.iter_mut().zip(operands) {
            acc.update(operand)?;
        }
        Ok(())
    }

    /// Finishes every group.
    pub fn finish(self) -> Vec<GroupRow> {
        self.groups
            .into_iter()
            .map(|group| GroupRow {
                sample: group.sample,
                aggregates: group.accumulators.iter().map(|acc| acc.finish()).collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivulet_incremental::{IncrementalCount, IncrementalSum};

    fn specs() -> Vec<AggregateSpec> {
        vec![
            AggregateSpec::new(None, || Box::new(IncrementalCount::rows()) as Box<dyn Accumulator>),
            AggregateSpec::new(None, || Box::new(IncrementalSum::new()) as Box<dyn Accumulator>),
        ]
    }

    #[test]
    fn test_groups_keep_first_appearance_order() {
        let specs = specs();
        let mut table = GroupTable::new();
        for (key, v) in [("b", 1i64), ("a", 2), ("b", 3)] {
            let key = [Value::from(key)];
            table
                .update(&key, &Value::Int64(v), &[Value::Null, Value::Int64(v)], &specs, None)
                .unwrap();
        }
        assert_eq!(table.len(), 2);
        let rows = table.finish();
        assert_eq!(
            rows[0],
            GroupRow {
                sample: Value::Int64(1),
                aggregates: vec![Value::Int64(2), Value::Int64(4)],
            }
        );
        assert_eq!(rows[1].sample, Value::Int64(2));
    }

    #[test]
    fn test_group_limit() {
        let specs = specs();
        let mut table = GroupTable::new();
        let operands = [Value::Null, Value::Null];
        table.update(&[Value::Int64(1)], &Value::Null, &operands, &specs, Some(1)).unwrap();
        // existing keys are still accepted
        table.update(&[Value::Int64(1)], &Value::Null, &operands, &specs, Some(1)).unwrap();
        let err = table
            .update(&[Value::Int64(2)], &Value::Null, &operands, &specs, Some(1))
            .unwrap_err();
        assert_eq!(err, Error::GroupLimit { limit: 1 });
    }
}
