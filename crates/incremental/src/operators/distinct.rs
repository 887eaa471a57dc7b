//! COUNT(DISTINCT x).

use crate::accumulator::Accumulator;
use hashbrown::HashSet;
use rivulet_core::{Result, Value};

/// Counts distinct non-null operands.
///
/// Operands are normalized first, so `Int32(1)` and `Int64(1)` count once.
#[derive(Clone, Debug, Default)]
pub struct IncrementalCountDistinct {
    seen: HashSet<Value>,
}

impl IncrementalCountDistinct {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Accumulator for IncrementalCountDistinct {
    fn update(&mut self, value: &Value) -> Result<()> {
        if !value.is_null() {
            self.seen.insert(value.clone().normalized());
        }
        Ok(())
    }

    fn finish(&self) -> Value {
        Value::Int64(self.seen.len() as i64)
    }
}
