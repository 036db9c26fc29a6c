use crate::types::value::Value;

/// Mutable single-value cell bound to one output column of a cursor.
///
/// A task allocates its holders once and overwrites them every time it
/// advances, so streaming a row never allocates a fresh row vector. `valid`
/// is false until the first successful advance and after exhaustion.
#[derive(Debug, Clone, Default)]
pub struct Holder {
    value: Value,
    valid: bool,
}

impl Holder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(count: usize) -> Vec<Holder> {
        vec![Holder::new(); count]
    }

    pub fn set(&mut self, value: Value) {
        self.value = value;
        self.valid = true;
    }

    pub fn set_null(&mut self) {
        self.set(Value::Null);
    }

    pub fn invalidate(&mut self) {
        self.value = Value::Null;
        self.valid = false;
    }

    pub fn get(&self) -> &Value {
        &self.value
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

pub fn invalidate_all(holders: &mut [Holder]) {
    holders.iter_mut().for_each(Holder::invalidate);
}

pub fn snapshot(holders: &[Holder]) -> Vec<Value> {
    holders.iter().map(|h| h.get().clone()).collect()
}
