use std::collections::HashMap;

pub struct StringTable {
    by_values: HashMap<String, usize>,
    counter: usize,
}

impl StringTable {
    const SENTINEL_ID: usize = 0;

    pub fn new() -> Self {
        Self {
            by_values: HashMap::new(),
            counter: 1,
        }
    }

    /// Resolves an already interned string. Unknown strings map to a
    /// sentinel that never compares equal to any interned id.
    pub fn get(&self, value: &str) -> StringId {
        let index = self
            .by_values
            .get(value)
            .cloned()
            .unwrap_or(Self::SENTINEL_ID);
        StringId(index)
    }

    pub(crate) fn get_or_update(&mut self, value: &str) -> StringId {
        let counter = self.by_values.entry(value.to_string()).or_insert_with(|| {
            let counter = self.counter;
            self.counter += 1;
            counter
        });

        StringId(*counter)
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, Debug)]
pub struct StringId(usize);
