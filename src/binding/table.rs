// Copyright (c) 2024 Mike Tsao

use super::CompiledClause;
use crate::{
    error::DispatchError,
    events::{Event, EventSchema, EventType},
    variables::VariableStore,
};
use rustc_hash::FxHashMap;

/// One compiled rule: the output it produces, when it applies, and how the
/// output's dynamic fields are computed.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    prototype: Event,
    echo: bool,
    conditions: Vec<CompiledClause>,
    assignments: Vec<CompiledClause>,
    continued: bool,
}
impl Binding {
    /// `prototype` is the output event with every static field already
    /// filled in.
    pub fn new(
        prototype: Event,
        echo: bool,
        conditions: Vec<CompiledClause>,
        assignments: Vec<CompiledClause>,
    ) -> Self {
        Self {
            prototype,
            echo,
            conditions,
            assignments,
            continued: false,
        }
    }

    #[allow(missing_docs)]
    pub fn prototype(&self) -> &Event {
        &self.prototype
    }

    /// Whether the input should be rebroadcast as an echo when this binding
    /// matches. Only meaningful on the first binding of a chain.
    pub fn echo(&self) -> bool {
        self.echo
    }

    #[allow(missing_docs)]
    pub fn conditions(&self) -> &[CompiledClause] {
        &self.conditions
    }

    #[allow(missing_docs)]
    pub fn assignments(&self) -> &[CompiledClause] {
        &self.assignments
    }

    /// True if the next binding in the bucket fires along with this one.
    pub fn is_continued(&self) -> bool {
        self.continued
    }

    /// Every condition holds. Stops at the first that doesn't.
    pub fn matches(&self, event: &Event, vars: &VariableStore) -> bool {
        self.conditions.iter().all(|c| c.matches(event, vars))
    }

    /// Fills `output` with this binding's action for the given input.
    pub fn synthesize(&self, input: &Event, vars: &VariableStore, output: &mut Event) {
        output.copy_from(&self.prototype);
        for a in self.assignments.iter() {
            a.assign(input, vars, output);
        }
    }
}

/// Which bucket a rule goes in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BucketSlot {
    /// The indexed field's value, already reduced modulo the field's
    /// `max_index`.
    Indexed(usize),
    /// The bucket scanned when the indexed bucket has no match, or the only
    /// bucket of an unindexed type.
    Wildcard,
}

#[derive(Debug)]
struct BucketSet {
    buckets: Vec<Vec<Binding>>,
    indexed: Option<(usize, u32)>,
}
impl BucketSet {
    fn new(schema: &EventSchema) -> Self {
        let indexed = schema
            .indexed_param()
            .and_then(|p| p.max_index.map(|max| (p.index, max)));
        let count = indexed.map_or(1, |(_, max)| max as usize + 1);
        Self {
            buckets: (0..count).map(|_| Vec::default()).collect(),
            indexed,
        }
    }

    fn wildcard(&self) -> usize {
        self.buckets.len() - 1
    }

    fn position(&self, slot: BucketSlot) -> usize {
        match (slot, self.indexed) {
            (BucketSlot::Indexed(i), Some((_, max))) => i % max as usize,
            _ => self.wildcard(),
        }
    }

    fn primary(&self, event: &Event) -> Result<Option<usize>, DispatchError> {
        let Some((index, max)) = self.indexed else {
            return Ok(None);
        };
        let value = event.field(index);
        if !value.is_scalar() {
            return Err(DispatchError::IndexNotScalar(event.event_type()));
        }
        Ok(value
            .as_i64()
            .map(|v| v.rem_euclid(max as i64) as usize))
    }
}

/// Finds the first binding in `chain` that matches, and returns it together
/// with the bindings continued from it. A head that fails takes its
/// continuation with it.
fn scan<'a>(chain: &'a [Binding], event: &Event, vars: &VariableStore) -> Option<&'a [Binding]> {
    let mut i = 0;
    while i < chain.len() {
        let mut end = i;
        while chain[end].continued && end + 1 < chain.len() {
            end += 1;
        }
        if chain[i].matches(event, vars) {
            return Some(&chain[i..=end]);
        }
        i = end + 1;
    }
    None
}

/// Every compiled binding, hashed by input type and then by the value of the
/// type's indexed field. Built once during configuration and read-only
/// afterward.
#[derive(Debug, Default)]
pub struct BindingTable {
    tables: FxHashMap<EventType, BucketSet>,
    len: usize,
}
impl BindingTable {
    /// Appends a chain of bindings to the given bucket of the schema's type.
    /// Every binding but the last is marked continued. Bucket storage for a
    /// type is allocated the first time it is needed.
    pub fn insert(&mut self, schema: &EventSchema, slot: BucketSlot, mut chain: Vec<Binding>) {
        let n = chain.len();
        for (i, b) in chain.iter_mut().enumerate() {
            b.continued = i + 1 < n;
        }
        let set = self
            .tables
            .entry(schema.event_type())
            .or_insert_with(|| BucketSet::new(schema));
        let position = set.position(slot);
        set.buckets[position].extend(chain);
        self.len += n;
    }

    /// The matching chain for a live event: first from the bucket its indexed
    /// field selects, then from the wildcard bucket. An indexed field that
    /// doesn't hold a scalar is an error, and no bucket is scanned.
    pub fn find<'a>(
        &'a self,
        event: &Event,
        vars: &VariableStore,
    ) -> Result<Option<&'a [Binding]>, DispatchError> {
        let Some(set) = self.tables.get(&event.event_type()) else {
            return Ok(None);
        };
        if let Some(i) = set.primary(event)? {
            if let Some(found) = scan(&set.buckets[i], event, vars) {
                return Ok(Some(found));
            }
        }
        Ok(scan(&set.buckets[set.wildcard()], event, vars))
    }

    /// The bindings in one bucket, in declaration order.
    pub fn bucket(&self, event_type: EventType, slot: BucketSlot) -> &[Binding] {
        self.tables
            .get(&event_type)
            .map(|set| set.buckets[set.position(slot)].as_slice())
            .unwrap_or_default()
    }

    /// Number of buckets allocated for a type, including the wildcard.
    pub fn bucket_count(&self, event_type: EventType) -> usize {
        self.tables.get(&event_type).map_or(0, |set| set.buckets.len())
    }

    /// Total number of bindings.
    pub fn len(&self) -> usize {
        self.len
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
