// Copyright (c) 2024 Mike Tsao

use super::{Value, ValueKind, VarHandle};
use crate::types::Range;
use core::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

/// A lock-free slot holding one [Value] of a fixed kind.
///
/// Dispatch may run on several threads at once, and the only thing it ever
/// writes is variable values. Each value fits in one 64-bit word, so loads and
/// stores are single relaxed atomic operations. Concurrent writers race, and
/// the last one wins.
pub struct ValueCell {
    kind: ValueKind,
    bits: AtomicU64,
}
impl ValueCell {
    /// Creates a cell whose kind is the kind of the initial value.
    pub fn new(initial: Value) -> Self {
        let kind = initial.kind();
        Self {
            kind,
            bits: AtomicU64::new(Self::encode(kind, initial)),
        }
    }

    /// Creates a cell of the given kind, converting the initial value to it.
    pub fn new_with_kind(kind: ValueKind, initial: Value) -> Self {
        Self {
            kind,
            bits: AtomicU64::new(Self::encode(kind, initial.coerce(kind))),
        }
    }

    #[allow(missing_docs)]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Reads the current value.
    pub fn get(&self) -> Value {
        Self::decode(self.kind, self.bits.load(Ordering::Relaxed))
    }

    /// Converts the value to this cell's kind and stores it. Returns what was
    /// actually stored.
    pub fn set(&self, value: Value) -> Value {
        let value = value.coerce(self.kind);
        if value.is_valid() {
            self.bits
                .store(Self::encode(self.kind, value), Ordering::Relaxed);
        }
        value
    }

    fn encode(kind: ValueKind, value: Value) -> u64 {
        match (kind, value) {
            (ValueKind::Byte, Value::Byte(v)) => v as u64,
            (ValueKind::Int, Value::Int(v)) => v as u32 as u64,
            (ValueKind::Long, Value::Long(v)) => v as u64,
            (ValueKind::Float, Value::Float(v)) => v.to_bits() as u64,
            (ValueKind::Range, Value::Range(r)) => r.to_bits(),
            (ValueKind::VariableRef, Value::Ref(h)) => h.0 as u64,
            _ => 0,
        }
    }

    fn decode(kind: ValueKind, bits: u64) -> Value {
        match kind {
            ValueKind::Byte => Value::Byte(bits as u8),
            ValueKind::Int => Value::Int(bits as u32 as i32),
            ValueKind::Long => Value::Long(bits as i64),
            ValueKind::Float => Value::Float(f32::from_bits(bits as u32)),
            ValueKind::Range => Value::Range(Range::from_bits(bits)),
            ValueKind::VariableRef => Value::Ref(VarHandle(bits as usize)),
            ValueKind::Variable | ValueKind::Invalid => Value::Invalid,
        }
    }
}
impl fmt::Debug for ValueCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCell")
            .field("kind", &self.kind)
            .field("value", &self.get())
            .finish()
    }
}
