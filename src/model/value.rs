// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Core value types for Stellar expressions

use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::registry::StellarFunction;

/// Runtime kind of a value flowing through the evaluation stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    /// The literal `null` or an unresolved variable
    Null,
    /// Boolean value
    Boolean,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// UTF-8 string
    String,
    /// Ordered sequence
    List,
    /// Insertion-ordered key/value container
    Map,
    /// Reference to a callable function
    Function,
    /// Pass-through object owned by a function library
    Opaque,
}

impl TypeTag {
    /// Whether this kind takes part in numeric promotion
    #[inline]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TypeTag::Integer | TypeTag::Long | TypeTag::Float | TypeTag::Double
        )
    }

    /// Position in the widening lattice `Integer < Long < Float < Double`
    pub(crate) fn numeric_rank(self) -> Option<u8> {
        match self {
            TypeTag::Integer => Some(0),
            TypeTag::Long => Some(1),
            TypeTag::Float => Some(2),
            TypeTag::Double => Some(3),
            _ => None,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Null => "Null",
            TypeTag::Boolean => "Boolean",
            TypeTag::Integer => "Integer",
            TypeTag::Long => "Long",
            TypeTag::Float => "Float",
            TypeTag::Double => "Double",
            TypeTag::String => "String",
            TypeTag::List => "List",
            TypeTag::Map => "Map",
            TypeTag::Function => "Function",
            TypeTag::Opaque => "Opaque",
        };
        f.write_str(name)
    }
}

/// Dynamically-kinded value produced by expressions and supplied by resolvers
///
/// `Value::Null` only appears nested inside collections or as the unwrapped
/// result of an evaluation; on the stack a null is a [`Token`](super::Token)
/// without a value.
#[derive(Clone)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer
    Integer(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Ordered sequence of values
    List(Vec<Value>),
    /// Insertion-ordered map
    Map(IndexMap<Value, Value>),
    /// Reference to a function
    Function(FunctionRef),
    /// Object passed through the engine untouched
    Opaque(OpaqueValue),
}

impl Value {
    /// Get the runtime kind of this value
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::Boolean(_) => TypeTag::Boolean,
            Value::Integer(_) => TypeTag::Integer,
            Value::Long(_) => TypeTag::Long,
            Value::Float(_) => TypeTag::Float,
            Value::Double(_) => TypeTag::Double,
            Value::String(_) => TypeTag::String,
            Value::List(_) => TypeTag::List,
            Value::Map(_) => TypeTag::Map,
            Value::Function(_) => TypeTag::Function,
            Value::Opaque(_) => TypeTag::Opaque,
        }
    }

    /// Check whether this is the null value
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Build a list value
    pub fn list(values: impl IntoIterator<Item = Value>) -> Self {
        Value::List(values.into_iter().collect())
    }

    /// Build a map value, preserving the order of `entries`
    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Value::Map(entries.into_iter().collect())
    }

    /// Borrow as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get any integral value widened to `i64`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(i64::from(*i)),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Get any numeric value widened to `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(f64::from(*i)),
            Value::Long(l) => Some(*l as f64),
            Value::Float(f) => Some(f64::from(*f)),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Borrow as list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow as map
    pub fn as_map(&self) -> Option<&IndexMap<Value, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow as opaque payload
    pub fn as_opaque(&self) -> Option<&OpaqueValue> {
        match self {
            Value::Opaque(opaque) => Some(opaque),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            // Bitwise so that `Eq` and `Hash` stay lawful for map keys
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_tag().hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Long(l) => l.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Double(d) => d.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::List(items) => items.hash(state),
            // Map equality ignores order, so only the size is hashed
            Value::Map(map) => map.len().hash(state),
            Value::Function(func) => func.hash(state),
            Value::Opaque(opaque) => opaque.hash(state),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Long(l) => write!(f, "{l}L"),
            Value::Float(v) => write!(f, "{v:?}f"),
            Value::Double(d) => write!(f, "{d:?}d"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Map(map) => f.debug_map().entries(map.iter()).finish(),
            Value::Function(func) => write!(f, "{func:?}"),
            Value::Opaque(opaque) => write!(f, "{opaque:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Long(l) => write!(f, "{l}"),
            Value::Float(v) => write_float(f, f64::from(*v)),
            Value::Double(d) => write_float(f, *d),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}={value}")?;
                }
                f.write_str("}")
            }
            Value::Function(func) => write!(f, "{}()", func.name()),
            Value::Opaque(opaque) => f.write_str(opaque.label()),
        }
    }
}

/// Floats always show a fractional part, `5.0` rather than `5`
fn write_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        write!(f, "{value:.1}")
    } else {
        write!(f, "{value}")
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::List(values)
    }
}

impl From<IndexMap<Value, Value>> for Value {
    fn from(map: IndexMap<Value, Value>) -> Self {
        Value::Map(map)
    }
}

impl From<OpaqueValue> for Value {
    fn from(opaque: OpaqueValue) -> Self {
        Value::Opaque(opaque)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Object carried through evaluation without inspection
///
/// Identity is pointer identity: two handles are equal only when they wrap
/// the same allocation.
#[derive(Clone)]
pub struct OpaqueValue {
    label: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl OpaqueValue {
    /// Wrap an object under a descriptive label
    pub fn new<T: Any + Send + Sync>(label: &'static str, value: T) -> Self {
        Self {
            label,
            inner: Arc::new(value),
        }
    }

    /// Label used for display and serialization
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Downcast to the wrapped type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Whether the wrapped object has type `T`
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for OpaqueValue {}

impl Hash for OpaqueValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.inner) as *const () as usize).hash(state);
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})", self.label)
    }
}

/// A named handle on a registered function
#[derive(Clone)]
pub struct FunctionRef {
    name: String,
    function: Arc<dyn StellarFunction>,
}

impl FunctionRef {
    /// Create a reference to `function`
    pub fn new(function: Arc<dyn StellarFunction>) -> Self {
        Self {
            name: function.descriptor().name.clone(),
            function,
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The referenced function
    pub fn function(&self) -> &Arc<dyn StellarFunction> {
        &self.function
    }
}

impl PartialEq for FunctionRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for FunctionRef {}

impl Hash for FunctionRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionRef({})", self.name)
    }
}
