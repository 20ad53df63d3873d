//! Types shared across the dynamic-library boundary.
//!
//! The harness builds a view crate as a dynamic library and calls its
//! exported [`REGISTER_SYMBOL`] function with a [`Registrar`]. Everything
//! passed across that boundary is defined here, in one crate compiled from
//! identical source on both sides, so layouts agree as long as the same
//! toolchain builds both (the harness drives the build itself, so it does).

use std::collections::HashMap;

use ratatui::Frame;
use ratatui::crossterm::event::KeyEvent;

/// Symbol every view artifact must export: `pub fn hotshell_register(&mut Registrar)`.
pub const REGISTER_SYMBOL: &[u8] = b"hotshell_register";

/// Signature of the exported registration function.
pub type RegisterFn = fn(&mut Registrar);

/// Render callback of a component. Plain `fn` — registered code lives in the
/// artifact that created it, which the harness keeps loaded.
pub type ViewFn = fn(&mut Frame<'_>, &mut StateBag);

/// Input callback of a component.
pub type InputFn = fn(KeyEvent, &mut StateBag);

// ============================================================================
// Registrar
// ============================================================================

/// One registered component: identity, declaration signature, callbacks.
pub struct Registration {
    pub identity: String,
    pub signature: String,
    pub view: ViewFn,
    pub input: Option<InputFn>,
}

impl Registration {
    /// Attach an input callback to this registration.
    pub fn input(&mut self, f: InputFn) -> &mut Self {
        self.input = Some(f);
        self
    }
}

/// Collects component registrations from one loaded artifact.
///
/// Handed by the harness to the artifact's [`REGISTER_SYMBOL`] export; the
/// generated registration shim fills it in.
#[derive(Default)]
pub struct Registrar {
    entries: Vec<Registration>,
}

impl Registrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component under a stable identity.
    ///
    /// `signature` is a hash of the component's declaration; the harness
    /// resets the component's state when it changes between reloads.
    pub fn component(
        &mut self,
        identity: impl Into<String>,
        signature: impl Into<String>,
        view: ViewFn,
    ) -> &mut Registration {
        self.entries.push(Registration {
            identity: identity.into(),
            signature: signature.into(),
            view,
            input: None,
        });
        self.entries.last_mut().expect("just pushed")
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Consume the registrar, yielding all registrations.
    pub fn into_entries(self) -> Vec<Registration> {
        self.entries
    }
}

// ============================================================================
// StateBag
// ============================================================================

/// A plain value a component may persist across reloads.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Per-component state that survives reloads.
///
/// Values are restricted to plain owned types so no artifact-defined type
/// ever crosses a generation boundary: the bag outlives the code that wrote
/// into it. Typed accessors return zero values for unset keys, so view code
/// can read state unconditionally.
#[derive(Debug, Default)]
pub struct StateBag {
    values: HashMap<String, Value>,
}

impl StateBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Drop every value. Used by the harness when a component's signature
    /// changed between reloads.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // ------------------------------------------------------------------
    // Typed accessors
    // ------------------------------------------------------------------

    /// Text value, `""` when unset. Suited to input buffers.
    pub fn text(&self, key: &str) -> &str {
        match self.values.get(key) {
            Some(Value::Str(s)) => s,
            _ => "",
        }
    }

    /// Append a character to a text value, creating it if absent.
    pub fn push_char(&mut self, key: &str, c: char) {
        match self.values.get_mut(key) {
            Some(Value::Str(s)) => s.push(c),
            _ => {
                self.values
                    .insert(key.to_owned(), Value::Str(c.to_string()));
            }
        }
    }

    /// Remove the last character of a text value, if any.
    pub fn pop_char(&mut self, key: &str) {
        if let Some(Value::Str(s)) = self.values.get_mut(key) {
            s.pop();
        }
    }

    /// Integer value, `0` when unset. Suited to scroll offsets and counters.
    pub fn int(&self, key: &str) -> i64 {
        match self.values.get(key) {
            Some(Value::Int(v)) => *v,
            _ => 0,
        }
    }

    /// Add `delta` to an integer value, clamping at `min`.
    pub fn add_int(&mut self, key: &str, delta: i64, min: i64) {
        let next = self.int(key).saturating_add(delta).max(min);
        self.values.insert(key.to_owned(), Value::Int(next));
    }

    /// Boolean value, `false` when unset.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(Value::Bool(true)))
    }

    pub fn toggle(&mut self, key: &str) {
        let next = !self.flag(key);
        self.values.insert(key.to_owned(), Value::Bool(next));
    }
}
