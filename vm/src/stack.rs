use t3_object::Value;

/// Operand stack shared by byte-code and intrinsic calls.
///
/// Callers push arguments last-to-first, so argument 0 is on top.
#[derive(Debug, Clone, Default)]
pub struct ValueStack {
    values: Vec<Value>,
}

impl ValueStack {
    #[must_use]
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Active values, bottom first.
    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    #[inline]
    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Value> {
        self.values.pop()
    }

    /// Gets the nth value from the top of the stack (0-indexed)
    #[must_use]
    pub fn get(&self, n: usize) -> Option<Value> {
        let idx = self.values.len().checked_sub(n + 1)?;
        self.values.get(idx).copied()
    }

    /// Sets the value at n from the top of the stack
    pub fn set(&mut self, n: usize, value: Value) {
        if let Some(idx) = self.values.len().checked_sub(n + 1) {
            self.values[idx] = value;
        }
    }

    /// Drops up to `n` values from the top.
    pub fn discard(&mut self, n: usize) {
        let keep = self.values.len().saturating_sub(n);
        self.values.truncate(keep);
    }

    /// Pushes call arguments so that `args[0]` ends up on top.
    pub fn push_args(&mut self, args: &[Value]) {
        self.values.extend(args.iter().rev());
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
