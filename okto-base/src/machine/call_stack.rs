/// The fixed-depth stack of return addresses.
///
/// Push and pop report failure instead of wrapping: exceeding the depth is a
/// ROM or machine bug and surfaces as a fatal error from `step`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CallStack {
    vec: Vec<u16>,
    max_len: usize,
}

impl CallStack {
    /// Call depth of the reference machine.
    pub const DEPTH: usize = 16;

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            vec: Vec::with_capacity(max_len),
            max_len,
        }
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn pop(&mut self) -> Option<u16> {
        self.vec.pop()
    }

    #[must_use]
    pub fn push(&mut self, address: u16) -> bool {
        if self.vec.len() < self.max_len {
            self.vec.push(address);
            true
        } else {
            false
        }
    }
}

impl From<Vec<u16>> for CallStack {
    fn from(vec: Vec<u16>) -> Self {
        Self {
            vec,
            max_len: Self::DEPTH,
        }
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::with_max_len(Self::DEPTH)
    }
}
