//! Nesting depth for update windows.
//!
//! The counter alone guarantees that at most one deferred close is ever
//! pending: a queued close opens a window, and every further queue request
//! while any window is open is absorbed by it.

/// Update-window depth counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateCoalescer {
    depth: usize,
}

impl UpdateCoalescer {
    /// Create a counter at depth 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether any update window is open.
    pub fn is_active(&self) -> bool {
        self.depth > 0
    }

    /// Whether the next close ends the outermost window.
    pub fn closes_outermost(&self) -> bool {
        self.depth == 1
    }

    /// Open a window. Returns the new depth.
    pub fn begin(&mut self) -> usize {
        self.depth += 1;
        self.depth
    }

    /// Close a window. Returns the new depth, or `None` when no window was
    /// open.
    pub fn end(&mut self) -> Option<usize> {
        self.depth = self.depth.checked_sub(1)?;
        Some(self.depth)
    }

    /// Open a window on behalf of a deferred close, unless one is already
    /// open. Returns whether the caller must schedule that close.
    pub fn try_queue(&mut self) -> bool {
        if self.is_active() {
            return false;
        }
        self.begin();
        true
    }
}
