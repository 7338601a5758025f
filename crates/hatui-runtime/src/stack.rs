#![forbid(unsafe_code)]

//! The window stack.
//!
//! An ordered collection of window references with one active (top) entry
//! at index 0. Entries carry a minimized flag; the top entry is never left
//! minimized — every reordering operation clears the flag on whichever
//! entry ends up on top. The stack never owns windows: entries hold ids
//! into the toolkit's window arena, so a hidden window stays alive and can
//! be shown again.

use crate::window::WindowId;
use smallvec::SmallVec;

/// One stack slot: a window reference plus its minimized flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEntry {
    /// The referenced window.
    pub window: WindowId,
    /// Minimized entries are demoted to the back when they reach the top.
    pub minimized: bool,
}

/// Where `move_to` relocates a window's entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveTarget {
    /// An absolute index, in pre-removal coordinates (0 = top).
    Absolute(usize),
    /// An offset toward the top (negative values move away from it).
    Relative(i32),
    /// The back of the stack.
    End,
}

/// Ordered window references; index 0 is the active window.
#[derive(Debug, Default)]
pub struct WindowStack {
    entries: SmallVec<[StackEntry; 4]>,
}

impl WindowStack {
    /// An empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active window, if any.
    #[inline]
    pub fn top(&self) -> Option<WindowId> {
        self.entries.first().map(|e| e.window)
    }

    /// Whether the active entry is minimized.
    #[inline]
    pub fn top_minimized(&self) -> bool {
        self.entries.first().is_some_and(|e| e.minimized)
    }

    /// Number of entries (duplicates included).
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the stack has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry references this window.
    pub fn contains(&self, id: WindowId) -> bool {
        self.entries.iter().any(|e| e.window == id)
    }

    /// Iterate entries from top to back.
    pub fn iter(&self) -> impl Iterator<Item = &StackEntry> {
        self.entries.iter()
    }

    /// Push a window as the new active entry.
    pub(crate) fn push_top(&mut self, id: WindowId) {
        self.entries.insert(
            0,
            StackEntry {
                window: id,
                minimized: false,
            },
        );
    }

    /// Remove every entry referencing `id` (defensive against duplicate
    /// pushes). Returns the count removed; 0 means "not found" and the
    /// stack is untouched.
    pub(crate) fn remove_all(&mut self, id: WindowId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.window != id);
        before - self.entries.len()
    }

    /// Set the minimized flag on the first entry referencing `id`.
    pub(crate) fn set_minimized(&mut self, id: WindowId, minimized: bool) -> bool {
        if let Some(e) = self.entries.iter_mut().find(|e| e.window == id) {
            e.minimized = minimized;
            return true;
        }
        false
    }

    /// Relocate the first entry referencing `id`, preserving its minimized
    /// flag. The entry that ends up on top is un-minimized. Returns
    /// whether the window was found.
    pub(crate) fn move_to(&mut self, id: WindowId, target: MoveTarget) -> bool {
        let Some(old_idx) = self.entries.iter().position(|e| e.window == id) else {
            return false;
        };
        let entry = self.entries.remove(old_idx);

        // Targets are interpreted in pre-removal index space.
        let wanted = match target {
            MoveTarget::Absolute(idx) => idx as i64,
            MoveTarget::Relative(off) => old_idx as i64 - off as i64,
            MoveTarget::End => i64::MAX,
        }
        .max(0) as u64;
        let adjusted = if wanted > old_idx as u64 {
            wanted.saturating_sub(1)
        } else {
            wanted
        };
        let at = (adjusted as usize).min(self.entries.len());
        self.entries.insert(at, entry);

        if let Some(top) = self.entries.first_mut() {
            top.minimized = false;
        }
        true
    }
}
