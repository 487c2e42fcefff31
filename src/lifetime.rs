// src/lifetime.rs

//! Liveness tracking for handles handed out by a `System`.
//!
//! Every display, surface and font carries a `HandleToken` tied to the
//! `Lifetime` of the `System` that created it. Disposing the `System` flips
//! the lifetime to dead, after which every token reports `Disposed` instead
//! of touching released native resources. Tokens are `Rc`-based: handles are
//! bound to the thread that owns the `System`.

use crate::error::{Result, SystemError};
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandleKind {
    Display,
    Surface,
    BackingSurface,
    Font,
}

#[derive(Debug)]
pub(crate) struct Lifetime {
    alive: Cell<bool>,
    displays: Cell<usize>,
    surfaces: Cell<usize>,
}

impl Lifetime {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            alive: Cell::new(true),
            displays: Cell::new(0),
            surfaces: Cell::new(0),
        })
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.get()
    }

    pub(crate) fn invalidate(&self) {
        self.alive.set(false);
    }

    /// Live (displays, surfaces) created through this lifetime.
    pub(crate) fn outstanding(&self) -> (usize, usize) {
        (self.displays.get(), self.surfaces.get())
    }

    fn counter(&self, kind: HandleKind) -> Option<&Cell<usize>> {
        match kind {
            HandleKind::Display => Some(&self.displays),
            HandleKind::Surface => Some(&self.surfaces),
            // Owned by a display or by the FontManager, not by callers.
            HandleKind::BackingSurface | HandleKind::Font => None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct HandleToken {
    lifetime: Rc<Lifetime>,
    kind: HandleKind,
}

impl HandleToken {
    pub(crate) fn new(lifetime: &Rc<Lifetime>, kind: HandleKind) -> Self {
        if let Some(counter) = lifetime.counter(kind) {
            counter.set(counter.get() + 1);
        }
        Self {
            lifetime: Rc::clone(lifetime),
            kind,
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.lifetime.is_alive()
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.lifetime.is_alive() {
            Ok(())
        } else {
            Err(SystemError::Disposed)
        }
    }
}

impl Clone for HandleToken {
    fn clone(&self) -> Self {
        Self::new(&self.lifetime, self.kind)
    }
}

impl Drop for HandleToken {
    fn drop(&mut self) {
        if let Some(counter) = self.lifetime.counter(self.kind) {
            counter.set(counter.get().saturating_sub(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_count_live_tokens_per_kind() {
        let lifetime = Lifetime::new();
        let d = HandleToken::new(&lifetime, HandleKind::Display);
        let s1 = HandleToken::new(&lifetime, HandleKind::Surface);
        let _s2 = s1.clone();
        let _f = HandleToken::new(&lifetime, HandleKind::Font);
        assert_eq!(lifetime.outstanding(), (1, 2));
        drop(d);
        drop(s1);
        assert_eq!(lifetime.outstanding(), (0, 1));
    }

    #[test]
    fn it_should_report_disposed_after_invalidation() {
        let lifetime = Lifetime::new();
        let token = HandleToken::new(&lifetime, HandleKind::Surface);
        assert!(token.check().is_ok());
        lifetime.invalidate();
        assert!(matches!(token.check(), Err(SystemError::Disposed)));
        assert!(!token.is_alive());
    }
}
