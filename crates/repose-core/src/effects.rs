use std::cell::RefCell;
use std::rc::Rc;

/// A shared, run-at-most-once cleanup or completion.
///
/// Clones share the same slot: whichever clone runs or cancels first wins,
/// and every later call is a no-op.
#[derive(Clone)]
pub struct Dispose(Rc<RefCell<Option<Box<dyn FnOnce()>>>>);

impl Dispose {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(f)))))
    }

    /// Runs at most once (safe to call multiple times).
    pub fn run(&self) {
        // Take first so `f` may touch this Dispose again.
        let f = self.0.borrow_mut().take();
        if let Some(f) = f {
            f()
        }
    }

    /// Drops the closure without running it. Returns `true` if it was still armed.
    pub fn cancel(&self) -> bool {
        let f = self.0.borrow_mut().take();
        f.is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.0.borrow().is_some()
    }

    pub fn ptr_eq(&self, other: &Dispose) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Dispose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispose")
            .field("armed", &self.is_armed())
            .finish()
    }
}

