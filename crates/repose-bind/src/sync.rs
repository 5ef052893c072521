use smallvec::SmallVec;

pub type SyncCallback = Box<dyn FnOnce()>;

/// Callbacks waiting for a view to match its source again.
///
/// The barrier never runs callbacks itself: [`release_if`](Self::release_if)
/// hands them back so the owner can fire them once its own borrows are gone.
#[derive(Default)]
pub struct SyncBarrier {
    mounted: bool,
    pending: SmallVec<[SyncCallback; 2]>,
}

impl SyncBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self) {
        self.mounted = true;
    }

    /// Drops every pending callback without running it.
    pub fn unmount(&mut self) {
        self.mounted = false;
        if !self.pending.is_empty() {
            log::debug!("discarding {} pending sync callbacks", self.pending.len());
            self.pending.clear();
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Queues `callback`. Returns `false`, dropping it, when not mounted.
    pub fn register(&mut self, callback: SyncCallback) -> bool {
        if !self.mounted {
            return false;
        }
        self.pending.push(callback);
        true
    }

    pub fn is_waiting(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Takes every pending callback if `in_sync` holds. `in_sync` is not
    /// evaluated when nothing is waiting.
    pub fn release_if(&mut self, in_sync: impl FnOnce() -> bool) -> SmallVec<[SyncCallback; 2]> {
        if self.pending.is_empty() || !in_sync() {
            return SmallVec::new();
        }
        std::mem::take(&mut self.pending)
    }
}
