use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use indexmap::IndexMap;

/// A deferred callback. Failures are reported, never retried.
pub type Task = Box<dyn FnOnce() -> anyhow::Result<()>>;

/// Identifies a pending animation-frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// Microtask queue plus animation-frame callbacks, driven explicitly.
///
/// Nothing runs on its own: the embedder calls
/// [`perform_microtask_checkpoint`](Self::perform_microtask_checkpoint) and
/// [`run_animation_frame`](Self::run_animation_frame), or
/// [`run_until_idle`](Self::run_until_idle).
pub struct EventLoop {
    microtasks: RefCell<VecDeque<Task>>,
    frames: RefCell<IndexMap<FrameHandle, Task>>,
    next_frame: Cell<u64>,
    errors: RefCell<Vec<anyhow::Error>>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self {
            microtasks: RefCell::new(VecDeque::new()),
            frames: RefCell::new(IndexMap::new()),
            next_frame: Cell::new(1),
            errors: RefCell::new(Vec::new()),
        }
    }
}

impl EventLoop {
    pub fn queue_microtask(&self, task: impl FnOnce() -> anyhow::Result<()> + 'static) {
        self.microtasks.borrow_mut().push_back(Box::new(task));
    }

    pub fn request_animation_frame(
        &self,
        task: impl FnOnce() -> anyhow::Result<()> + 'static,
    ) -> FrameHandle {
        let handle = FrameHandle(self.next_frame.get());
        self.next_frame.set(handle.0 + 1);
        self.frames.borrow_mut().insert(handle, Box::new(task));
        handle
    }

    /// Returns whether the callback was still pending.
    pub fn cancel_animation_frame(&self, handle: FrameHandle) -> bool {
        self.frames.borrow_mut().shift_remove(&handle).is_some()
    }

    pub fn pending_microtasks(&self) -> usize {
        self.microtasks.borrow().len()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Run microtasks until the queue is empty, including ones queued while
    /// draining. Returns how many ran.
    pub fn perform_microtask_checkpoint(&self) -> usize {
        let mut ran = 0;
        loop {
            let Some(task) = self.microtasks.borrow_mut().pop_front() else {
                break;
            };
            self.run(task);
            ran += 1;
        }
        ran
    }

    /// Run every frame callback registered before this frame started, with a
    /// microtask checkpoint after each. Callbacks requested during the frame
    /// wait for the next one. Returns how many callbacks ran.
    pub fn run_animation_frame(&self) -> usize {
        self.perform_microtask_checkpoint();
        let handles: Vec<FrameHandle> = self.frames.borrow().keys().copied().collect();
        let mut ran = 0;
        for handle in handles {
            // cancelled by an earlier callback of this frame
            let Some(task) = self.frames.borrow_mut().shift_remove(&handle) else {
                continue;
            };
            self.run(task);
            ran += 1;
            self.perform_microtask_checkpoint();
        }
        tracing::trace!(ran, "animation frame");
        ran
    }

    /// Alternate checkpoints and frames until nothing is pending.
    pub fn run_until_idle(&self) {
        while self.pending_microtasks() > 0 || self.pending_frames() > 0 {
            self.run_animation_frame();
        }
    }

    fn run(&self, task: Task) {
        if let Err(err) = task() {
            self.report(err);
        }
    }

    pub fn report(&self, err: anyhow::Error) {
        tracing::error!("uncaught error in callback: {err:#}");
        self.errors.borrow_mut().push(err);
    }

    pub fn take_errors(&self) -> Vec<anyhow::Error> {
        self.errors.take()
    }
}
