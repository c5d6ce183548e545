//! Frame Scheduler
//!
//! The engine is synchronous with exactly one yield point: a `for` region
//! mounts its list and applies its first patch on the next frame, once the
//! region's anchors are guaranteed to sit in their final position.
//!
//! Frames are driven by the embedder. [`FrameScheduler::run_frame`] runs the
//! tasks that were queued before it was called; tasks queued while a frame
//! runs (for example, a nested list rendered by an outer list) wait for the
//! following frame. [`FrameScheduler::flush`] runs frames until idle.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

type Task = Box<dyn FnOnce()>;

/// Queue of work deferred to the next frame.
#[derive(Default)]
pub struct FrameScheduler {
    queue: RefCell<VecDeque<Task>>,
    frames: Cell<u64>,
}

impl FrameScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` for the next frame.
    pub fn request_frame<F>(&self, task: F)
    where
        F: FnOnce() + 'static,
    {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Number of tasks waiting for a frame.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Number of frames run so far.
    pub fn frame_count(&self) -> u64 {
        self.frames.get()
    }

    /// Run one frame. Returns the number of tasks executed.
    pub fn run_frame(&self) -> usize {
        let tasks = std::mem::take(&mut *self.queue.borrow_mut());
        self.frames.set(self.frames.get() + 1);

        let count = tasks.len();
        if count > 0 {
            tracing::trace!(frame = self.frames.get(), tasks = count, "running frame");
        }
        for task in tasks {
            task();
        }
        count
    }

    /// Run frames until no task is pending. Returns the total task count.
    pub fn flush(&self) -> usize {
        let mut total = 0;
        while self.pending() > 0 {
            total += self.run_frame();
        }
        total
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("pending", &self.pending())
            .field("frames", &self.frames.get())
            .finish()
    }
}
