use std::{
    collections::HashMap,
    mem,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use {
    async_trait::async_trait,
    tokio::time::{Instant, sleep_until, timeout},
    tokio_util::{sync::CancellationToken, task::TaskTracker},
    tracing::debug,
};

use crate::SubmissionKey;

/// Receives each completed submission exactly once.
#[async_trait]
pub trait SubmissionHandler<I>: Send + Sync {
    /// `images` is non-empty and in arrival order.
    async fn on_submission(&self, key: SubmissionKey, images: Vec<I>);
}

/// Buffered images of one key plus the timer currently watching them.
struct Pending<I> {
    images: Vec<I>,
    generation: u64,
    timer: CancellationToken,
    /// Open [`Slot`]s. No timer runs while this is non-zero.
    reserved: usize,
}

impl<I> Pending<I> {
    fn new() -> Self {
        Self {
            images: Vec::new(),
            generation: 0,
            timer: CancellationToken::new(),
            reserved: 0,
        }
    }
}

struct State<I> {
    pending: HashMap<SubmissionKey, Pending<I>>,
    /// Monotonic across keys, so a timer from a removed entry can never match
    /// a later entry for the same key.
    next_generation: u64,
}

impl<I> State<I> {
    /// Stop the key's current timer and claim a new generation for it.
    /// Creates the entry when absent.
    fn restart(&mut self, key: &SubmissionKey) -> (&mut Pending<I>, u64, CancellationToken) {
        let generation = self.next_generation;
        self.next_generation += 1;
        let token = CancellationToken::new();
        let entry = self.pending.entry(key.clone()).or_insert_with(Pending::new);
        entry.generation = generation;
        mem::replace(&mut entry.timer, token.clone()).cancel();
        (entry, generation, token)
    }
}

struct Inner<I> {
    delay: Duration,
    handler: Arc<dyn SubmissionHandler<I>>,
    state: Mutex<State<I>>,
    /// Timers and the handler calls they lead to.
    tasks: TaskTracker,
}

impl<I: Send + 'static> Inner<I> {
    fn state(&self) -> MutexGuard<'_, State<I>> {
        // The guarded map is always left consistent, so a poisoned lock is
        // still safe to use.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Remove the buffer for `key` if the timer that owns it is `generation`.
    ///
    /// This is the single hand-off point: whoever removes the entry under the
    /// lock owns its images, and nobody else can see them afterwards.
    fn take_if_current(&self, key: &SubmissionKey, generation: u64) -> Option<Vec<I>> {
        let mut state = self.state();
        let current = state
            .pending
            .get(key)
            .is_some_and(|entry| entry.generation == generation);
        if !current {
            return None;
        }
        state.pending.remove(key).map(|entry| entry.images)
    }

    /// Add `image` (if any) to the buffer for `key`, optionally closing one
    /// slot, then restart the timer when nothing else is outstanding.
    ///
    /// Closing an empty slot on a key that is no longer pending is a no-op.
    fn settle(self: &Arc<Self>, key: SubmissionKey, image: Option<I>, close_slot: bool) {
        let armed = {
            let mut state = self.state();
            if image.is_none() && !state.pending.contains_key(&key) {
                return;
            }
            let (entry, generation, token) = state.restart(&key);
            if let Some(image) = image {
                entry.images.push(image);
            }
            if close_slot {
                entry.reserved = entry.reserved.saturating_sub(1);
            }
            let buffered = entry.images.len();
            let reserved = entry.reserved;
            if reserved > 0 {
                debug!(%key, buffered, reserved, "image buffered, waiting for open slots");
                None
            } else if buffered == 0 {
                state.pending.remove(&key);
                None
            } else {
                Some((generation, token, buffered))
            }
        };

        if let Some((generation, token, buffered)) = armed {
            debug!(%key, generation, buffered, "image buffered, debounce restarted");
            let deadline = Instant::now() + self.delay;
            self.tasks.spawn(run_timer(
                Arc::clone(self),
                key,
                generation,
                deadline,
                token,
            ));
        }
    }
}

/// Per-key debounce buffer.
///
/// Every [`enqueue`](Self::enqueue) restarts the key's timer. When a timer
/// survives its full delay, the key's images are removed and passed to the
/// handler on the timer's task. An image enqueued after that removal starts a
/// fresh buffer, so each image reaches exactly one handler call.
///
/// The lock is held only for map updates, never across an await. Different
/// keys never wait on each other's timers or handlers.
pub struct Aggregator<I> {
    inner: Arc<Inner<I>>,
}

impl<I> Clone for Aggregator<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I: Send + 'static> Aggregator<I> {
    pub fn new(delay: Duration, handler: Arc<dyn SubmissionHandler<I>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                delay,
                handler,
                state: Mutex::new(State {
                    pending: HashMap::new(),
                    next_generation: 0,
                }),
                tasks: TaskTracker::new(),
            }),
        }
    }

    /// Append `image` to the buffer for `key` and restart its timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue(&self, key: SubmissionKey, image: I) {
        self.inner.settle(key, Some(image), false);
    }

    /// Hold the submission for `key` open until the returned slot is filled
    /// or dropped.
    ///
    /// Use this when an image is known to be coming but is not available yet,
    /// e.g. while it downloads. The key's timer is stopped until every slot
    /// is closed, then restarts with the full delay.
    pub fn reserve(&self, key: SubmissionKey) -> Slot<I> {
        {
            let mut state = self.inner.state();
            let (entry, generation, _) = state.restart(&key);
            entry.reserved += 1;
            debug!(%key, generation, reserved = entry.reserved, "slot reserved");
        }
        Slot {
            inner: Arc::clone(&self.inner),
            key,
            open: true,
        }
    }

    /// Remove and return the buffered images for `key` without running the
    /// handler. Returns an empty list when nothing is pending.
    ///
    /// Open slots are forgotten: an image filled into one later starts a
    /// new submission.
    pub fn cancel(&self, key: &SubmissionKey) -> Vec<I> {
        let removed = self.inner.state().pending.remove(key);
        match removed {
            Some(entry) => {
                entry.timer.cancel();
                debug!(%key, images = entry.images.len(), "pending submission cancelled");
                entry.images
            },
            None => Vec::new(),
        }
    }

    /// Cancel every key whose conversation is `conversation`.
    pub fn cancel_conversation(&self, conversation: &str) -> Vec<(SubmissionKey, Vec<I>)> {
        let mut state = self.inner.state();
        let keys: Vec<SubmissionKey> = state
            .pending
            .keys()
            .filter(|key| key.conversation == conversation)
            .cloned()
            .collect();
        keys.into_iter()
            .filter_map(|key| {
                let entry = state.pending.remove(&key)?;
                entry.timer.cancel();
                Some((key, entry.images))
            })
            .collect()
    }

    /// Hand the buffer for `key` to the handler now instead of waiting out the
    /// delay. Returns `false` when no image is buffered.
    pub fn flush(&self, key: &SubmissionKey) -> bool {
        let removed = {
            let mut state = self.inner.state();
            let buffered = state
                .pending
                .get(key)
                .is_some_and(|entry| !entry.images.is_empty());
            if buffered {
                state.pending.remove(key)
            } else {
                None
            }
        };
        let Some(entry) = removed else {
            return false;
        };
        entry.timer.cancel();
        let handler = Arc::clone(&self.inner.handler);
        let key = key.clone();
        self.inner
            .tasks
            .spawn(async move { handler.on_submission(key, entry.images).await });
        true
    }

    /// Cancel every pending key and return what was buffered. Used on shutdown.
    pub fn drain(&self) -> Vec<(SubmissionKey, Vec<I>)> {
        let drained: Vec<_> = self.inner.state().pending.drain().collect();
        drained
            .into_iter()
            .filter_map(|(key, entry)| {
                entry.timer.cancel();
                (!entry.images.is_empty()).then_some((key, entry.images))
            })
            .collect()
    }

    /// Wait up to `within` for handler calls that already started.
    ///
    /// Returns `false` if some were still running when the time ran out.
    pub async fn wait_in_flight(&self, within: Duration) -> bool {
        let tasks = &self.inner.tasks;
        tasks.close();
        let finished = timeout(within, tasks.wait()).await.is_ok();
        tasks.reopen();
        finished
    }

    /// Timer and handler tasks that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Number of images currently buffered for `key`.
    pub fn pending_len(&self, key: &SubmissionKey) -> usize {
        self.inner
            .state()
            .pending
            .get(key)
            .map_or(0, |entry| entry.images.len())
    }

    pub fn is_idle(&self) -> bool {
        self.inner.state().pending.is_empty()
    }
}

/// A reserved place in a pending submission, returned by
/// [`Aggregator::reserve`].
///
/// Fill it with the image once it is available. Dropping an unfilled slot
/// releases the hold. Either way must happen within a tokio runtime.
#[must_use = "the submission stays open until the slot is filled or dropped"]
pub struct Slot<I: Send + 'static> {
    inner: Arc<Inner<I>>,
    key: SubmissionKey,
    open: bool,
}

impl<I: Send + 'static> Slot<I> {
    pub fn key(&self) -> &SubmissionKey {
        &self.key
    }

    /// Add `image` to the submission in this slot's place.
    pub fn fill(mut self, image: I) {
        self.open = false;
        self.inner.settle(self.key.clone(), Some(image), true);
    }
}

impl<I: Send + 'static> Drop for Slot<I> {
    fn drop(&mut self) {
        if self.open {
            self.inner.settle(self.key.clone(), None, true);
        }
    }
}

async fn run_timer<I: Send + 'static>(
    inner: Arc<Inner<I>>,
    key: SubmissionKey,
    generation: u64,
    deadline: Instant,
    token: CancellationToken,
) {
    tokio::select! {
        () = token.cancelled() => return,
        () = sleep_until(deadline) => {},
    }

    let Some(images) = inner.take_if_current(&key, generation) else {
        // Superseded between waking and taking the lock.
        return;
    };
    debug!(%key, generation, images = images.len(), "debounce fired");
    inner.handler.on_submission(key, images).await;
}
