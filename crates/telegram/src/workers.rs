use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use {
    async_trait::async_trait,
    tokio::{
        sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::SendError},
        task::JoinSet,
    },
    tracing::{debug, warn},
};

/// How long a chat's worker lingers after its last update.
pub const WORKER_IDLE: Duration = Duration::from_secs(60);

/// Processes the updates of one chat.
#[async_trait]
pub trait ChatHandler<T>: Send + Sync + 'static {
    async fn handle(&self, chat: i64, item: T);
}

type QueueMap<T> = HashMap<i64, UnboundedSender<T>>;
type Queues<T> = Arc<Mutex<QueueMap<T>>>;

fn lock<T>(queues: &Mutex<QueueMap<T>>) -> MutexGuard<'_, QueueMap<T>> {
    queues.lock().unwrap_or_else(|e| e.into_inner())
}

/// One task per active chat.
///
/// Updates of a chat are handled one after another in arrival order, while
/// different chats run concurrently: a slow download in one chat never holds
/// up another. A worker exits after [`WORKER_IDLE`] without updates.
pub struct ChatWorkers<T, H> {
    handler: Arc<H>,
    queues: Queues<T>,
    tasks: JoinSet<()>,
    idle: Duration,
}

impl<T: Send + 'static, H: ChatHandler<T>> ChatWorkers<T, H> {
    pub fn new(handler: Arc<H>, idle: Duration) -> Self {
        Self {
            handler,
            queues: Arc::default(),
            tasks: JoinSet::new(),
            idle,
        }
    }

    /// Queue `item` on the worker for `chat`, starting one if needed.
    pub fn dispatch(&mut self, chat: i64, item: T) {
        while let Some(finished) = self.tasks.try_join_next() {
            if let Err(e) = finished {
                warn!(error = %e, "chat worker failed");
            }
        }

        // Workers remove themselves under this same lock, so an item is
        // either accepted by a live worker or handed to a new one.
        let mut queues = lock(&self.queues);
        let item = match queues.get(&chat) {
            Some(tx) => match tx.send(item) {
                Ok(()) => return,
                // The worker died; start another.
                Err(SendError(item)) => item,
            },
            None => item,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(item);
        queues.insert(chat, tx);
        debug!(chat, active = queues.len(), "chat worker started");
        self.tasks.spawn(run_worker(
            chat,
            rx,
            Arc::clone(&self.handler),
            Arc::clone(&self.queues),
            self.idle,
        ));
    }

    /// Chats with a running worker.
    pub fn active(&self) -> usize {
        lock(&self.queues).len()
    }

    /// Let every worker finish its queue, waiting at most `grace`. Workers
    /// still busy after that are aborted.
    pub async fn shutdown(mut self, grace: Duration) {
        lock(&self.queues).clear();
        let drained = tokio::time::timeout(grace, async {
            while let Some(finished) = self.tasks.join_next().await {
                if let Err(e) = finished {
                    warn!(error = %e, "chat worker failed");
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!(busy = self.tasks.len(), "chat workers still busy at shutdown, aborting");
            self.tasks.shutdown().await;
        }
    }
}

async fn run_worker<T, H: ChatHandler<T>>(
    chat: i64,
    mut rx: UnboundedReceiver<T>,
    handler: Arc<H>,
    queues: Queues<T>,
    idle: Duration,
) {
    loop {
        match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(item)) => handler.handle(chat, item).await,
            Ok(None) => break,
            Err(_) => {
                let mut queues = lock(&queues);
                if rx.is_empty() {
                    queues.remove(&chat);
                    debug!(chat, "chat worker idle, stopping");
                    break;
                }
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        tokio::{sync::mpsc::unbounded_channel, time::sleep},
    };

    /// Sleeps for the item's value in milliseconds, then reports it.
    struct Sleeper(UnboundedSender<(i64, u64)>);

    #[async_trait]
    impl ChatHandler<u64> for Sleeper {
        async fn handle(&self, chat: i64, millis: u64) {
            sleep(Duration::from_millis(millis)).await;
            let _ = self.0.send((chat, millis));
        }
    }

    fn workers(idle: Duration) -> (ChatWorkers<u64, Sleeper>, UnboundedReceiver<(i64, u64)>) {
        let (tx, rx) = unbounded_channel();
        (ChatWorkers::new(Arc::new(Sleeper(tx)), idle), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn slow_chat_does_not_delay_other_chats() {
        let (mut workers, mut done) = workers(WORKER_IDLE);
        workers.dispatch(1, 60_000);
        workers.dispatch(2, 10);

        assert_eq!(done.recv().await.unwrap(), (2, 10));
        assert_eq!(done.recv().await.unwrap(), (1, 60_000));
    }

    #[tokio::test(start_paused = true)]
    async fn one_chat_is_handled_in_arrival_order() {
        let (mut workers, mut done) = workers(WORKER_IDLE);
        for millis in [300, 10, 200] {
            workers.dispatch(7, millis);
        }

        let mut order = Vec::new();
        for _ in 0..3 {
            order.push(done.recv().await.unwrap().1);
        }
        assert_eq!(order, vec![300, 10, 200]);
        assert_eq!(workers.active(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_worker_stops_and_restarts_on_demand() {
        let (mut workers, mut done) = workers(Duration::from_secs(5));
        workers.dispatch(3, 1);
        done.recv().await.unwrap();

        sleep(Duration::from_secs(10)).await;
        assert_eq!(workers.active(), 0);

        workers.dispatch(3, 2);
        assert_eq!(done.recv().await.unwrap(), (3, 2));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_finishes_queued_items() {
        let (mut workers, mut done) = workers(WORKER_IDLE);
        workers.dispatch(1, 100);
        workers.dispatch(1, 100);
        workers.shutdown(Duration::from_secs(5)).await;

        assert_eq!(done.try_recv().unwrap(), (1, 100));
        assert_eq!(done.try_recv().unwrap(), (1, 100));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_aborts_after_grace() {
        let (mut workers, mut done) = workers(WORKER_IDLE);
        workers.dispatch(1, 600_000);
        workers.shutdown(Duration::from_secs(1)).await;
        assert!(done.try_recv().is_err());
    }
}
