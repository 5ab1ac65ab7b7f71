use std::{
    panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::ThreadId,
};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{config::Config, manager::TrayManager};

static EVENT_LOOP: OnceCell<EventLoop> = OnceCell::new();

type Job = Box<dyn FnOnce(&LoopContext<'_>) + Send>;

enum LoopMessage {
    Run(Job),
    Quit,
}

/// What a queued job gets to work with: the protocol manager and the
/// runtime the loop thread drives.
pub struct LoopContext<'a> {
    rt: Option<&'a tokio::runtime::Runtime>,
    handle: tokio::runtime::Handle,
    manager: &'a Arc<TrayManager>,
}

impl LoopContext<'_> {
    pub fn manager(&self) -> &TrayManager {
        self.manager
    }

    /// The runtime, when the job may drive it to completion. `None` for
    /// jobs running inline on the loop thread itself (the loop is already
    /// parked in `block_on` further down the stack).
    pub fn runtime(&self) -> Option<&tokio::runtime::Runtime> {
        self.rt
    }

    /// Queue bus work onto the loop's runtime without waiting for it.
    pub fn spawn<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}

struct Ready {
    handle: tokio::runtime::Handle,
    manager: Arc<TrayManager>,
    thread_id: ThreadId,
}

/// Owns the one thread that is allowed to touch protocol state and bus I/O.
///
/// Everything else in the process talks to that thread through
/// [`EventLoop::run_blocking`] and [`EventLoop::run_async`]; submissions
/// from all threads funnel through a single FIFO queue.
pub struct EventLoop {
    msg_send: tokio::sync::mpsc::UnboundedSender<LoopMessage>,
    handle: tokio::runtime::Handle,
    manager: Arc<TrayManager>,
    thread_id: ThreadId,
    thread_handle: Mutex<Option<std::thread::JoinHandle<()>>>,
    pumping: AtomicBool,
}

impl EventLoop {
    /// The process-wide loop, started (and its manager constructed, on the
    /// loop thread) on first access. Blocks until the loop is live.
    pub fn instance() -> Result<&'static EventLoop> {
        Self::instance_with(Config::default())
    }

    pub fn instance_with(config: Config) -> Result<&'static EventLoop> {
        EVENT_LOOP.get_or_try_init(|| EventLoop::start(config))
    }

    pub(crate) fn get() -> Option<&'static EventLoop> {
        EVENT_LOOP.get()
    }

    pub(crate) fn start(config: Config) -> Result<EventLoop> {
        let (msg_send, msg_recv) = tokio::sync::mpsc::unbounded_channel();
        let (ready_send, ready_recv) = std::sync::mpsc::channel();

        let thread_handle = std::thread::Builder::new()
            .name("sni-event-loop".to_string())
            .spawn(move || run_loop(config, msg_recv, ready_send))
            .context("Failed to spawn the tray event loop thread")?;

        let ready = ready_recv.recv().context("The tray event loop died during startup")??;

        Ok(EventLoop {
            msg_send,
            handle: ready.handle,
            manager: ready.manager,
            thread_id: ready.thread_id,
            thread_handle: Mutex::new(Some(thread_handle)),
            pumping: AtomicBool::new(false),
        })
    }

    pub(crate) fn manager(&self) -> &TrayManager {
        &self.manager
    }

    pub(crate) fn on_loop_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Run `job` on the loop thread and hand its result back.
    ///
    /// Called from the loop thread itself the job runs in place, so
    /// reentrant calls cannot deadlock on the queue. A panicking job does
    /// not hurt the loop; the unwind resumes in the caller.
    pub fn run_blocking<R, F>(&self, job: F) -> Result<R>
    where
        F: FnOnce(&LoopContext<'_>) -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.on_loop_thread() {
            let ctx = LoopContext { rt: None, handle: self.handle.clone(), manager: &self.manager };
            return Ok(job(&ctx));
        }

        let (result_send, result_recv) = std::sync::mpsc::channel();
        let wrapped: Job = Box::new(move |ctx| {
            let result = catch_unwind(AssertUnwindSafe(|| job(ctx)));
            let _ = result_send.send(result);
        });
        self.msg_send
            .send(LoopMessage::Run(wrapped))
            .map_err(|_| anyhow!("the tray event loop is not running"))?;

        match result_recv.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(panic)) => resume_unwind(panic),
            Err(_) => Err(anyhow!("the tray event loop terminated before the job completed")),
        }
    }

    /// Queue `job` for the loop thread without waiting. Errors inside the
    /// job are the job's own business; a panic is caught and logged.
    pub fn run_async<F>(&self, job: F)
    where
        F: FnOnce(&LoopContext<'_>) + Send + 'static,
    {
        if self.msg_send.send(LoopMessage::Run(Box::new(job))).is_err() {
            log::warn!("dropping work submitted after the tray event loop stopped");
        }
    }

    /// Stop the loop and join its thread. Idempotent. Must not be called
    /// from queued work (the join would wait on the thread it runs on).
    pub fn shutdown(&self) {
        if self.on_loop_thread() {
            log::error!("EventLoop::shutdown called from the event loop thread, ignoring");
            return;
        }
        let thread_handle = self.thread_handle.lock().unwrap().take(); // unwrap: mutex poisoning is okay
        if let Some(thread_handle) = thread_handle {
            let _ = self.msg_send.send(LoopMessage::Quit);
            let _ = thread_handle.join();
        }
    }

    pub(crate) fn begin_pumping(&self) {
        self.pumping.store(true, Ordering::SeqCst);
    }

    pub(crate) fn stop_pumping(&self) {
        self.pumping.store(false, Ordering::SeqCst);
    }

    pub(crate) fn is_pumping(&self) -> bool {
        self.pumping.load(Ordering::SeqCst)
    }
}

fn run_loop(
    config: Config,
    mut msg_recv: UnboundedReceiver<LoopMessage>,
    ready_send: std::sync::mpsc::Sender<Result<Ready>>,
) {
    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            let _ = ready_send.send(Err(e).context("Failed to initialize the tray event loop runtime"));
            return;
        }
    };

    let manager = Arc::new(TrayManager::new(config));
    let _ = ready_send.send(Ok(Ready {
        handle: rt.handle().clone(),
        manager: manager.clone(),
        thread_id: std::thread::current().id(),
    }));

    loop {
        // Waiting for the next job keeps driving all bus I/O tasks.
        let msg = rt.block_on(msg_recv.recv());
        match msg {
            Some(LoopMessage::Run(job)) => {
                let ctx = LoopContext { rt: Some(&rt), handle: rt.handle().clone(), manager: &manager };
                if catch_unwind(AssertUnwindSafe(|| job(&ctx))).is_err() {
                    log::error!("a queued tray job panicked");
                }
            }
            Some(LoopMessage::Quit) | None => break,
        }
    }

    // Items go before the loop does.
    rt.block_on(manager.dispose_all());
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::{sync::atomic::AtomicUsize, time::Duration};

    fn test_loop() -> Arc<EventLoop> {
        Arc::new(EventLoop::start(Config::default()).unwrap())
    }

    #[test]
    fn run_blocking_completes_before_returning() {
        let event_loop = test_loop();
        let counter = Arc::new(AtomicUsize::new(0));

        let seen = {
            let counter = counter.clone();
            event_loop
                .run_blocking(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    counter.load(Ordering::SeqCst)
                })
                .unwrap()
        };

        assert_eq!(seen, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        event_loop.shutdown();
    }

    #[test]
    fn run_blocking_from_the_loop_thread_runs_inline() {
        let event_loop = test_loop();
        let inner = event_loop.clone();
        let (done_send, done_recv) = std::sync::mpsc::channel();

        {
            let done_send = done_send.clone();
            let outer = event_loop.clone();
            std::thread::spawn(move || {
                let value = outer.run_blocking(move |_| inner.run_blocking(|_| 7).unwrap()).unwrap();
                let _ = done_send.send(value);
            });
        }

        let value = done_recv
            .recv_timeout(Duration::from_secs(1))
            .expect("reentrant run_blocking deadlocked");
        assert_eq!(value, 7);
        event_loop.shutdown();
    }

    #[test]
    fn submissions_are_served_in_order() {
        let event_loop = test_loop();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..32 {
            let order = order.clone();
            event_loop.run_async(move |_| order.lock().unwrap().push(i));
        }
        event_loop.run_blocking(|_| ()).unwrap();

        assert_eq!(*order.lock().unwrap(), (0..32).collect::<Vec<_>>());
        event_loop.shutdown();
    }

    #[test]
    fn a_panicking_job_reaches_the_caller_but_not_the_loop() {
        let event_loop = test_loop();

        let result = catch_unwind(AssertUnwindSafe(|| {
            event_loop.run_blocking::<(), _>(|_| panic!("job failure")).unwrap()
        }));
        assert!(result.is_err());

        // The loop survived and keeps serving work.
        assert_eq!(event_loop.run_blocking(|_| 3).unwrap(), 3);
        event_loop.shutdown();
    }

    #[test]
    fn a_panicking_async_job_is_dropped() {
        let event_loop = test_loop();
        event_loop.run_async(|_| panic!("async job failure"));
        assert_eq!(event_loop.run_blocking(|_| 5).unwrap(), 5);
        event_loop.shutdown();
    }

    #[test]
    fn shutdown_is_idempotent_and_stops_accepting_work() {
        let event_loop = test_loop();
        event_loop.shutdown();
        event_loop.shutdown();
        assert!(event_loop.run_blocking(|_| ()).is_err());
    }
}
