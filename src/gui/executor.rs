use std::future::Future;
use futures::io;
use iced_futures::MaybeSend;
use tokio::runtime::{Builder, Runtime};

/// Runs iced commands and subscriptions on a multi threaded tokio runtime, so that the
/// bluetooth stack keeps running while the window is busy.
pub struct MyExecutor {
    runtime: Runtime,
}

impl iced::Executor for MyExecutor {
    fn new() -> Result<Self, io::Error> {
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .thread_name("dlg-cap-link-worker")
            .build()?;

        Ok(MyExecutor { runtime })
    }

    fn spawn(&self, future: impl Future<Output = ()> + MaybeSend + 'static) {
        let _ = self.runtime.spawn(future);
    }

    fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.runtime.enter();
        f()
    }
}
