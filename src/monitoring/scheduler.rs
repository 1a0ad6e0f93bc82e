use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::future::{self, Either, Loop};
use tokio::timer::Delay;

use super::error::*;
use super::Monitor;
use prelude::*;
use utils::log_and_capture_error;

/// Runs every monitor in its own endless loop of sleep and cycle.
///
/// A failed or panicked cycle is logged and the loop goes on. When `shutdown` resolves every
/// loop is dropped wherever it is, in flight cycles are abandoned and left to lock expiry.
pub struct Scheduler {
    monitors: Vec<Arc<Monitor>>,
}

impl Scheduler {
    pub fn new(monitors: Vec<Arc<Monitor>>) -> Self {
        Self { monitors }
    }

    /// Resolves after `shutdown` resolves, fails if a monitor loop broke down before that
    pub fn run<S>(self, shutdown: S) -> Box<Future<Item = (), Error = Error> + Send>
    where
        S: Future<Item = (), Error = ()> + Send + 'static,
    {
        let shutdown = shutdown.shared();
        let loops = self.monitors.into_iter().map(move |monitor| {
            let name = monitor.name();
            info!("Starting monitor {} with period {:?}", name, monitor.period());
            run_forever(monitor).select2(shutdown.clone()).then(move |res| match res {
                Ok(Either::A(_)) => Ok(()),
                Ok(Either::B(_)) | Err(Either::B(_)) => {
                    info!("Monitor {} stopped", name);
                    Ok(())
                }
                Err(Either::A((e, _))) => {
                    error!("Monitor {} broke down", name);
                    Err(e)
                }
            })
        });
        Box::new(future::join_all(loops).map(|_| ()))
    }
}

fn run_forever(monitor: Arc<Monitor>) -> impl Future<Item = (), Error = Error> + Send {
    future::loop_fn(monitor, |monitor| {
        Delay::new(Instant::now() + monitor.period())
            .map_err(ectx!(try ErrorSource::Timer, ErrorKind::Internal))
            .and_then(move |_| run_once(monitor.clone()).map(move |_| Loop::Continue(monitor)))
    })
}

/// One isolated cycle, never fails
pub fn run_once(monitor: Arc<Monitor>) -> impl Future<Item = (), Error = Error> + Send {
    let name = monitor.name();
    let started = Instant::now();
    debug!("Monitor {} cycle started", name);
    AssertUnwindSafe(future::lazy(move || monitor.run_cycle()))
        .catch_unwind()
        .then(move |res| {
            match res {
                Ok(Ok(report)) => info!("Monitor {} cycle finished in {:?}, {}", name, started.elapsed(), report),
                Ok(Err(e)) => {
                    error!("Monitor {} cycle failed", name);
                    log_and_capture_error(e);
                }
                Err(panic) => {
                    let e: Error = ErrorKind::Panic(panic_message(&panic)).into();
                    error!("Monitor {} cycle panicked", name);
                    log_and_capture_error(e);
                }
            }
            Ok(())
        })
}

fn panic_message(panic: &Box<Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use monitoring::CycleReport;
    use tokio::runtime::current_thread::Runtime;

    #[derive(Clone, Copy, PartialEq)]
    enum Behavior {
        Succeed,
        Fail,
        Panic,
    }

    struct MonitorMock {
        behavior: Behavior,
        cycles: Arc<Mutex<usize>>,
    }

    impl MonitorMock {
        fn new(behavior: Behavior) -> (Arc<Monitor>, Arc<Mutex<usize>>) {
            let cycles = Arc::new(Mutex::new(0));
            let monitor = Arc::new(MonitorMock {
                behavior,
                cycles: cycles.clone(),
            });
            (monitor, cycles)
        }
    }

    impl Monitor for MonitorMock {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn period(&self) -> Duration {
            Duration::from_millis(10)
        }

        fn run_cycle(&self) -> Box<Future<Item = CycleReport, Error = Error> + Send> {
            *self.cycles.lock().unwrap() += 1;
            match self.behavior {
                Behavior::Succeed => Box::new(future::ok(CycleReport::default())),
                Behavior::Fail => Box::new(future::err(ErrorKind::Internal.into())),
                Behavior::Panic => panic!("cycle blew up"),
            }
        }
    }

    #[test]
    fn test_failures_are_isolated_and_shutdown_stops_loops() {
        let mut runtime = Runtime::new().unwrap();
        let (healthy, healthy_cycles) = MonitorMock::new(Behavior::Succeed);
        let (failing, failing_cycles) = MonitorMock::new(Behavior::Fail);
        let (panicking, panicking_cycles) = MonitorMock::new(Behavior::Panic);
        let scheduler = Scheduler::new(vec![healthy, failing, panicking]);
        let shutdown = Delay::new(Instant::now() + Duration::from_millis(200)).map_err(|_| ());

        runtime.block_on(scheduler.run(shutdown)).unwrap();
        assert!(*healthy_cycles.lock().unwrap() >= 2);
        assert!(*failing_cycles.lock().unwrap() >= 2);
        assert!(*panicking_cycles.lock().unwrap() >= 2);
    }

    #[test]
    fn test_run_once_catches_panics() {
        let mut runtime = Runtime::new().unwrap();
        let (panicking, cycles) = MonitorMock::new(Behavior::Panic);
        runtime.block_on(run_once(panicking)).unwrap();
        assert_eq!(*cycles.lock().unwrap(), 1);
    }
}
