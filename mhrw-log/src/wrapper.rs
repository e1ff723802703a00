use crate::{Level, Logger};
use std::sync::Mutex;

/// Serializes access to a `Logger` back-end that isn't internally
/// thread-safe. If the wrapped logger already reports `is_thread_safe() ==
/// true` the mutex is bypassed entirely so we don't pay for a lock on a
/// back-end that doesn't need one.
pub struct ThreadSafeLoggerWrapper<L: Logger> {
    inner: L,
    guard: Option<Mutex<()>>,
}

impl<L: Logger> ThreadSafeLoggerWrapper<L> {
    pub fn new(inner: L) -> Self {
        let guard = if inner.is_thread_safe() {
            None
        } else {
            Some(Mutex::new(()))
        };
        Self { inner, guard }
    }
}

impl<L: Logger> Logger for ThreadSafeLoggerWrapper<L> {
    fn emit(&self, level: Level, origin: &str, message: &str) {
        match &self.guard {
            Some(mutex) => {
                let _critical_section = mutex.lock().unwrap_or_else(|e| e.into_inner());
                self.inner.emit(level, origin, message);
            }
            None => self.inner.emit(level, origin, message),
        }
    }

    fn filter_by_origin(&self, level: Level, origin: &str) -> bool {
        self.inner.filter_by_origin(level, origin)
    }

    fn is_thread_safe(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    struct CountingLogger {
        calls: Arc<AtomicUsize>,
    }

    impl Logger for CountingLogger {
        fn emit(&self, _level: Level, _origin: &str, _message: &str) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }

        fn is_thread_safe(&self) -> bool {
            false
        }
    }

    #[test]
    fn serializes_concurrent_emit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let logger = Arc::new(ThreadSafeLoggerWrapper::new(CountingLogger {
            calls: calls.clone(),
        }));
        assert!(logger.is_thread_safe());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let logger = Arc::clone(&logger);
                thread::spawn(move || {
                    for _ in 0..100 {
                        logger.emit(Level::Info, "test", "hello");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 800);
    }

    #[test]
    fn thread_safe_backend_skips_mutex() {
        struct SafeLogger;
        impl Logger for SafeLogger {
            fn emit(&self, _level: Level, _origin: &str, _message: &str) {}
            fn is_thread_safe(&self) -> bool {
                true
            }
        }
        let wrapper = ThreadSafeLoggerWrapper::new(SafeLogger);
        assert!(wrapper.guard.is_none());
    }
}
