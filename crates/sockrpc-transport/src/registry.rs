use std::collections::HashMap;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use tracing::debug;

/// Maps an endpoint identity, scoped to the calling thread, to an owned descriptor.
///
/// Descriptors are closed when they leave the registry, either through
/// [`close_handles_by_thread`](Self::close_handles_by_thread) or when the
/// registry itself is dropped. Two threads using the same identity never see
/// each other's descriptors.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    handles: Mutex<HashMap<HandleKey, OwnedFd>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HandleKey {
    identity: String,
    thread: ThreadId,
}

impl HandleKey {
    fn current(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            thread: thread::current().id(),
        }
    }
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor registered for `identity` on the calling thread.
    pub fn get_handle(&self, identity: &str) -> Option<RawFd> {
        self.lock()
            .get(&HandleKey::current(identity))
            .map(AsRawFd::as_raw_fd)
    }

    /// Register `fd` for `identity` on the calling thread.
    ///
    /// A descriptor previously registered under the same key is closed.
    pub fn add_handle(&self, identity: &str, fd: OwnedFd) -> RawFd {
        let raw = fd.as_raw_fd();
        let previous = self.lock().insert(HandleKey::current(identity), fd);
        if let Some(previous) = previous {
            debug!(identity, fd = previous.as_raw_fd(), "replacing registered handle");
        }
        raw
    }

    /// Close every descriptor registered for `identity` by the calling thread.
    ///
    /// Returns the number of descriptors closed.
    pub fn close_handles_by_thread(&self, identity: &str) -> usize {
        let removed = self.lock().remove(&HandleKey::current(identity));
        match removed {
            Some(fd) => {
                debug!(identity, fd = fd.as_raw_fd(), "closing registered handle");
                drop(fd);
                1
            }
            None => 0,
        }
    }

    /// Number of descriptors registered across all threads.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<HandleKey, OwnedFd>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn pipe_fd() -> OwnedFd {
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        OwnedFd::from(left)
    }

    #[test]
    fn lookup_or_create() {
        let registry = HandleRegistry::new();
        assert_eq!(registry.get_handle("127.0.0.1:1"), None);

        let raw = registry.add_handle("127.0.0.1:1", pipe_fd());
        assert_eq!(registry.get_handle("127.0.0.1:1"), Some(raw));
        assert_eq!(registry.get_handle("127.0.0.1:2"), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn close_by_thread_releases_descriptor() {
        let registry = HandleRegistry::new();
        registry.add_handle("127.0.0.1:1", pipe_fd());

        assert_eq!(registry.close_handles_by_thread("127.0.0.1:1"), 1);
        assert_eq!(registry.get_handle("127.0.0.1:1"), None);
        assert!(registry.is_empty());
        assert_eq!(registry.close_handles_by_thread("127.0.0.1:1"), 0);
    }

    #[test]
    fn threads_do_not_share_handles() {
        let registry = Arc::new(HandleRegistry::new());
        let main_fd = registry.add_handle("127.0.0.1:9", pipe_fd());

        let other = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                assert_eq!(registry.get_handle("127.0.0.1:9"), None);
                registry.add_handle("127.0.0.1:9", pipe_fd());
                assert_eq!(registry.close_handles_by_thread("127.0.0.1:9"), 1);
            })
        };
        other.join().unwrap();

        assert_eq!(registry.get_handle("127.0.0.1:9"), Some(main_fd));
        assert_eq!(registry.len(), 1);
    }
}
