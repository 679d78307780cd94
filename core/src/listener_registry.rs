// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;

use log::{debug, warn};

use crate::errors::TransportError;

/// Set of dynamically registered observers with fault-tolerant fan-out.
///
/// Identity is the address of the shared observer object, so registering a clone of the
/// same `Arc` twice keeps a single entry. Broadcast visits observers in registration order.
pub struct ListenerRegistry<O: ?Sized> {
    entries: Vec<Arc<O>>,
}

impl<O: ?Sized> Default for ListenerRegistry<O> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

fn same_observer<O: ?Sized>(a: &Arc<O>, b: &Arc<O>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl<O: ?Sized> ListenerRegistry<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the observer unless it is already registered. Returns whether it was added.
    pub fn register(&mut self, observer: Arc<O>) -> bool {
        if self.contains(&observer) {
            return false;
        }
        self.entries.push(observer);
        true
    }

    /// Removes the observer if present. Returns whether it was removed.
    pub fn unregister(&mut self, observer: &Arc<O>) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| !same_observer(entry, observer));
        before != self.entries.len()
    }

    pub fn contains(&self, observer: &Arc<O>) -> bool {
        self.entries.iter().any(|entry| same_observer(entry, observer))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Calls `deliver` for every observer registered when the broadcast starts.
    ///
    /// Observers reporting [`TransportError::PeerGone`] are removed afterwards; other
    /// failures are logged and the observer stays. Returns the number of successful
    /// deliveries.
    pub fn broadcast<F>(&mut self, mut deliver: F) -> usize
    where
        F: FnMut(&O) -> Result<(), TransportError>,
    {
        let snapshot = self.entries.clone();
        let mut delivered = 0;
        let mut gone = Vec::new();
        for observer in snapshot {
            match deliver(observer.as_ref()) {
                Ok(()) => delivered += 1,
                Err(TransportError::PeerGone) => {
                    warn!("Observer is gone; removing it from the registry");
                    gone.push(observer);
                }
                Err(e) => warn!("Error while broadcasting: {}", e),
            }
        }
        for observer in &gone {
            self.unregister(observer);
        }
        if !gone.is_empty() {
            debug!("{} observer(s) removed during broadcast, {} left", gone.len(), self.entries.len());
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    trait Probe: Send + Sync {
        fn ping(&self, n: u32) -> Result<(), TransportError>;
    }

    struct Recording {
        name: &'static str,
        fail_with: Option<TransportError>,
        log: Arc<Mutex<Vec<(&'static str, u32)>>>,
    }

    impl Probe for Recording {
        fn ping(&self, n: u32) -> Result<(), TransportError> {
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            self.log.lock().unwrap().push((self.name, n));
            Ok(())
        }
    }

    fn probe(
        name: &'static str,
        fail_with: Option<TransportError>,
        log: &Arc<Mutex<Vec<(&'static str, u32)>>>,
    ) -> Arc<dyn Probe> {
        Arc::new(Recording { name, fail_with, log: log.clone() })
    }

    #[test]
    fn duplicate_registration_yields_single_entry_and_delivery() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry: ListenerRegistry<dyn Probe> = ListenerRegistry::new();
        let a = probe("a", None, &log);

        assert!(registry.register(a.clone()));
        assert!(!registry.register(a.clone()));
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.broadcast(|o| o.ping(1)), 1);
        assert_eq!(*log.lock().unwrap(), vec![("a", 1)]);
    }

    #[test]
    fn failing_observer_is_removed_and_others_still_receive() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry: ListenerRegistry<dyn Probe> = ListenerRegistry::new();
        let a = probe("a", None, &log);
        let b = probe("b", Some(TransportError::PeerGone), &log);
        let c = probe("c", None, &log);
        registry.register(a.clone());
        registry.register(b.clone());
        registry.register(c.clone());

        assert_eq!(registry.broadcast(|o| o.ping(7)), 2);
        assert_eq!(*log.lock().unwrap(), vec![("a", 7), ("c", 7)]);
        assert!(!registry.contains(&b));
        assert!(registry.contains(&a));
        assert!(registry.contains(&c));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn non_terminal_failure_keeps_observer() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry: ListenerRegistry<dyn Probe> = ListenerRegistry::new();
        let busy = probe("busy", Some(TransportError::QueueFull), &log);
        registry.register(busy.clone());

        assert_eq!(registry.broadcast(|o| o.ping(1)), 0);
        assert!(registry.contains(&busy));
    }

    #[test]
    fn unregister_absent_is_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry: ListenerRegistry<dyn Probe> = ListenerRegistry::new();
        let a = probe("a", None, &log);
        assert!(!registry.unregister(&a));
        registry.register(a.clone());
        assert!(registry.unregister(&a));
        assert!(registry.is_empty());
        assert_eq!(registry.broadcast(|o| o.ping(3)), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn broadcast_follows_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry: ListenerRegistry<dyn Probe> = ListenerRegistry::new();
        for name in ["c", "a", "b"] {
            registry.register(probe(name, None, &log));
        }
        registry.broadcast(|o| o.ping(0));
        let order: Vec<_> = log.lock().unwrap().iter().map(|(n, _)| *n).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }
}
