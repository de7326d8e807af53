//! Reload listeners.
//!
//! Listeners are kept in subscription order and de-duplicated by `Arc`
//! identity: subscribing the same `Arc` twice keeps one entry, while two
//! separately allocated closures count as two listeners even if their code
//! is identical.

use std::sync::Arc;


/// Callback invoked with a read handle after the tree is loaded or merged.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;


/// Ordered, identity de-duplicated set of listeners.
pub struct NotificationHub<T> {
    listeners: Vec<Listener<T>>,
}

impl<T> NotificationHub<T> {
    pub fn new() -> Self {
        NotificationHub { listeners: Vec::new() }
    }

    /// Add `listener` unless it is already subscribed. Returns true if added.
    pub fn subscribe(&mut self, listener: Listener<T>) -> bool {
        if self.contains(&listener) {
            return false;
        }
        self.listeners.push(listener);
        true
    }

    /// Remove `listener`. Returns true if it was subscribed.
    pub fn unsubscribe(&mut self, listener: &Listener<T>) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !same_listener(l, listener));
        self.listeners.len() != before
    }

    pub fn contains(&self, listener: &Listener<T>) -> bool {
        self.listeners.iter().any(|l| same_listener(l, listener))
    }

    /// Cloned handles in subscription order, so callers can invoke them
    /// without holding a borrow of the hub.
    pub fn listeners(&self) -> Vec<Listener<T>> {
        self.listeners.clone()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<T> Default for NotificationHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare data pointers only; vtable pointers of the same closure may
/// differ across codegen units.
fn same_listener<T>(a: &Listener<T>, b: &Listener<T>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn fire(hub: &NotificationHub<u32>, value: u32) {
        for listener in hub.listeners() {
            listener(&value);
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &str) -> Listener<u32> {
        let log = Arc::clone(log);
        let name = name.to_string();
        Arc::new(move |v: &u32| log.lock().unwrap().push(format!("{}:{}", name, v)))
    }

    #[test]
    fn notifies_in_subscription_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hub = NotificationHub::new();
        hub.subscribe(recorder(&log, "a"));
        hub.subscribe(recorder(&log, "b"));
        fire(&hub, 7);
        assert_eq!(*log.lock().unwrap(), vec!["a:7", "b:7"]);
    }

    #[test]
    fn same_arc_is_subscribed_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hub = NotificationHub::new();
        let l = recorder(&log, "a");
        assert!(hub.subscribe(Arc::clone(&l)));
        assert!(!hub.subscribe(Arc::clone(&l)));
        assert_eq!(hub.len(), 1);
        fire(&hub, 1);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn distinct_closures_are_distinct_listeners() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hub = NotificationHub::new();
        assert!(hub.subscribe(recorder(&log, "a")));
        assert!(hub.subscribe(recorder(&log, "a")));
        assert_eq!(hub.len(), 2);
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hub = NotificationHub::new();
        let a = recorder(&log, "a");
        hub.subscribe(Arc::clone(&a));
        hub.subscribe(recorder(&log, "b"));
        assert!(hub.unsubscribe(&a));
        assert!(!hub.unsubscribe(&a));
        fire(&hub, 3);
        assert_eq!(*log.lock().unwrap(), vec!["b:3"]);
    }

    #[test]
    fn empty_hub_notifies_nothing() {
        let hub: NotificationHub<u32> = NotificationHub::default();
        assert!(hub.is_empty());
        fire(&hub, 0);
    }
}
