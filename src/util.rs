use std::sync;
use std::vec;

pub type SubscriptionId = u64;

static NEXT_SUBSCRIPTION_ID: sync::atomic::AtomicU64 = sync::atomic::AtomicU64::new(1);

fn next_subscription_id() -> SubscriptionId {
    NEXT_SUBSCRIPTION_ID.fetch_add(1, sync::atomic::Ordering::Relaxed)
}

struct Slot<T> {
    id: SubscriptionId,
    handler: sync::Arc<dyn Fn(&T) + Send + Sync>,
}

/// Connect/disconnect callback registry standing in for the host shell's
/// signal type. Delivery is at-most-once per emit per slot.
pub struct Signal<T> {
    slots: sync::Mutex<vec::Vec<Slot<T>>>,
}

impl<T> Signal<T> {
    pub fn new() -> Signal<T> {
        Signal {
            slots: sync::Mutex::new(vec::Vec::new()),
        }
    }

    pub fn connect<F: Fn(&T) + Send + Sync + 'static>(&self, handler: F) -> SubscriptionId {
        let id = next_subscription_id();
        self.slots.lock().unwrap().push(Slot {
            id,
            handler: sync::Arc::new(handler),
        });
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn disconnect(&self, id: SubscriptionId) -> bool {
        let mut slots = self.slots.lock().unwrap();
        let before = slots.len();
        slots.retain(|slot| slot.id != id);
        slots.len() != before
    }

    /// Handlers run outside the registry lock, so a handler may connect or
    /// disconnect reentrantly. Slots added during an emit are not invoked
    /// until the next emit.
    pub fn emit(&self, value: &T) {
        let handlers: vec::Vec<_> = self
            .slots
            .lock()
            .unwrap()
            .iter()
            .map(|slot| slot.handler.clone())
            .collect();

        for handler in handlers {
            (*handler)(value);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Signal<T> {
        Signal::new()
    }
}
