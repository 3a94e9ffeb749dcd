use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

struct Slot {
    id: u64,
    fired: bool,
    // Dropping the sender wakes the waiting ticket as cancelled.
    _cancel: oneshot::Sender<()>,
}

type Slots = Arc<Mutex<HashMap<String, Slot>>>;

/// Handle for one scheduled cycle of a key. Dropping it releases the key if
/// the cycle is still the current one.
pub struct Ticket {
    key: String,
    id: u64,
    cancelled: oneshot::Receiver<()>,
    slots: Slots,
}

impl Ticket {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.get(&self.key).is_some_and(|slot| slot.id == self.id) {
            slots.remove(&self.key);
            tracing::debug!("⏱️ {}: request #{} dropped before completing", self.key, self.id);
        }
    }
}

/// One cancellable timer per key, last write wins. A slot stays registered
/// after its timer fires until the caller completes it, so a call that is
/// still in flight can find out whether it was overtaken.
pub struct Debouncer {
    delay: Duration,
    next_id: AtomicU64,
    slots: Slots,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_id: AtomicU64::new(0),
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn schedule(&self, key: &str) -> Ticket {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (cancel, cancelled) = oneshot::channel();

        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = slots.insert(
            key.to_string(),
            Slot {
                id,
                fired: false,
                _cancel: cancel,
            },
        );
        if let Some(previous) = previous {
            tracing::debug!("⏱️ {}: request #{} replaces #{}", key, id, previous.id);
        }

        Ticket {
            key: key.to_string(),
            id,
            cancelled,
            slots: Arc::clone(&self.slots),
        }
    }

    /// Resolves to `true` once the quiet period elapsed with this ticket still
    /// current, `false` as soon as it is replaced or cancelled.
    pub async fn wait(&self, ticket: &mut Ticket) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => self.mark_fired(ticket),
            _ = &mut ticket.cancelled => false,
        }
    }

    fn mark_fired(&self, ticket: &Ticket) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.get_mut(&ticket.key) {
            Some(slot) if slot.id == ticket.id => {
                slot.fired = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(&ticket.key).is_some_and(|slot| slot.id == ticket.id)
    }

    /// Releases the key if `ticket` still owns it. `false` means a newer
    /// request (or a cancel) happened while this one was in flight.
    pub fn complete(&self, ticket: &Ticket) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.get(&ticket.key) {
            Some(slot) if slot.id == ticket.id => {
                slots.remove(&ticket.key);
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&self, key: &str) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key).is_some()
    }

    /// Timers that have not fired yet.
    pub fn pending(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| !slot.fired).count()
    }
}
