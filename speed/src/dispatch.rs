use crate::models::{io::Message, Dispatcher, Ticket};
use std::collections::{HashMap, VecDeque};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};
use uuid::Uuid;

/// Sending side of a connection's writer task.
pub type Outbox = UnboundedSender<Message>;

struct Registration {
    dispatcher: Dispatcher,
    outbox: Outbox,
}

/// Tickets waiting for a dispatcher, plus the dispatchers currently connected.
///
/// Handing a ticket to a dispatcher's outbox and removing it from the queue happen under the
/// same `&mut self`, so a ticket is delivered at most once. The outbox never blocks.
#[derive(Default)]
pub struct DispatchQueue {
    pending: VecDeque<Ticket>,
    dispatchers: HashMap<Uuid, Registration>,
}
impl DispatchQueue {
    /// Queues a new ticket and tries to deliver it straight away. Returns whether it was delivered.
    pub fn issue(&mut self, ticket: Ticket) -> bool {
        if self.deliver(&ticket) {
            return true;
        }
        debug!(plate = %ticket.plate, road = ticket.road, "No dispatcher available, ticket pending");
        self.pending.push_back(ticket);
        false
    }

    /// Registers a dispatcher and hands it every pending ticket for its roads, oldest first.
    /// Returns how many were delivered.
    pub fn register(&mut self, id: Uuid, dispatcher: Dispatcher, outbox: Outbox) -> usize {
        let before = self.pending.len();
        self.pending.retain(|ticket| {
            !(dispatcher.serves(ticket.road) && outbox.send(Message::Ticket(ticket.clone())).is_ok())
        });
        let delivered = before - self.pending.len();
        info!(connection = %id, roads = ?dispatcher.roads, delivered, "Dispatcher registered");
        self.dispatchers.insert(id, Registration { dispatcher, outbox });
        delivered
    }

    pub fn unregister(&mut self, id: &Uuid) {
        if self.dispatchers.remove(id).is_some() {
            info!(connection = %id, "Dispatcher unregistered");
        }
    }

    /// Puts tickets that could not be written back at the head of the queue, keeping their order.
    pub fn requeue(&mut self, tickets: Vec<Ticket>) {
        for ticket in tickets.into_iter().rev() {
            self.pending.push_front(ticket);
        }
    }

    /// Re-attempts delivery of everything pending. Returns how many were delivered.
    pub fn sweep(&mut self) -> usize {
        let mut pending = std::mem::take(&mut self.pending);
        let before = pending.len();
        pending.retain(|ticket| !self.deliver(ticket));
        let delivered = before - pending.len();
        self.pending = pending;
        delivered
    }

    pub fn pending(&self) -> impl Iterator<Item = &Ticket> {
        self.pending.iter()
    }

    fn deliver(&self, ticket: &Ticket) -> bool {
        self.dispatchers
            .values()
            .filter(|registration| registration.dispatcher.serves(ticket.road))
            .any(|registration| registration.outbox.send(Message::Ticket(ticket.clone())).is_ok())
    }
}
