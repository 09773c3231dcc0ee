mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::{ChangeKind, OrderChange, OrderUpdatedEvent};
pub use hooks::{EventFilter, EventHandlers, EventHooks, EventProducers};
