pub mod event;
pub mod table;

pub use event::{Broadcaster, ChangeEvent, SubscriptionId};
pub use table::{BroadcastPause, Cell, RaggedTable, TableShape};

#[cfg(test)]
mod test;
