mod debounce;
mod effect;
mod registry;
mod runtime;
mod session;
mod slots;
mod trigger;

#[cfg(test)]
pub(crate) mod mock;

pub use debounce::{DebounceAction, DebouncedQuery};
pub use effect::Effect;
pub use registry::PointRegistry;
pub use runtime::{Engine, SessionHandle};
pub use session::{Input, Session, SELECT_BOTH_POINTS_PROMPT};
pub use slots::{Slot, SlotCounters};
pub use trigger::RouteTrigger;
