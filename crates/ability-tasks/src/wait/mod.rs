//! The wait tasks.
//!
//! Each waiter observes one kind of owner broadcast and forwards the ones
//! that pass its gate to a public output [`Signal`](ability_tasks_core::Signal).
//! Connect to the output signal first, then call
//! [`activate`](crate::AsyncTask::activate).
//!
//! | Waiter                     | Listens to                  | Output                 |
//! |----------------------------|-----------------------------|------------------------|
//! | [`WaitAttributeChanged`]   | attribute feed              | `AttributeChange`      |
//! | [`WaitEffectApplied`]      | effect feed                 | `EffectApplication`    |
//! | [`WaitGameplayEvent`]      | gameplay event feed         | `GameplayEventData`    |
//! | [`WaitTagCountReached`]    | tag feed, new or removed    | `GameplayTag`          |
//! | [`WaitTagCountChanged`]    | tag feed, any count change  | `TagCountChange`       |
//! | [`WaitTagQuery`]           | tag feed, per queried tag   | `()`                   |

mod attribute_changed;
mod effect_applied;
mod gameplay_event;
mod tag_count_changed;
mod tag_count_reached;
mod tag_query;

pub use attribute_changed::WaitAttributeChanged;
pub use effect_applied::WaitEffectApplied;
pub use gameplay_event::WaitGameplayEvent;
pub use tag_count_changed::WaitTagCountChanged;
pub use tag_count_reached::WaitTagCountReached;
pub use tag_query::WaitTagQuery;
