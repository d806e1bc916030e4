use std::sync::Arc;

use ability_tasks_core::logging::targets;
use ability_tasks_core::{AbilityOwner, Attribute, AttributeChange, Signal};

use crate::config::AttributeChangedConfig;
use crate::listener::{Registrations, bind};
use crate::task::{AsyncTask, TaskCore, TaskOwner};

/// Waits for attribute value changes.
///
/// Forwards `(attribute, new value, old value)` for every watched attribute.
/// Nothing is forwarded while no listener is connected to
/// [`changed`](Self::changed).
pub struct WaitAttributeChanged {
    core: TaskCore,
    attributes: Vec<Attribute>,
    only_trigger_once: bool,
    registrations: Registrations<Attribute>,
    changed: Signal<AttributeChange>,
}

impl WaitAttributeChanged {
    /// Wait for changes of a single attribute.
    pub fn new(owner: impl Into<TaskOwner>, attribute: Attribute, only_trigger_once: bool) -> Arc<Self> {
        Self::from_config(
            owner,
            AttributeChangedConfig {
                attributes: vec![attribute],
                only_trigger_once,
            },
        )
    }

    pub fn from_config(owner: impl Into<TaskOwner>, config: AttributeChangedConfig) -> Arc<Self> {
        Arc::new(Self {
            core: TaskCore::new("wait_attribute_changed", owner.into()),
            attributes: config.attributes,
            only_trigger_once: config.only_trigger_once,
            registrations: Registrations::new(),
            changed: Signal::new(),
        })
    }

    /// Emitted with each forwarded change.
    pub fn changed(&self) -> &Signal<AttributeChange> {
        &self.changed
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    fn on_attribute_changed(&self, change: &AttributeChange) {
        if !self.ready_to_broadcast() {
            return;
        }
        if self.changed.connection_count() == 0 {
            tracing::trace!(target: targets::WAITER, attribute = %change.attribute, "no listener connected, change dropped");
            return;
        }
        if self.only_trigger_once {
            self.end_action();
        }
        self.changed.emit(change.clone());
    }
}

impl AsyncTask for WaitAttributeChanged {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn on_activate(self: &Arc<Self>, owner: &Arc<dyn AbilityOwner>) {
        for attribute in &self.attributes {
            self.registrations.subscribe(
                owner.attribute_feed(),
                attribute.clone(),
                bind(self, Self::on_attribute_changed),
            );
        }
    }

    fn on_end(&self, owner: Option<&Arc<dyn AbilityOwner>>) {
        self.registrations
            .unsubscribe_all(owner.map(|owner| owner.attribute_feed()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskState;
    use crate::wait::test_util::{component, record};

    #[test]
    fn test_forwards_new_and_old_value() {
        let owner = component();
        let health = Attribute::new("Health");
        owner.set_attribute(&health, 100.0);

        let task = WaitAttributeChanged::new(&owner, health.clone(), false);
        let received = record(task.changed());
        task.activate();

        owner.set_attribute(&health, 80.0);
        owner.set_attribute(&health, 60.0);

        let received = received.lock();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].old_value, 100.0);
        assert_eq!(received[0].new_value, 80.0);
        assert_eq!(received[1].new_value, 60.0);
        assert_eq!(task.state(), TaskState::Active);
    }

    #[test]
    fn test_only_trigger_once() {
        let owner = component();
        let mana = Attribute::new("Mana");
        let task = WaitAttributeChanged::new(&owner, mana.clone(), true);
        let received = record(task.changed());
        task.activate();

        owner.set_attribute(&mana, 1.0);
        owner.set_attribute(&mana, 2.0);

        assert_eq!(received.lock().len(), 1);
        assert_eq!(task.state(), TaskState::Ended);
        assert_eq!(owner.attribute_feed().listener_count(&mana), 0);
    }

    #[test]
    fn test_no_listener_means_no_forwarding() {
        let owner = component();
        let armor = Attribute::new("Armor");
        let task = WaitAttributeChanged::new(&owner, armor.clone(), true);
        task.activate();

        owner.set_attribute(&armor, 5.0);
        // Dropped, so a once-only waiter is still waiting.
        assert_eq!(task.state(), TaskState::Active);

        let received = record(task.changed());
        owner.set_attribute(&armor, 6.0);
        assert_eq!(received.lock().len(), 1);
        assert_eq!(task.state(), TaskState::Ended);
    }

    #[test]
    fn test_watches_several_attributes() {
        let owner = component();
        let config = AttributeChangedConfig {
            attributes: vec![Attribute::new("Health"), Attribute::new("Mana")],
            only_trigger_once: false,
        };
        let task = WaitAttributeChanged::from_config(&owner, config);
        let received = record(task.changed());
        task.activate();
        assert_eq!(task.registrations.len(), 2);

        owner.set_attribute(&Attribute::new("Mana"), 10.0);
        owner.set_attribute(&Attribute::new("Stamina"), 10.0);
        owner.set_attribute(&Attribute::new("Health"), 10.0);

        let names: Vec<_> = received
            .lock()
            .iter()
            .map(|change| change.attribute.name().to_owned())
            .collect();
        assert_eq!(names, ["Mana", "Health"]);

        task.end_action();
        assert_eq!(task.registrations.len(), 0);
        assert_eq!(owner.attribute_feed().listener_count(&Attribute::new("Health")), 0);
    }
}
