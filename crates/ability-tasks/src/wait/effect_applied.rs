use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ability_tasks_core::logging::targets;
use ability_tasks_core::{AbilityOwner, EffectApplication, EffectFeedKind, Signal, TagRequirements};

use crate::config::{EffectAppliedConfig, TargetFilter};
use crate::listener::{Registrations, bind};
use crate::task::{AsyncTask, TaskCore, TaskOwner};

/// Waits for gameplay effects to land on the owner.
///
/// An application is forwarded when the recipient passes the target filter
/// and the effect spec's captured source and target tags meet their requirements.
/// A second application arriving while listeners of [`applied`](Self::applied)
/// are still running is dropped.
pub struct WaitEffectApplied {
    core: TaskCore,
    target_filter: TargetFilter,
    source_requirements: TagRequirements,
    target_requirements: TagRequirements,
    listen_for_periodic: bool,
    trigger_once: bool,
    locked: AtomicBool,
    registrations: Registrations<EffectFeedKind>,
    applied: Signal<EffectApplication>,
}

/// Releases the broadcast lock when the caller's listeners return.
struct Unlock<'a>(&'a AtomicBool);

impl Drop for Unlock<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl WaitEffectApplied {
    /// Wait for any effect application, with no filtering.
    pub fn new(owner: impl Into<TaskOwner>, trigger_once: bool) -> Arc<Self> {
        Self::from_config(
            owner,
            EffectAppliedConfig {
                trigger_once,
                ..EffectAppliedConfig::default()
            },
        )
    }

    pub fn from_config(owner: impl Into<TaskOwner>, config: EffectAppliedConfig) -> Arc<Self> {
        Arc::new(Self {
            core: TaskCore::new("wait_effect_applied", owner.into()),
            target_filter: config.target_filter,
            source_requirements: config.source_requirements,
            target_requirements: config.target_requirements,
            listen_for_periodic: config.listen_for_periodic,
            trigger_once: config.trigger_once,
            locked: AtomicBool::new(false),
            registrations: Registrations::new(),
            applied: Signal::new(),
        })
    }

    /// Emitted with each application that passed the filters.
    pub fn applied(&self) -> &Signal<EffectApplication> {
        &self.applied
    }

    /// Returns `true` while listeners of [`applied`](Self::applied) run.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    fn passes_filters(&self, application: &EffectApplication) -> bool {
        self.target_filter.passes(application.target)
            && self
                .source_requirements
                .requirements_met(&application.spec.captured_source_tags)
            && self
                .target_requirements
                .requirements_met(&application.spec.captured_target_tags)
    }

    fn on_effect(&self, application: &EffectApplication) {
        if !self.ready_to_broadcast() {
            return;
        }
        if !self.passes_filters(application) {
            tracing::trace!(target: targets::WAITER, effect = %application.spec.name, "effect filtered out");
            return;
        }
        if self.locked.swap(true, Ordering::AcqRel) {
            tracing::debug!(
                target: targets::WAITER,
                task = self.core.id().as_u64(),
                effect = %application.spec.name,
                "reentrant effect broadcast suppressed"
            );
            return;
        }
        let _unlock = Unlock(&self.locked);

        if self.trigger_once {
            self.end_action();
        }
        self.applied.emit(application.clone());
    }
}

impl AsyncTask for WaitEffectApplied {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn on_activate(self: &Arc<Self>, owner: &Arc<dyn AbilityOwner>) {
        let feed = owner.effect_feed();
        self.registrations
            .subscribe(feed, EffectFeedKind::Applied, bind(self, Self::on_effect));
        if self.listen_for_periodic {
            self.registrations.subscribe(
                feed,
                EffectFeedKind::PeriodicExecuted,
                bind(self, Self::on_effect),
            );
        }
    }

    fn on_end(&self, owner: Option<&Arc<dyn AbilityOwner>>) {
        self.registrations
            .unsubscribe_all(owner.map(|owner| owner.effect_feed()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskState;
    use crate::wait::test_util::{component, record, tag};
    use ability_tasks_core::{ActorId, EffectSpec, TagContainer};
    use parking_lot::Mutex;

    #[test]
    fn test_requirements_on_captured_tags() {
        let attacker = component();
        let target = component();
        attacker.add_tag(&tag("Team.Red"), 1);

        let config = EffectAppliedConfig {
            source_requirements: TagRequirements {
                require: TagContainer::single(tag("Team.Red")),
                ..TagRequirements::default()
            },
            target_requirements: TagRequirements {
                ignore: TagContainer::single(tag("State.Immune")),
                ..TagRequirements::default()
            },
            ..EffectAppliedConfig::default()
        };
        let task = WaitEffectApplied::from_config(&target, config);
        let received = record(task.applied());
        task.activate();

        // No source tags captured.
        target.apply_effect(ActorId::next(), EffectSpec::new("Burn"));
        attacker.apply_effect_to(&target, EffectSpec::new("Slash"));
        target.add_tag(&tag("State.Immune"), 1);
        attacker.apply_effect_to(&target, EffectSpec::new("Stab"));

        let names: Vec<_> = received.lock().iter().map(|a| a.spec.name.clone()).collect();
        assert_eq!(names, ["Slash"]);
    }

    #[test]
    fn test_target_filter() {
        let owner = component();
        let config = EffectAppliedConfig {
            target_filter: TargetFilter::Except(vec![owner.avatar()]),
            ..EffectAppliedConfig::default()
        };
        let task = WaitEffectApplied::from_config(&owner, config);
        let received = record(task.applied());
        task.activate();

        owner.apply_effect(ActorId::next(), EffectSpec::new("Heal"));
        assert!(received.lock().is_empty());
    }

    #[test]
    fn test_reentrant_application_is_suppressed() {
        let owner = component();
        let task = WaitEffectApplied::new(&owner, false);
        let received = Arc::new(Mutex::new(Vec::new()));
        {
            let sink = received.clone();
            let reentrant_owner = Arc::downgrade(&owner);
            task.applied().connect(move |application: &EffectApplication| {
                sink.lock().push(application.spec.name.clone());
                if application.spec.name == "First" {
                    if let Some(owner) = reentrant_owner.upgrade() {
                        owner.apply_effect(ActorId::next(), EffectSpec::new("Nested"));
                    }
                }
            });
        }
        task.activate();

        owner.apply_effect(ActorId::next(), EffectSpec::new("First"));
        assert!(!task.is_locked());
        owner.apply_effect(ActorId::next(), EffectSpec::new("Second"));

        assert_eq!(*received.lock(), ["First", "Second"]);
        assert_eq!(owner.active_effect_count(), 3);
    }

    #[test]
    fn test_periodic_feed_is_optional() {
        let owner = component();
        let plain = WaitEffectApplied::new(&owner, false);
        let periodic = WaitEffectApplied::from_config(
            &owner,
            EffectAppliedConfig {
                listen_for_periodic: true,
                ..EffectAppliedConfig::default()
            },
        );
        let plain_received = record(plain.applied());
        let periodic_received = record(periodic.applied());
        plain.activate();
        periodic.activate();

        let handle = owner.apply_effect(ActorId::next(), EffectSpec::new("Poison"));
        assert!(owner.execute_periodic(handle));
        assert!(owner.execute_periodic(handle));

        assert_eq!(plain_received.lock().len(), 1);
        assert_eq!(periodic_received.lock().len(), 3);
        assert_eq!(owner.effect_feed().listener_count(&EffectFeedKind::PeriodicExecuted), 1);

        periodic.cancel();
        assert_eq!(owner.effect_feed().listener_count(&EffectFeedKind::PeriodicExecuted), 0);
        assert_eq!(owner.effect_feed().listener_count(&EffectFeedKind::Applied), 1);
    }

    #[test]
    fn test_trigger_once() {
        let owner = component();
        let task = WaitEffectApplied::new(&owner, true);
        let received = record(task.applied());
        task.activate();

        owner.apply_effect(ActorId::next(), EffectSpec::new("A"));
        owner.apply_effect(ActorId::next(), EffectSpec::new("B"));

        assert_eq!(received.lock().len(), 1);
        assert_eq!(task.state(), TaskState::Ended);
        assert!(!task.is_locked());
    }
}
