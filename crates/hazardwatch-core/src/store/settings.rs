// ── Notification settings registry ──
//
// Readers take an `Arc` snapshot without locking. Writers are serialized
// so concurrent partial updates never lose each other's fields.

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{NotificationSettings, SettingsUpdate};

pub struct SettingsRegistry {
    current: ArcSwap<NotificationSettings>,
    write_lock: Mutex<()>,
    version: watch::Sender<u64>,
}

impl SettingsRegistry {
    pub fn new(initial: NotificationSettings) -> Result<Self, CoreError> {
        initial.validate()?;
        let (version, _) = watch::channel(0u64);
        Ok(Self {
            current: ArcSwap::from_pointee(initial),
            write_lock: Mutex::new(()),
            version,
        })
    }

    /// Settings in force right now. Work already in flight keeps the
    /// snapshot it started with.
    pub fn snapshot(&self) -> Arc<NotificationSettings> {
        self.current.load_full()
    }

    /// Merge `update` into the current settings. Fields left unset keep
    /// their value; an invalid update leaves everything unchanged.
    pub fn update(&self, update: &SettingsUpdate) -> Result<Arc<NotificationSettings>, CoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(self.current.load().apply(update)?);
        self.current.store(Arc::clone(&next));
        self.version.send_modify(|v| *v += 1);
        debug!(settings = ?next, "notification settings updated");
        Ok(next)
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Receives the version number after every successful update.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn partial_updates_merge() {
        let registry = SettingsRegistry::new(NotificationSettings::default()).unwrap();
        let held = registry.snapshot();

        registry
            .update(&SettingsUpdate {
                audible: Some(false),
                ..SettingsUpdate::default()
            })
            .unwrap();
        let after = registry
            .update(&SettingsUpdate {
                escalation_delay: Some(Duration::from_secs(2)),
                ..SettingsUpdate::default()
            })
            .unwrap();

        assert!(!after.channels.audible);
        assert!(after.channels.popup);
        assert_eq!(after.escalation_delay, Duration::from_secs(2));
        assert!(held.channels.audible);
        assert_eq!(registry.version(), 2);
    }

    #[test]
    fn invalid_update_changes_nothing() {
        let registry = SettingsRegistry::new(NotificationSettings::default()).unwrap();
        let result = registry.update(&SettingsUpdate {
            escalation_delay: Some(Duration::ZERO),
            ..SettingsUpdate::default()
        });

        assert!(matches!(result, Err(CoreError::Validation { .. })));
        assert_eq!(registry.snapshot().escalation_delay, Duration::from_secs(300));
        assert_eq!(registry.version(), 0);
    }

    #[test]
    fn concurrent_writers_keep_each_field() {
        let registry = Arc::new(SettingsRegistry::new(NotificationSettings::default()).unwrap());
        let a = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                registry.update(&SettingsUpdate {
                    popup: Some(false),
                    ..SettingsUpdate::default()
                })
            })
        };
        let b = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                registry.update(&SettingsUpdate {
                    push: Some(false),
                    ..SettingsUpdate::default()
                })
            })
        };
        a.join().unwrap().unwrap();
        b.join().unwrap().unwrap();

        let settings = registry.snapshot();
        assert!(!settings.channels.popup);
        assert!(!settings.channels.push);
        assert!(settings.channels.audible);
    }
}
