//! Observable view-state fields.
//!
//! A screen's view state is a bag of fields created from one shared
//! [`StateLifetime`]:
//!
//! - [`ObservableProperty<T>`]: a value plus a change stream. New
//!   subscribers immediately receive the current value, then every change.
//! - [`IntentStream<T>`]: a fire-only event stream for user intents. Nothing
//!   is retained; only currently subscribed observers see a fired intent.
//!
//! Disposing the lifetime makes every field terminal at once: subscribing
//! fails with [`LifetimeError::StateDisposed`], and reads or writes are
//! programming errors that panic (their `try_*` counterparts return the
//! error instead).
//!
//! # Example
//!
//! ```
//! use lattice_nav_core::StateLifetime;
//!
//! let lifetime = StateLifetime::new("settings");
//! let volume = lifetime.property("volume", 0.5_f32);
//! let close_clicked = lifetime.intent::<()>("close_clicked");
//!
//! assert!(volume.set(0.8));
//! assert_eq!(close_clicked.fire(()), 0);
//!
//! lifetime.dispose().unwrap();
//! assert!(volume.try_get().is_err());
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::error::{LifetimeError, LifetimeResult};
use crate::signal::{Signal, Subscription};

type Closer = Box<dyn FnOnce() + Send>;

struct LifetimeInner {
    name: String,
    disposed: AtomicBool,
    closers: Mutex<Vec<Closer>>,
}

/// The shared terminal flag of one view state.
///
/// Every field created through [`property`](Self::property) or
/// [`intent`](Self::intent) observes the same flag, so a single
/// [`dispose`](Self::dispose) retires the whole state.
#[derive(Clone)]
pub struct StateLifetime {
    inner: Arc<LifetimeInner>,
}

impl StateLifetime {
    /// Create a live lifetime for the named state.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(LifetimeInner {
                name: name.into(),
                disposed: AtomicBool::new(false),
                closers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The state's diagnostic name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether the state has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Fail with [`LifetimeError::StateDisposed`] if the state is disposed.
    pub fn check(&self) -> LifetimeResult<()> {
        if self.is_disposed() {
            Err(LifetimeError::state_disposed(self.inner.name.clone()))
        } else {
            Ok(())
        }
    }

    /// Create an observable property bound to this lifetime.
    pub fn property<T>(&self, field: &'static str, initial: T) -> ObservableProperty<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let changed = Signal::new(format!("{}.{}", self.inner.name, field));
        self.track(changed.closer());
        ObservableProperty {
            field,
            value: RwLock::new(initial),
            changed,
            lifetime: self.clone(),
        }
    }

    /// Create an intent stream bound to this lifetime.
    pub fn intent<T>(&self, field: &'static str) -> IntentStream<T>
    where
        T: Send + 'static,
    {
        let fired = Signal::new(format!("{}.{}", self.inner.name, field));
        self.track(fired.closer());
        IntentStream {
            field,
            fired,
            lifetime: self.clone(),
        }
    }

    fn track(&self, closer: impl FnOnce() + Send + 'static) {
        self.inner.closers.lock().push(Box::new(closer));
    }

    /// Mark the state terminal and drop every field's observers.
    ///
    /// A state is disposed exactly once; the second call fails with
    /// [`LifetimeError::StateDisposed`].
    pub fn dispose(&self) -> LifetimeResult<()> {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return Err(LifetimeError::state_disposed(self.inner.name.clone()));
        }
        let closers = std::mem::take(&mut *self.inner.closers.lock());
        tracing::debug!(target: "lattice_nav::state", state = %self.inner.name, fields = closers.len(), "view state disposed");
        for close in closers {
            close();
        }
        Ok(())
    }

    fn assert_live(&self, field: &str, action: &str) {
        if self.is_disposed() {
            panic!(
                "attempted to {action} field `{field}` of disposed view state `{}`",
                self.inner.name
            );
        }
    }
}

impl fmt::Debug for StateLifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateLifetime")
            .field("name", &self.inner.name)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// A typed observable field: current value plus change stream.
pub struct ObservableProperty<T> {
    field: &'static str,
    value: RwLock<T>,
    changed: Signal<T>,
    lifetime: StateLifetime,
}

impl<T> ObservableProperty<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// The field name.
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Get the current value.
    ///
    /// # Panics
    ///
    /// Panics if the owning state has been disposed.
    pub fn get(&self) -> T {
        self.lifetime.assert_live(self.field, "read");
        self.value.read().clone()
    }

    /// Get the current value, or `StateDisposed`.
    pub fn try_get(&self) -> LifetimeResult<T> {
        self.lifetime.check()?;
        Ok(self.value.read().clone())
    }

    /// Access the value through a closure without cloning.
    ///
    /// # Panics
    ///
    /// Panics if the owning state has been disposed.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.lifetime.assert_live(self.field, "read");
        f(&self.value.read())
    }

    /// Set the value, returning `true` if it changed.
    ///
    /// Subscribers are notified synchronously, in subscription order, only
    /// when the value actually changed.
    ///
    /// # Panics
    ///
    /// Panics if the owning state has been disposed.
    pub fn set(&self, value: T) -> bool {
        self.lifetime.assert_live(self.field, "mutate");
        self.store(value)
    }

    /// Set the value, or `StateDisposed`.
    pub fn try_set(&self, value: T) -> LifetimeResult<bool> {
        self.lifetime.check()?;
        Ok(self.store(value))
    }

    fn store(&self, value: T) -> bool {
        {
            let mut current = self.value.write();
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        tracing::trace!(target: "lattice_nav::state", field = self.field, "property changed");
        self.changed.emit(value);
        true
    }

    /// Subscribe to the value: the slot runs now with the current value and
    /// again after every change.
    pub fn subscribe<F>(&self, slot: F) -> LifetimeResult<Subscription>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.lifetime.check()?;
        let slot = Arc::new(slot);
        let current = self.value.read().clone();
        let forward = slot.clone();
        let subscription = self.changed.subscribe(move |value| forward(value))?;
        slot(&current);
        Ok(subscription)
    }

    /// Subscribe to changes only, without receiving the current value.
    pub fn subscribe_changes<F>(&self, slot: F) -> LifetimeResult<Subscription>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.lifetime.check()?;
        self.changed.subscribe(slot)
    }

    /// Number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.changed.connection_count()
    }

    /// A read-only view for code that must not mutate the field.
    pub fn read_only(&self) -> ReadOnlyProperty<'_, T> {
        ReadOnlyProperty { inner: self }
    }
}

impl<T> fmt::Debug for ObservableProperty<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableProperty")
            .field("field", &self.field)
            .field("value", &*self.value.read())
            .field("disposed", &self.lifetime.is_disposed())
            .finish()
    }
}

/// A read-only view of an observable property.
///
/// Views receive these for state-to-visual bindings so only the presenter
/// mutates the state.
pub struct ReadOnlyProperty<'a, T> {
    inner: &'a ObservableProperty<T>,
}

impl<T> ReadOnlyProperty<'_, T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Get the current value.
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Get the current value, or `StateDisposed`.
    pub fn try_get(&self) -> LifetimeResult<T> {
        self.inner.try_get()
    }

    /// Subscribe with replay of the current value.
    pub fn subscribe<F>(&self, slot: F) -> LifetimeResult<Subscription>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner.subscribe(slot)
    }
}

/// A fire-only stream of user intents.
pub struct IntentStream<T> {
    field: &'static str,
    fired: Signal<T>,
    lifetime: StateLifetime,
}

impl<T: Send + 'static> IntentStream<T> {
    /// The field name.
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Fire the intent to every current subscriber.
    ///
    /// Returns the number of subscribers reached.
    ///
    /// # Panics
    ///
    /// Panics if the owning state has been disposed.
    pub fn fire(&self, value: T) -> usize {
        self.lifetime.assert_live(self.field, "fire");
        self.fired.emit(value)
    }

    /// Fire the intent, or `StateDisposed`.
    pub fn try_fire(&self, value: T) -> LifetimeResult<usize> {
        self.lifetime.check()?;
        Ok(self.fired.emit(value))
    }

    /// Subscribe to future intents.
    pub fn subscribe<F>(&self, slot: F) -> LifetimeResult<Subscription>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.lifetime.check()?;
        self.fired.subscribe(slot)
    }

    /// Number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.fired.connection_count()
    }
}

impl<T> fmt::Debug for IntentStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntentStream")
            .field("field", &self.field)
            .field("disposed", &self.lifetime.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_get_set() {
        let lifetime = StateLifetime::new("counter");
        let prop = lifetime.property("value", 42);
        assert_eq!(prop.get(), 42);

        // Setting same value returns false (no change)
        assert!(!prop.set(42));
        assert!(prop.set(100));
        assert_eq!(prop.get(), 100);
    }

    #[test]
    fn test_property_subscribe_replays_current_value() {
        let lifetime = StateLifetime::new("title");
        let title = lifetime.property("text", String::from("Top"));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        let _sub = title
            .subscribe(move |text: &String| seen_clone.lock().push(text.clone()))
            .unwrap();
        title.set("Home".to_string());
        title.set("Home".to_string());

        assert_eq!(*seen.lock(), vec!["Top".to_string(), "Home".to_string()]);
    }

    #[test]
    fn test_subscribe_changes_skips_replay() {
        let lifetime = StateLifetime::new("flags");
        let flag = lifetime.property("enabled", false);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        let _sub = flag
            .subscribe_changes(move |&v| seen_clone.lock().push(v))
            .unwrap();
        flag.set(true);

        assert_eq!(*seen.lock(), vec![true]);
    }

    #[test]
    fn test_notification_order_follows_subscription_order() {
        let lifetime = StateLifetime::new("ordered");
        let prop = lifetime.property("n", 0);
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let log = log.clone();
            let _sub = prop
                .subscribe_changes(move |&n| log.lock().push((tag, n)))
                .unwrap();
        }
        prop.set(7);

        assert_eq!(
            *log.lock(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
    }

    #[test]
    fn test_intent_no_replay() {
        let lifetime = StateLifetime::new("buttons");
        let clicked = lifetime.intent::<u32>("clicked");
        assert_eq!(clicked.fire(1), 0);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = clicked
            .subscribe(move |&n| seen_clone.lock().push(n))
            .unwrap();
        assert_eq!(clicked.fire(2), 1);

        assert_eq!(*seen.lock(), vec![2]);
    }

    #[test]
    fn test_dispose_makes_fields_terminal() {
        let lifetime = StateLifetime::new("home");
        let prop = lifetime.property("count", 1);
        let intent = lifetime.intent::<()>("back");
        let _sub = intent.subscribe(|_| {}).unwrap();

        lifetime.dispose().unwrap();

        assert_eq!(intent.subscriber_count(), 0);
        assert!(matches!(
            prop.subscribe(|_| {}),
            Err(LifetimeError::StateDisposed { .. })
        ));
        assert!(matches!(
            intent.subscribe(|_| {}),
            Err(LifetimeError::StateDisposed { .. })
        ));
        assert!(prop.try_set(2).is_err());
        assert!(prop.try_get().is_err());
        assert!(intent.try_fire(()).is_err());
        assert!(lifetime.dispose().is_err());
    }

    #[test]
    #[should_panic(expected = "disposed view state `loading`")]
    fn test_set_after_dispose_panics() {
        let lifetime = StateLifetime::new("loading");
        let progress = lifetime.property("progress", 0u8);
        lifetime.dispose().unwrap();
        progress.set(50);
    }

    #[test]
    #[should_panic(expected = "fire")]
    fn test_fire_after_dispose_panics() {
        let lifetime = StateLifetime::new("shop");
        let buy = lifetime.intent::<u32>("buy");
        lifetime.dispose().unwrap();
        buy.fire(3);
    }

    #[test]
    fn test_read_only_view() {
        let lifetime = StateLifetime::new("ro");
        let prop = lifetime.property("label", "a");
        let ro = prop.read_only();
        assert_eq!(ro.get(), "a");
        prop.set("b");
        assert_eq!(ro.try_get().unwrap(), "b");
    }
}
