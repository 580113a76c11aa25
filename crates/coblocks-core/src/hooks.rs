//! Named extension points
//!
//! A [`Filter`] threads a value through every attached callback and returns
//! the final value. An [`Action`] notifies every attached callback and returns
//! nothing. Callbacks run in ascending priority order; callbacks sharing a
//! priority run in the order they were attached.
//!
//! Both types are cheap to clone: clones share the same receiver list.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Priority used by [`Filter::add_filter`] and [`Action::add_action`].
pub const DEFAULT_PRIORITY: i32 = 10;

#[derive(Debug, Clone)]
enum HookNameInner {
	Static(&'static str),
	Owned(Arc<str>),
}

/// Name of an extension point
///
/// # Examples
///
/// ```
/// use coblocks_core::hooks::HookName;
///
/// const SUBMIT: HookName = HookName::new_static("coblocks_form_submit");
/// assert_eq!(SUBMIT.as_str(), "coblocks_form_submit");
///
/// let custom = HookName::custom(format!("my_{}", "hook"));
/// assert_eq!(custom.as_str(), "my_hook");
/// ```
#[derive(Debug, Clone)]
pub struct HookName(HookNameInner);

impl HookName {
	/// Create a name from a string literal (usable in `const` items)
	pub const fn new_static(name: &'static str) -> Self {
		Self(HookNameInner::Static(name))
	}

	/// Create a name from any string
	pub fn custom(name: impl Into<String>) -> Self {
		Self(HookNameInner::Owned(Arc::from(name.into())))
	}

	pub fn as_str(&self) -> &str {
		match &self.0 {
			HookNameInner::Static(s) => s,
			HookNameInner::Owned(s) => s,
		}
	}
}

impl fmt::Display for HookName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl PartialEq for HookName {
	fn eq(&self, other: &Self) -> bool {
		self.as_str() == other.as_str()
	}
}

impl Eq for HookName {}

type FilterFn<V, C> = Arc<dyn Fn(V, &C) -> V + Send + Sync>;
type ActionFn<C> = Arc<dyn Fn(&C) + Send + Sync>;

struct Receiver<F> {
	callback: F,
	priority: i32,
	seq: u64,
	dispatch_uid: Option<String>,
}

/// Ordered receiver storage shared by filters and actions.
struct ReceiverList<F> {
	receivers: RwLock<Vec<Receiver<F>>>,
	next_seq: AtomicU64,
}

impl<F: Clone> ReceiverList<F> {
	fn new() -> Self {
		Self {
			receivers: RwLock::new(Vec::new()),
			next_seq: AtomicU64::new(0),
		}
	}

	fn insert(&self, callback: F, priority: i32, dispatch_uid: Option<String>) {
		let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
		let mut receivers = self.receivers.write();

		// Re-registering a uid replaces the previous receiver
		if let Some(ref uid) = dispatch_uid {
			receivers.retain(|r| r.dispatch_uid.as_ref() != Some(uid));
		}

		receivers.push(Receiver {
			callback,
			priority,
			seq,
			dispatch_uid,
		});
		receivers.sort_by_key(|r| (r.priority, r.seq));
	}

	fn remove(&self, dispatch_uid: &str) -> bool {
		let mut receivers = self.receivers.write();
		let before = receivers.len();
		receivers.retain(|r| r.dispatch_uid.as_deref() != Some(dispatch_uid));
		receivers.len() < before
	}

	fn clear(&self) {
		self.receivers.write().clear();
	}

	fn len(&self) -> usize {
		self.receivers.read().len()
	}

	/// Clone the callbacks out so no lock is held while they run.
	fn snapshot(&self) -> Vec<F> {
		self.receivers
			.read()
			.iter()
			.map(|r| r.callback.clone())
			.collect()
	}
}

/// A value-transforming extension point
///
/// `V` is the filtered value, `C` the read-only context handed to every
/// callback alongside it.
///
/// # Examples
///
/// ```
/// use coblocks_core::hooks::{Filter, HookName};
///
/// let subject: Filter<String, Option<u64>> =
///     Filter::new(HookName::new_static("coblocks_form_email_subject"));
///
/// subject.add_filter(|value, post_id| match post_id {
///     Some(id) => format!("{} (#{})", value, id),
///     None => value,
/// });
///
/// assert_eq!(subject.apply("Contact".to_string(), &Some(7)), "Contact (#7)");
/// assert_eq!(subject.apply("Contact".to_string(), &None), "Contact");
/// ```
pub struct Filter<V, C: ?Sized> {
	name: HookName,
	receivers: Arc<ReceiverList<FilterFn<V, C>>>,
}

impl<V, C: ?Sized> Clone for Filter<V, C> {
	fn clone(&self) -> Self {
		Self {
			name: self.name.clone(),
			receivers: Arc::clone(&self.receivers),
		}
	}
}

impl<V, C: ?Sized> fmt::Debug for Filter<V, C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Filter")
			.field("name", &self.name)
			.field("receivers", &self.receivers.len())
			.finish()
	}
}

impl<V: 'static, C: ?Sized + 'static> Filter<V, C> {
	pub fn new(name: HookName) -> Self {
		Self {
			name,
			receivers: Arc::new(ReceiverList::new()),
		}
	}

	pub fn name(&self) -> &HookName {
		&self.name
	}

	/// Attach a callback at [`DEFAULT_PRIORITY`]
	pub fn add_filter<F>(&self, callback: F)
	where
		F: Fn(V, &C) -> V + Send + Sync + 'static,
	{
		self.add_filter_with(DEFAULT_PRIORITY, None, callback);
	}

	/// Attach a callback with an explicit priority and optional dispatch uid
	///
	/// Attaching a second callback with the same `dispatch_uid` replaces the
	/// first one.
	pub fn add_filter_with<F>(&self, priority: i32, dispatch_uid: Option<String>, callback: F)
	where
		F: Fn(V, &C) -> V + Send + Sync + 'static,
	{
		self.receivers
			.insert(Arc::new(callback), priority, dispatch_uid);
	}

	/// Detach the callback registered under `dispatch_uid`
	pub fn remove_filter(&self, dispatch_uid: &str) -> bool {
		self.receivers.remove(dispatch_uid)
	}

	pub fn clear(&self) {
		self.receivers.clear();
	}

	pub fn has_filters(&self) -> bool {
		self.receivers.len() > 0
	}

	pub fn receivers_count(&self) -> usize {
		self.receivers.len()
	}

	/// Run `value` through every attached callback
	pub fn apply(&self, value: V, context: &C) -> V {
		let callbacks = self.receivers.snapshot();
		if !callbacks.is_empty() {
			tracing::trace!(hook = %self.name, receivers = callbacks.len(), "applying filter");
		}
		callbacks
			.iter()
			.fold(value, |acc, callback| callback(acc, context))
	}
}

/// A notification-only extension point
///
/// # Examples
///
/// ```
/// use coblocks_core::hooks::{Action, HookName};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let registered: Action<()> = Action::new(HookName::new_static("coblocks_register_form_blocks"));
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&calls);
/// registered.add_action(move |_| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// registered.fire(&());
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
pub struct Action<C: ?Sized> {
	name: HookName,
	receivers: Arc<ReceiverList<ActionFn<C>>>,
}

impl<C: ?Sized> Clone for Action<C> {
	fn clone(&self) -> Self {
		Self {
			name: self.name.clone(),
			receivers: Arc::clone(&self.receivers),
		}
	}
}

impl<C: ?Sized> fmt::Debug for Action<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Action")
			.field("name", &self.name)
			.field("receivers", &self.receivers.len())
			.finish()
	}
}

impl<C: ?Sized + 'static> Action<C> {
	pub fn new(name: HookName) -> Self {
		Self {
			name,
			receivers: Arc::new(ReceiverList::new()),
		}
	}

	pub fn name(&self) -> &HookName {
		&self.name
	}

	pub fn add_action<F>(&self, callback: F)
	where
		F: Fn(&C) + Send + Sync + 'static,
	{
		self.add_action_with(DEFAULT_PRIORITY, None, callback);
	}

	pub fn add_action_with<F>(&self, priority: i32, dispatch_uid: Option<String>, callback: F)
	where
		F: Fn(&C) + Send + Sync + 'static,
	{
		self.receivers
			.insert(Arc::new(callback), priority, dispatch_uid);
	}

	pub fn remove_action(&self, dispatch_uid: &str) -> bool {
		self.receivers.remove(dispatch_uid)
	}

	pub fn clear(&self) {
		self.receivers.clear();
	}

	pub fn has_actions(&self) -> bool {
		self.receivers.len() > 0
	}

	pub fn receivers_count(&self) -> usize {
		self.receivers.len()
	}

	/// Notify every attached callback, returning how many ran
	pub fn fire(&self, context: &C) -> usize {
		let callbacks = self.receivers.snapshot();
		tracing::debug!(hook = %self.name, receivers = callbacks.len(), "firing action");
		for callback in &callbacks {
			callback(context);
		}
		callbacks.len()
	}
}
