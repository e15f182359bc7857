//! The namespaced emitter engine.
//!
//! An [`Emitter`] owns one namespace trie, one pending-event queue and the
//! queueing flag. Every operation runs to completion before returning.
//!
//! ## Firing order
//!
//! `emit("user.created", ..)` fires, in this order:
//!
//! 1. listeners registered at `user.created` (registration order)
//! 2. listeners registered at `user`
//! 3. listeners registered at the root (`""`)
//!
//! ## Two phases
//!
//! Emission is split into `dispatch` (walk the trie, snapshot the listeners
//! to fire, consume one-shot listeners, prune) and [`Dispatch::fire`] (run the
//! callbacks), followed by `settle` for listeners that asked to detach. [`Emitter::emit`] chains the three. Callbacks never run
//! while the trie is being walked, which is what lets
//! [`SharedEmitter`](crate::SharedEmitter) release its lock around them.

use nsbus_core::{EmitterConfig, ListenerId, Namespace};

use crate::listener::{Callback, Flow, Listener};
use crate::queue::{PendingEvent, PendingQueue};
use crate::trie::{Reach, Trie};

/// Default argument type: an ordered list of opaque JSON values.
pub type JsonArgs = Vec<serde_json::Value>;

/// A listener selected to fire, with the namespace it is registered at.
#[derive(Debug, Clone)]
pub struct Delivery<A> {
    at: Namespace,
    listener: Listener<A>,
}

impl<A> Delivery<A> {
    pub fn at(&self) -> &Namespace {
        &self.at
    }

    pub fn listener(&self) -> &Listener<A> {
        &self.listener
    }
}

/// A listener that returned [`Flow::Detach`] and must be unsubscribed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detach {
    pub at: Namespace,
    pub id: ListenerId,
}

/// The ordered listeners an emission will fire (most specific first).
#[derive(Debug)]
pub struct Dispatch<A> {
    namespace: Namespace,
    deliveries: Vec<Delivery<A>>,
    handled: bool,
}

impl<A> Dispatch<A> {
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Whether any node on the path held a listener.
    pub fn is_handled(&self) -> bool {
        self.handled
    }

    pub fn deliveries(&self) -> &[Delivery<A>] {
        &self.deliveries
    }

    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    /// Run every callback in order and collect the ones asking to detach.
    ///
    /// A panicking callback is not caught; it unwinds into the caller and the
    /// remaining callbacks of this emission do not run.
    pub fn fire(&self, args: &A) -> Vec<Detach> {
        let mut detached = Vec::new();
        for delivery in &self.deliveries {
            let flow = delivery.listener.callback().call(args);
            // One-shot listeners were already consumed by `dispatch`.
            if flow == Flow::Detach && !delivery.listener.is_once() {
                detached.push(Detach {
                    at: delivery.at.clone(),
                    id: delivery.listener.id(),
                });
            }
        }
        detached
    }
}

/// Namespaced event emitter.
#[derive(Debug)]
pub struct Emitter<A> {
    trie: Trie<A>,
    pending: PendingQueue<A>,
    queueing: bool,
    replaying: bool,
    // A listener was registered while a replay pass was running.
    replay_dirty: bool,
}

impl<A> Default for Emitter<A> {
    fn default() -> Self {
        Self {
            trie: Trie::new(),
            pending: PendingQueue::default(),
            queueing: false,
            replaying: false,
            replay_dirty: false,
        }
    }
}

impl<A: 'static> Emitter<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EmitterConfig) -> Self {
        Self {
            trie: Trie::new(),
            pending: PendingQueue::new(config.max_pending),
            queueing: config.queue_unhandled_events,
            replaying: false,
            replay_dirty: false,
        }
    }

    /// Register `listener` for `pattern` and every namespace below it.
    pub fn on<F, R>(&mut self, pattern: impl Into<Namespace>, listener: F) -> &mut Self
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.register(pattern.into(), Callback::new(listener), false);
        self
    }

    /// Like [`Emitter::on`], but the listener is removed after it first fires.
    pub fn once<F, R>(&mut self, pattern: impl Into<Namespace>, listener: F) -> &mut Self
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.register(pattern.into(), Callback::new(listener), true);
        self
    }

    /// Register a prebuilt callback; keep a clone to remove it later with
    /// [`Emitter::remove_listener`].
    pub fn on_callback(&mut self, pattern: impl Into<Namespace>, callback: Callback<A>) -> &mut Self {
        self.register(pattern.into(), callback, false);
        self
    }

    pub fn once_callback(&mut self, pattern: impl Into<Namespace>, callback: Callback<A>) -> &mut Self {
        self.register(pattern.into(), callback, true);
        self
    }

    /// Register a listener and return a handle for [`Emitter::off`].
    pub fn subscribe<F, R>(&mut self, pattern: impl Into<Namespace>, listener: F) -> ListenerId
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.register(pattern.into(), Callback::new(listener), false)
    }

    pub fn subscribe_once<F, R>(&mut self, pattern: impl Into<Namespace>, listener: F) -> ListenerId
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.register(pattern.into(), Callback::new(listener), true)
    }

    /// Fire `name` with `args`. Returns whether any listener was reachable.
    ///
    /// Unhandled events are queued when queueing is enabled.
    pub fn emit(&mut self, name: impl Into<Namespace>, args: A) -> bool {
        let namespace = name.into();
        let handled = self.deliver(&namespace, &args);
        if !handled && self.queueing {
            self.enqueue(namespace, args);
        }
        handled
    }

    /// Remove the first registration of `callback` at exactly `pattern`.
    ///
    /// Ancestors and descendants of `pattern` are never touched.
    pub fn remove_listener(&mut self, pattern: impl Into<Namespace>, callback: &Callback<A>) -> bool {
        let namespace = pattern.into();
        let removed = self.remove_where(&namespace, |l| l.callback() == callback);
        tracing::debug!(pattern = %namespace, removed, "remove listener by callback");
        removed
    }

    /// Remove the registration `id` at exactly `pattern`.
    pub fn off(&mut self, pattern: impl Into<Namespace>, id: ListenerId) -> bool {
        let namespace = pattern.into();
        let removed = self.remove_where(&namespace, |l| l.id() == id);
        tracing::debug!(pattern = %namespace, listener = %id, removed, "remove listener by id");
        removed
    }

    /// Drop every listener at `pattern` and below. `""` clears the emitter.
    ///
    /// Listeners on ancestors of `pattern` stay registered.
    pub fn remove_all_listeners(&mut self, pattern: impl Into<Namespace>) {
        let namespace = pattern.into();
        self.trie.traverse(&namespace, |node, visit| {
            if visit.reach == Reach::Exact {
                node.clear();
            }
            false
        });
        tracing::debug!(pattern = %namespace, "removed all listeners");
    }

    /// Toggle queueing of unhandled events. Disabling discards the queue.
    pub fn queue_unhandled_events(&mut self, enable: bool) -> &mut Self {
        self.queueing = enable;
        if !enable {
            let dropped = self.pending.clear();
            if dropped > 0 {
                tracing::debug!(dropped, "queueing disabled, discarded pending events");
            }
        }
        self
    }

    /// Attach a listener without replaying the queue.
    pub(crate) fn insert(&mut self, namespace: &Namespace, callback: Callback<A>, once: bool) -> ListenerId {
        let listener = Listener::new(callback, once);
        let id = listener.id();
        self.trie.insert(namespace, listener);
        tracing::debug!(pattern = %namespace, listener = %id, once, "registered listener");
        id
    }

    /// Walk `namespace` and select the listeners to fire.
    ///
    /// One-shot listeners are removed here; emptied nodes are pruned.
    pub(crate) fn dispatch(&mut self, namespace: &Namespace) -> Dispatch<A> {
        let mut deliveries = Vec::new();
        let mut handled = false;

        self.trie.traverse(namespace, |node, visit| {
            let listeners = node.listeners_mut();
            if listeners.is_empty() {
                return true;
            }
            handled = true;

            let at = namespace.prefix(visit.depth);
            deliveries.extend(listeners.iter().map(|listener| Delivery {
                at: at.clone(),
                listener: listener.clone(),
            }));
            listeners.retain(|listener| !listener.is_once());
            true
        });

        tracing::trace!(
            event = %namespace,
            handled,
            listeners = deliveries.len(),
            "dispatched event"
        );

        Dispatch {
            namespace: namespace.clone(),
            deliveries,
            handled,
        }
    }

    /// Unsubscribe listeners that returned [`Flow::Detach`].
    pub(crate) fn settle(&mut self, detached: &[Detach]) {
        for request in detached {
            let removed = self.remove_where(&request.at, |l| l.id() == request.id);
            tracing::debug!(pattern = %request.at, listener = %request.id, removed, "listener detached itself");
        }
    }

    pub fn is_queueing(&self) -> bool {
        self.queueing
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Queued events, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &PendingEvent<A>> {
        self.pending.iter()
    }

    /// Listeners registered at exactly `pattern`.
    pub fn listener_count(&self, pattern: impl Into<Namespace>) -> usize {
        self.trie
            .get(&pattern.into())
            .map_or(0, |node| node.listeners().len())
    }

    /// Whether `emit(name, ..)` would currently be handled.
    pub fn has_listeners(&self, name: impl Into<Namespace>) -> bool {
        self.trie.reaches_listener(&name.into())
    }

    /// Live trie nodes, root included.
    pub fn node_count(&self) -> usize {
        self.trie.node_count()
    }

    pub(crate) fn enqueue(&mut self, namespace: Namespace, args: A) {
        let sequence = self.pending.push(namespace, args);
        tracing::debug!(
            sequence,
            pending = self.pending.len(),
            "queued unhandled event"
        );
    }

    /// Snapshot the queue for an out-of-lock replay.
    ///
    /// While another pass is running this only flags it, so that pass goes
    /// around again for the listener registered in the meantime.
    pub(crate) fn begin_replay(&mut self) -> Option<Vec<PendingEvent<A>>>
    where
        A: Clone,
    {
        if self.replaying {
            self.replay_dirty = true;
            return None;
        }
        if self.pending.is_empty() {
            return None;
        }
        self.replaying = true;
        Some(self.pending.snapshot())
    }

    /// Drop the entries a pass delivered and hand back the next pass, if a
    /// registration happened during this one and events are still queued.
    pub(crate) fn next_replay_pass(&mut self, delivered: &[u64]) -> Option<Vec<PendingEvent<A>>>
    where
        A: Clone,
    {
        self.forget_delivered(delivered);
        if std::mem::take(&mut self.replay_dirty) && !self.pending.is_empty() {
            return Some(self.pending.snapshot());
        }
        self.replaying = false;
        None
    }

    /// Abandon a replay that unwound or lost the lock.
    pub(crate) fn end_replay(&mut self, delivered: &[u64]) {
        self.replaying = false;
        self.replay_dirty = false;
        self.forget_delivered(delivered);
    }

    fn forget_delivered(&mut self, delivered: &[u64]) {
        let removed = self.pending.remove_sequences(delivered);
        tracing::debug!(
            delivered = removed,
            remaining = self.pending.len(),
            "replayed pending events"
        );
    }

    fn register(&mut self, namespace: Namespace, callback: Callback<A>, once: bool) -> ListenerId {
        let id = self.insert(&namespace, callback, once);
        self.replay_pending();
        id
    }

    fn deliver(&mut self, namespace: &Namespace, args: &A) -> bool {
        let dispatch = self.dispatch(namespace);
        let detached = dispatch.fire(args);
        self.settle(&detached);
        dispatch.is_handled()
    }

    /// Re-attempt every queued event in order. Replay goes through `deliver`,
    /// which never enqueues, so still-unhandled entries stay exactly once.
    fn replay_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let backlog = self.pending.take_all();
        let total = backlog.len();
        let mut kept = Vec::new();
        for entry in backlog {
            if !self.deliver(entry.namespace(), entry.args()) {
                kept.push(entry);
            }
        }

        let remaining = kept.len();
        self.pending.restore(kept);
        tracing::debug!(delivered = total - remaining, remaining, "replayed pending events");
    }

    fn remove_where<P>(&mut self, namespace: &Namespace, mut matches: P) -> bool
    where
        P: FnMut(&Listener<A>) -> bool,
    {
        let mut removed = false;
        self.trie.traverse(namespace, |node, visit| {
            if visit.reach == Reach::Exact {
                let listeners = node.listeners_mut();
                if let Some(pos) = listeners.iter().position(&mut matches) {
                    listeners.remove(pos);
                    removed = true;
                }
            }
            false
        });
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    fn log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn record(log: &Log, tag: &'static str) -> impl Fn(&JsonArgs) + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |args: &JsonArgs| {
            let rendered: Vec<String> = args.iter().map(|v| v.to_string()).collect();
            log.lock().unwrap().push(format!("{tag}({})", rendered.join(",")));
        }
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn fires_most_specific_first() {
        let calls = log();
        let mut emitter = Emitter::new();
        emitter
            .on("", record(&calls, "root"))
            .on("user", record(&calls, "user"))
            .on("user.created", record(&calls, "created"));

        assert!(emitter.emit("user.created", vec![json!(1)]));
        assert_eq!(entries(&calls), vec!["created(1)", "user(1)", "root(1)"]);
    }

    #[test]
    fn registration_order_within_a_node() {
        let calls = log();
        let mut emitter = Emitter::new();
        emitter
            .on("a", record(&calls, "first"))
            .on("a", record(&calls, "second"));

        emitter.emit("a", vec![]);
        assert_eq!(entries(&calls), vec!["first()", "second()"]);
    }

    #[test]
    fn descendants_do_not_fire_for_ancestors() {
        let calls = log();
        let mut emitter = Emitter::new();
        emitter.on("a.b", record(&calls, "ab"));

        assert!(!emitter.emit("a", vec![]));
        assert!(entries(&calls).is_empty());
    }

    #[test]
    fn once_fires_a_single_time() {
        let calls = log();
        let mut emitter = Emitter::new();
        emitter.once("a", record(&calls, "once"));

        assert!(emitter.emit("a", vec![]));
        assert!(!emitter.emit("a", vec![]));
        assert_eq!(entries(&calls), vec!["once()"]);
        assert_eq!(emitter.node_count(), 1);
    }

    #[test]
    fn returning_false_detaches() {
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        let mut emitter: Emitter<JsonArgs> = Emitter::new();
        emitter.on("tick", move |_: &JsonArgs| {
            let mut n = counter.lock().unwrap();
            *n += 1;
            *n < 2
        });

        for _ in 0..4 {
            emitter.emit("tick", vec![]);
        }
        assert_eq!(*hits.lock().unwrap(), 2);
        assert_eq!(emitter.listener_count("tick"), 0);
    }

    #[test]
    fn handled_counts_reachability_not_success() {
        let mut emitter: Emitter<JsonArgs> = Emitter::new();
        emitter.on("a", |_: &JsonArgs| Flow::Continue);
        assert!(emitter.emit("a.b.c", vec![]));
        assert!(!emitter.emit("b", vec![]));
    }

    #[test]
    fn remove_listener_is_exact_node_scoped() {
        let calls = log();
        let shared = Callback::new(record(&calls, "shared"));
        let mut emitter = Emitter::new();
        emitter
            .on_callback("a", shared.clone())
            .on_callback("a.b", shared.clone());

        // Only `a.b` is addressed; `a` keeps its registration.
        assert!(emitter.remove_listener("a.b", &shared));
        assert!(!emitter.remove_listener("a.b", &shared));
        assert_eq!(emitter.listener_count("a"), 1);

        // `a.b.c` has no node, so nothing is removed from `a` either.
        assert!(!emitter.remove_listener("a.b.c", &shared));
        assert_eq!(emitter.listener_count("a"), 1);
    }

    #[test]
    fn remove_listener_takes_first_match_only() {
        let calls = log();
        let cb = Callback::new(record(&calls, "cb"));
        let mut emitter = Emitter::new();
        emitter.on_callback("a", cb.clone()).on_callback("a", cb.clone());

        emitter.remove_listener("a", &cb);
        assert_eq!(emitter.listener_count("a"), 1);
    }

    #[test]
    fn off_removes_by_handle() {
        let calls = log();
        let mut emitter = Emitter::new();
        let id = emitter.subscribe("a", record(&calls, "a"));
        emitter.on("a", record(&calls, "other"));

        assert!(!emitter.off("a.b", id));
        assert!(emitter.off("a", id));
        emitter.emit("a", vec![]);
        assert_eq!(entries(&calls), vec!["other()"]);
    }

    #[test]
    fn remove_all_listeners_wipes_subtree_only() {
        let calls = log();
        let mut emitter = Emitter::new();
        emitter
            .on("", record(&calls, "root"))
            .on("a", record(&calls, "a"))
            .on("a.b", record(&calls, "ab"))
            .on("c", record(&calls, "c"));

        emitter.remove_all_listeners("a");
        assert!(emitter.emit("a.b", vec![]));
        assert_eq!(entries(&calls), vec!["root()"]);
        assert_eq!(emitter.listener_count("c"), 1);

        emitter.remove_all_listeners("");
        assert_eq!(emitter.node_count(), 1);
        assert!(!emitter.emit("c", vec![]));
    }

    #[test]
    fn unhandled_events_are_queued_and_replayed() {
        let calls = log();
        let mut emitter = Emitter::new();
        emitter.queue_unhandled_events(true);

        assert!(!emitter.emit("x", vec![json!(1)]));
        assert!(!emitter.emit("y", vec![json!(2)]));
        assert_eq!(emitter.pending_len(), 2);

        emitter.on("x", record(&calls, "x"));
        assert_eq!(entries(&calls), vec!["x(1)"]);
        let left: Vec<String> = emitter.pending().map(|e| e.namespace().to_string()).collect();
        assert_eq!(left, vec!["y"]);

        // Unrelated registration must not receive `y`.
        emitter.on("x", record(&calls, "x2"));
        assert_eq!(entries(&calls), vec!["x(1)"]);
        assert_eq!(emitter.pending_len(), 1);
    }

    #[test]
    fn replay_reaches_ancestor_listeners() {
        let calls = log();
        let mut emitter = Emitter::new();
        emitter.queue_unhandled_events(true);
        emitter.emit("user.created", vec![json!({"id": 1})]);

        emitter.on("user", record(&calls, "user"));
        assert_eq!(entries(&calls), vec![r#"user({"id":1})"#]);
        assert_eq!(emitter.pending_len(), 0);
    }

    #[test]
    fn disabling_queueing_discards_pending() {
        let calls = log();
        let mut emitter = Emitter::new();
        emitter.queue_unhandled_events(true);
        emitter.emit("x", vec![json!(1)]);

        emitter.queue_unhandled_events(false).on("x", record(&calls, "x"));
        assert!(entries(&calls).is_empty());
        assert_eq!(emitter.pending_len(), 0);
    }

    #[test]
    fn queueing_is_off_by_default() {
        let mut emitter: Emitter<JsonArgs> = Emitter::new();
        assert!(!emitter.is_queueing());
        emitter.emit("x", vec![]);
        assert_eq!(emitter.pending_len(), 0);
    }

    #[test]
    fn config_enables_capped_queue() {
        let config = EmitterConfig::default().queueing(true).max_pending(2);
        let mut emitter: Emitter<JsonArgs> = Emitter::with_config(config);
        for n in 0..5 {
            emitter.emit("x", vec![json!(n)]);
        }
        let args: Vec<JsonArgs> = emitter.pending().map(|e| e.args().clone()).collect();
        assert_eq!(args, vec![vec![json!(3)], vec![json!(4)]]);
    }

    #[test]
    fn dispatch_snapshot_is_ordered_and_consumes_once() {
        let mut emitter: Emitter<JsonArgs> = Emitter::new();
        emitter
            .once("a", |_: &JsonArgs| ())
            .on("a.b", |_: &JsonArgs| ());

        let dispatch = emitter.dispatch(&Namespace::parse("a.b"));
        let at: Vec<String> = dispatch.deliveries().iter().map(|d| d.at().to_string()).collect();
        assert_eq!(at, vec!["a.b", "a"]);
        assert_eq!(emitter.listener_count("a"), 0);
        assert_eq!(emitter.listener_count("a.b"), 1);
    }

    #[test]
    fn pruning_leaves_no_stale_nodes() {
        let calls = log();
        let mut emitter = Emitter::new();
        let id = emitter.subscribe("a.b.c", record(&calls, "old"));
        assert_eq!(emitter.node_count(), 4);

        emitter.off("a.b.c", id);
        assert_eq!(emitter.node_count(), 1);

        emitter.on("a.b.c", record(&calls, "new"));
        emitter.emit("a.b.c", vec![]);
        assert_eq!(entries(&calls), vec!["new()"]);
    }
}
