//! Thread-safe, re-entrant handle around an [`Emitter`].
//!
//! - One mutex guards the whole emitter (trie, queue, flag)
//! - Callbacks run with the lock released, from a snapshot of the listeners
//!   selected under it, so a listener may call back into the same handle
//! - A registration during a replay makes that replay run another pass
//! - A poisoned lock surfaces as [`BusError::Poisoned`]

use std::sync::{Arc, Mutex, MutexGuard};

use nsbus_core::{BusError, BusResult, EmitterConfig, ListenerId, Namespace};

use crate::emitter::{Dispatch, Emitter};
use crate::listener::{Callback, Flow};
use crate::queue::PendingEvent;

/// Cloneable handle to a shared emitter. Clones address the same emitter.
#[derive(Debug)]
pub struct SharedEmitter<A> {
    inner: Arc<Mutex<Emitter<A>>>,
}

impl<A> Clone for SharedEmitter<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> Default for SharedEmitter<A> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Emitter::default())),
        }
    }
}

impl<A> From<Emitter<A>> for SharedEmitter<A> {
    fn from(emitter: Emitter<A>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(emitter)),
        }
    }
}

impl<A> SharedEmitter<A>
where
    A: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EmitterConfig) -> Self {
        Emitter::with_config(config).into()
    }

    pub fn on<F, R>(&self, pattern: impl Into<Namespace>, listener: F) -> BusResult<&Self>
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.register(pattern.into(), Callback::new(listener), false)?;
        Ok(self)
    }

    pub fn once<F, R>(&self, pattern: impl Into<Namespace>, listener: F) -> BusResult<&Self>
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.register(pattern.into(), Callback::new(listener), true)?;
        Ok(self)
    }

    pub fn on_callback(&self, pattern: impl Into<Namespace>, callback: Callback<A>) -> BusResult<&Self> {
        self.register(pattern.into(), callback, false)?;
        Ok(self)
    }

    pub fn once_callback(&self, pattern: impl Into<Namespace>, callback: Callback<A>) -> BusResult<&Self> {
        self.register(pattern.into(), callback, true)?;
        Ok(self)
    }

    pub fn subscribe<F, R>(&self, pattern: impl Into<Namespace>, listener: F) -> BusResult<ListenerId>
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.register(pattern.into(), Callback::new(listener), false)
    }

    pub fn subscribe_once<F, R>(&self, pattern: impl Into<Namespace>, listener: F) -> BusResult<ListenerId>
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.register(pattern.into(), Callback::new(listener), true)
    }

    /// Fire `name`; see [`Emitter::emit`].
    pub fn emit(&self, name: impl Into<Namespace>, args: A) -> BusResult<bool> {
        let namespace = name.into();

        // Selecting listeners and queueing happen under one lock so a
        // concurrent registration cannot slip in between them.
        let dispatch = {
            let mut emitter = self.lock()?;
            let dispatch = emitter.dispatch(&namespace);
            if !dispatch.is_handled() && emitter.is_queueing() {
                emitter.enqueue(namespace, args.clone());
            }
            dispatch
        };

        self.fire(&dispatch, &args)?;
        Ok(dispatch.is_handled())
    }

    pub fn remove_listener(&self, pattern: impl Into<Namespace>, callback: &Callback<A>) -> BusResult<bool> {
        Ok(self.lock()?.remove_listener(pattern, callback))
    }

    pub fn off(&self, pattern: impl Into<Namespace>, id: ListenerId) -> BusResult<bool> {
        Ok(self.lock()?.off(pattern, id))
    }

    pub fn remove_all_listeners(&self, pattern: impl Into<Namespace>) -> BusResult<()> {
        self.lock()?.remove_all_listeners(pattern);
        Ok(())
    }

    pub fn queue_unhandled_events(&self, enable: bool) -> BusResult<&Self> {
        self.lock()?.queue_unhandled_events(enable);
        Ok(self)
    }

    pub fn is_queueing(&self) -> BusResult<bool> {
        Ok(self.lock()?.is_queueing())
    }

    pub fn pending_len(&self) -> BusResult<usize> {
        Ok(self.lock()?.pending_len())
    }

    /// Copy of the queued events, oldest first.
    pub fn pending(&self) -> BusResult<Vec<PendingEvent<A>>> {
        Ok(self.lock()?.pending().cloned().collect())
    }

    pub fn listener_count(&self, pattern: impl Into<Namespace>) -> BusResult<usize> {
        Ok(self.lock()?.listener_count(pattern))
    }

    pub fn has_listeners(&self, name: impl Into<Namespace>) -> BusResult<bool> {
        Ok(self.lock()?.has_listeners(name))
    }

    pub fn node_count(&self) -> BusResult<usize> {
        Ok(self.lock()?.node_count())
    }

    fn lock(&self) -> BusResult<MutexGuard<'_, Emitter<A>>> {
        self.inner.lock().map_err(|_| BusError::Poisoned)
    }

    fn register(&self, namespace: Namespace, callback: Callback<A>, once: bool) -> BusResult<ListenerId> {
        let (id, backlog) = {
            let mut emitter = self.lock()?;
            let id = emitter.insert(&namespace, callback, once);
            (id, emitter.begin_replay())
        };

        // A registration made while another replay runs skips this; the
        // running replay makes another pass over what is still queued.
        if let Some(mut backlog) = backlog {
            let mut replay = Replay {
                emitter: self,
                delivered: Vec::new(),
                finished: false,
            };
            loop {
                for entry in &backlog {
                    if self.deliver(entry.namespace(), entry.args())? {
                        replay.delivered.push(entry.sequence());
                    }
                }
                match replay.next_pass()? {
                    Some(next) => backlog = next,
                    None => break,
                }
            }
        }

        Ok(id)
    }

    fn deliver(&self, namespace: &Namespace, args: &A) -> BusResult<bool> {
        let dispatch = self.lock()?.dispatch(namespace);
        self.fire(&dispatch, args)?;
        Ok(dispatch.is_handled())
    }

    fn fire(&self, dispatch: &Dispatch<A>, args: &A) -> BusResult<()> {
        let detached = dispatch.fire(args);
        if !detached.is_empty() {
            self.lock()?.settle(&detached);
        }
        Ok(())
    }
}

/// Tracks one replay across passes; resets the replay state if it is
/// abandoned by an unwinding listener or a lock failure.
struct Replay<'a, A>
where
    A: Clone + Send + 'static,
{
    emitter: &'a SharedEmitter<A>,
    delivered: Vec<u64>,
    finished: bool,
}

impl<A> Replay<'_, A>
where
    A: Clone + Send + 'static,
{
    fn next_pass(&mut self) -> BusResult<Option<Vec<PendingEvent<A>>>> {
        let next = self.emitter.lock()?.next_replay_pass(&self.delivered);
        self.delivered.clear();
        self.finished = next.is_none();
        Ok(next)
    }
}

impl<A> Drop for Replay<'_, A>
where
    A: Clone + Send + 'static,
{
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Ok(mut emitter) = self.emitter.inner.lock() {
            emitter.end_replay(&self.delivered);
        }
    }
}
