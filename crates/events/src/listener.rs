//! Listener callbacks and their registrations.

use std::sync::Arc;

use nsbus_core::ListenerId;

/// What a listener wants after it has run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Flow {
    /// Stay subscribed.
    #[default]
    Continue,
    /// Unsubscribe this listener now.
    Detach,
}

/// Listeners that return nothing stay subscribed.
impl From<()> for Flow {
    fn from(_: ()) -> Self {
        Flow::Continue
    }
}

/// `false` is the detach sentinel; `true` keeps the listener.
impl From<bool> for Flow {
    fn from(keep: bool) -> Self {
        if keep { Flow::Continue } else { Flow::Detach }
    }
}

type CallbackFn<A> = dyn Fn(&A) -> Flow + Send + Sync;

/// A shareable listener callback.
///
/// Equality is identity: two `Callback`s are equal only when they are clones of
/// the same registration-time closure, never because they capture equal state.
pub struct Callback<A> {
    inner: Arc<CallbackFn<A>>,
}

impl<A> Callback<A> {
    pub fn new<F, R>(f: F) -> Self
    where
        A: 'static,
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        Self {
            inner: Arc::new(move |args: &A| f(args).into()),
        }
    }

    pub fn call(&self, args: &A) -> Flow {
        (self.inner)(args)
    }

    pub fn ptr_eq(&self, other: &Callback<A>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<A> Clone for Callback<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> PartialEq for Callback<A> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<A> Eq for Callback<A> {}

impl<A> core::fmt::Debug for Callback<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Callback")
            .field(&Arc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}

/// One registration held by a trie node.
#[derive(Debug)]
pub struct Listener<A> {
    id: ListenerId,
    callback: Callback<A>,
    once: bool,
}

impl<A> Listener<A> {
    pub fn new(callback: Callback<A>, once: bool) -> Self {
        Self {
            id: ListenerId::new(),
            callback,
            once,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn callback(&self) -> &Callback<A> {
        &self.callback
    }

    pub fn is_once(&self) -> bool {
        self.once
    }
}

impl<A> Clone for Listener<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: self.callback.clone(),
            once: self.once,
        }
    }
}
