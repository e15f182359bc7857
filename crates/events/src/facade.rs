//! Emitter capability for types that embed an [`Emitter`].
//!
//! Host types get the full emitter surface by owning an `Emitter` and exposing
//! it through [`NamespaceEmitter`]; every provided method forwards to the
//! embedded engine and returns the host for chaining where the engine does.
//!
//! ```ignore
//! struct Accounts {
//!     events: Emitter<JsonArgs>,
//! }
//!
//! impl NamespaceEmitter<JsonArgs> for Accounts {
//!     fn emitter(&self) -> &Emitter<JsonArgs> { &self.events }
//!     fn emitter_mut(&mut self) -> &mut Emitter<JsonArgs> { &mut self.events }
//! }
//!
//! accounts.on("account", audit).emit("account.opened", vec![json!(42)]);
//! ```

use nsbus_core::{ListenerId, Namespace};

use crate::emitter::Emitter;
use crate::listener::{Callback, Flow};

pub trait NamespaceEmitter<A: 'static> {
    fn emitter(&self) -> &Emitter<A>;

    fn emitter_mut(&mut self) -> &mut Emitter<A>;

    fn on<F, R>(&mut self, pattern: impl Into<Namespace>, listener: F) -> &mut Self
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.emitter_mut().on(pattern, listener);
        self
    }

    fn once<F, R>(&mut self, pattern: impl Into<Namespace>, listener: F) -> &mut Self
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.emitter_mut().once(pattern, listener);
        self
    }

    fn on_callback(&mut self, pattern: impl Into<Namespace>, callback: Callback<A>) -> &mut Self {
        self.emitter_mut().on_callback(pattern, callback);
        self
    }

    fn subscribe<F, R>(&mut self, pattern: impl Into<Namespace>, listener: F) -> ListenerId
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.emitter_mut().subscribe(pattern, listener)
    }

    fn emit(&mut self, name: impl Into<Namespace>, args: A) -> bool {
        self.emitter_mut().emit(name, args)
    }

    fn remove_listener(&mut self, pattern: impl Into<Namespace>, callback: &Callback<A>) -> bool {
        self.emitter_mut().remove_listener(pattern, callback)
    }

    fn off(&mut self, pattern: impl Into<Namespace>, id: ListenerId) -> bool {
        self.emitter_mut().off(pattern, id)
    }

    fn remove_all_listeners(&mut self, pattern: impl Into<Namespace>) {
        self.emitter_mut().remove_all_listeners(pattern);
    }

    fn queue_unhandled_events(&mut self, enable: bool) -> &mut Self {
        self.emitter_mut().queue_unhandled_events(enable);
        self
    }
}

impl<A: 'static> NamespaceEmitter<A> for Emitter<A> {
    fn emitter(&self) -> &Emitter<A> {
        self
    }

    fn emitter_mut(&mut self) -> &mut Emitter<A> {
        self
    }
}

impl<A, T> NamespaceEmitter<A> for Box<T>
where
    A: 'static,
    T: NamespaceEmitter<A> + ?Sized,
{
    fn emitter(&self) -> &Emitter<A> {
        (**self).emitter()
    }

    fn emitter_mut(&mut self) -> &mut Emitter<A> {
        (**self).emitter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::JsonArgs;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Host type that owns its emitter by composition.
    #[derive(Default)]
    struct Accounts {
        events: Emitter<JsonArgs>,
        opened: u32,
    }

    impl Accounts {
        fn open(&mut self) -> bool {
            self.opened += 1;
            let id = self.opened;
            self.emit("account.opened", vec![json!(id)])
        }
    }

    impl NamespaceEmitter<JsonArgs> for Accounts {
        fn emitter(&self) -> &Emitter<JsonArgs> {
            &self.events
        }

        fn emitter_mut(&mut self) -> &mut Emitter<JsonArgs> {
            &mut self.events
        }
    }

    #[test]
    fn host_type_forwards_to_embedded_emitter() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut accounts = Accounts::default();
        accounts
            .queue_unhandled_events(true)
            .on("account", move |args: &JsonArgs| {
                sink.lock().unwrap().push(args[0].clone());
            });

        assert!(accounts.open());
        assert!(accounts.open());
        assert_eq!(*seen.lock().unwrap(), vec![json!(1), json!(2)]);
        assert_eq!(accounts.emitter().listener_count("account"), 1);
    }

    #[test]
    fn boxed_hosts_forward_too() {
        let mut boxed: Box<Accounts> = Box::default();
        let id = boxed.subscribe("account", |_: &JsonArgs| ());
        assert!(boxed.open());
        assert!(boxed.off("account", id));
        assert!(!boxed.open());
        assert_eq!(boxed.emitter().node_count(), 1);
    }
}
