//! The central simulation object.
//!
//! A `Context` owns everything a simulation needs: the queue of scheduled plans, a queue of
//! event handlers that run before the next plan, typed data containers registered through
//! [`define_data_plugin!`], and the subscribers for each event type. Nothing is stored in
//! globals, so independent contexts can run side by side (in tests, or in separate threads).
use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::rc::Rc;

use log::trace;
use rustc_hash::FxHashMap;

use crate::plan::PlanQueue;

/// A type that names a data container stored in a [`Context`].
pub trait DataPlugin: Any {
    type DataContainer: Any;

    fn create_data_container() -> Self::DataContainer;
}

/// Defines a new type for storing data in `Context`.
///
/// The container is created lazily from `$default` the first time it is requested mutably.
#[macro_export]
macro_rules! define_data_plugin {
    ($plugin:ident, $data_container:ty, $default: expr) => {
        struct $plugin;

        impl $crate::context::DataPlugin for $plugin {
            type DataContainer = $data_container;

            fn create_data_container() -> Self::DataContainer {
                $default
            }
        }
    };
}
pub use define_data_plugin;

/// Marker trait for values that can be broadcast with [`Context::emit_event`].
pub trait Event: Copy + 'static {}

type Callback = dyn FnOnce(&mut Context);
type EventHandler<E> = dyn Fn(&mut Context, E);

pub struct Context {
    plan_queue: PlanQueue<Box<Callback>>,
    callback_queue: VecDeque<Box<Callback>>,
    data_plugins: FxHashMap<TypeId, Box<dyn Any>>,
    event_handlers: FxHashMap<TypeId, Box<dyn Any>>,
    current_time: f64,
}

impl Context {
    #[must_use]
    pub fn new() -> Context {
        Context {
            plan_queue: PlanQueue::new(),
            callback_queue: VecDeque::new(),
            data_plugins: FxHashMap::default(),
            event_handlers: FxHashMap::default(),
            current_time: 0.0,
        }
    }

    /// Schedules `callback` to run at `time`.
    ///
    /// # Panics
    ///
    /// Panics if `time` is NaN, infinite or earlier than the current time.
    pub fn add_plan(&mut self, time: f64, callback: impl FnOnce(&mut Context) + 'static) {
        assert!(
            !time.is_nan() && !time.is_infinite() && time >= self.current_time,
            "Invalid time value"
        );
        trace!("adding plan at {time}");
        self.plan_queue.add_plan(time, Box::new(callback));
    }

    /// Registers `handler` to be called every time an event of type `E` is emitted.
    pub fn subscribe_to_event<E: Event>(&mut self, handler: impl Fn(&mut Context, E) + 'static) {
        let handlers = self
            .event_handlers
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::<Vec<Rc<EventHandler<E>>>>::default());
        if let Some(handlers) = handlers.downcast_mut::<Vec<Rc<EventHandler<E>>>>() {
            handlers.push(Rc::new(handler));
        }
    }

    /// Queues one callback per subscriber of `E`. Handlers run after the current plan or
    /// callback returns, in the order the events were emitted.
    pub fn emit_event<E: Event>(&mut self, event: E) {
        let Context {
            event_handlers,
            callback_queue,
            ..
        } = self;
        let Some(handlers) = event_handlers
            .get(&TypeId::of::<E>())
            .and_then(|handlers| handlers.downcast_ref::<Vec<Rc<EventHandler<E>>>>())
        else {
            return;
        };
        for handler in handlers {
            let handler = Rc::clone(handler);
            callback_queue.push_back(Box::new(move |context| handler(context, event)));
        }
    }

    /// Returns the data container for `T`, or `None` if it has never been created.
    #[must_use]
    pub fn get_data<T: DataPlugin>(&self, _plugin: T) -> Option<&T::DataContainer> {
        self.data_plugins
            .get(&TypeId::of::<T>())
            .and_then(|container| container.downcast_ref::<T::DataContainer>())
    }

    /// Returns the data container for `T`, creating it on first use.
    pub fn get_data_mut<T: DataPlugin>(&mut self, _plugin: T) -> &mut T::DataContainer {
        self.data_plugins
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::create_data_container()))
            .downcast_mut::<T::DataContainer>()
            .expect("data plugin container has the type its plugin declares")
    }

    #[must_use]
    pub fn get_current_time(&self) -> f64 {
        self.current_time
    }

    /// Runs queued event handlers and plans until both queues are empty.
    pub fn execute(&mut self) {
        trace!("entering event loop");
        loop {
            if let Some(callback) = self.callback_queue.pop_front() {
                callback(self);
                continue;
            }

            if let Some(plan) = self.plan_queue.get_next_plan() {
                self.current_time = plan.time;
                (plan.data)(self);
            } else {
                break;
            }
        }
        trace!("event loop finished at t={}", self.current_time);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
