//! Server events and the bus that delivers them.
//!
//! Listeners are registered up front and run in registration order on the
//! dispatching thread; any of them may ignore (veto) an ignorable event. After
//! the listeners have run, the event is published on a `tokio::sync::broadcast`
//! channel so console and async observers see what happened, including
//! whether it was ignored.

use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::opts::Weather;

/// Recommended capacity for the broadcast channel.
pub const BUS_CAPACITY: usize = 256;

/// An event a listener can veto.
pub trait Ignorable {
    fn is_ignored(&self) -> bool;

    /// Mark the event ignored (or take that back). An event that is still
    /// ignored after every listener has run does not happen.
    fn ignore(&mut self, ignored: bool);
}

/// A world's weather is about to change.
#[derive(Clone, Debug, PartialEq)]
pub struct WeatherEvent {
    world: String,
    weather: Weather,
    ignored: bool,
}

impl WeatherEvent {
    pub fn new(world: impl Into<String>, weather: Weather) -> Self {
        Self {
            world: world.into(),
            weather,
            ignored: false,
        }
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    /// The weather the world will have if the event goes through.
    pub fn weather(&self) -> Weather {
        self.weather
    }
}

impl Ignorable for WeatherEvent {
    fn is_ignored(&self) -> bool {
        self.ignored
    }

    fn ignore(&mut self, ignored: bool) {
        self.ignored = ignored;
    }
}

/// A player closed an inventory window.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerCloseWindowEvent {
    player: Uuid,
    window: u8,
    ignored: bool,
}

impl PlayerCloseWindowEvent {
    pub fn new(player: Uuid, window: u8) -> Self {
        Self {
            player,
            window,
            ignored: false,
        }
    }

    pub fn player(&self) -> Uuid {
        self.player
    }

    pub fn window(&self) -> u8 {
        self.window
    }
}

impl Ignorable for PlayerCloseWindowEvent {
    fn is_ignored(&self) -> bool {
        self.ignored
    }

    fn ignore(&mut self, ignored: bool) {
        self.ignored = ignored;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ServerEvent {
    Weather(WeatherEvent),
    PlayerCloseWindow(PlayerCloseWindowEvent),
}

impl Ignorable for ServerEvent {
    fn is_ignored(&self) -> bool {
        match self {
            Self::Weather(e) => e.is_ignored(),
            Self::PlayerCloseWindow(e) => e.is_ignored(),
        }
    }

    fn ignore(&mut self, ignored: bool) {
        match self {
            Self::Weather(e) => e.ignore(ignored),
            Self::PlayerCloseWindow(e) => e.ignore(ignored),
        }
    }
}

impl From<WeatherEvent> for ServerEvent {
    fn from(e: WeatherEvent) -> Self {
        Self::Weather(e)
    }
}

impl From<PlayerCloseWindowEvent> for ServerEvent {
    fn from(e: PlayerCloseWindowEvent) -> Self {
        Self::PlayerCloseWindow(e)
    }
}

pub type Listener = Arc<dyn Fn(&mut ServerEvent) + Send + Sync>;

pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
    tx: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self {
            listeners: RwLock::new(Vec::new()),
            tx,
        }
    }

    /// Add a listener. It runs after every listener registered before it.
    pub fn listen(&self, listener: impl Fn(&mut ServerEvent) + Send + Sync + 'static) {
        self.listeners
            .write()
            .expect("listener list poisoned")
            .push(Arc::new(listener));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    /// Run every listener over `event`, publish the result and hand it back.
    ///
    /// Ignoring does not stop later listeners; each sees the event as the
    /// previous ones left it. Listeners run on a copy of the list, so they
    /// may register listeners or dispatch events themselves; those added
    /// here first see the next event.
    pub fn dispatch(&self, event: impl Into<ServerEvent>) -> ServerEvent {
        let mut event = event.into();
        let listeners = self.listeners.read().expect("listener list poisoned").clone();
        for listener in &listeners {
            listener(&mut event);
        }
        // No subscribers is fine.
        let _ = self.tx.send(event.clone());
        event
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn listeners_run_in_order_and_all_run() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&seen);
        bus.listen(move |event| {
            assert_eq!(s.fetch_add(1, Ordering::SeqCst), 0);
            event.ignore(true);
        });
        let s = Arc::clone(&seen);
        bus.listen(move |event| {
            assert_eq!(s.fetch_add(1, Ordering::SeqCst), 1);
            assert!(event.is_ignored());
        });

        let out = bus.dispatch(WeatherEvent::new("world", Weather::rain()));
        assert!(out.is_ignored());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn later_listener_can_take_back_an_ignore() {
        let bus = EventBus::new();
        bus.listen(|event| event.ignore(true));
        bus.listen(|event| event.ignore(false));
        assert!(!bus.dispatch(WeatherEvent::new("world", Weather::rain())).is_ignored());
    }

    #[test]
    fn listeners_can_register_listeners() {
        let bus = Arc::new(EventBus::new());
        let late = Arc::new(AtomicUsize::new(0));

        let (b, l) = (Arc::clone(&bus), Arc::clone(&late));
        bus.listen(move |_| {
            let l = Arc::clone(&l);
            b.listen(move |_| {
                l.fetch_add(1, Ordering::SeqCst);
            });
        });

        bus.dispatch(WeatherEvent::new("world", Weather::rain()));
        assert_eq!(late.load(Ordering::SeqCst), 0);
        bus.dispatch(WeatherEvent::new("world", Weather::clear()));
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unignored_without_listeners() {
        let bus = EventBus::new();
        let out = bus.dispatch(PlayerCloseWindowEvent::new(Uuid::nil(), 3));
        assert!(!out.is_ignored());
        let ServerEvent::PlayerCloseWindow(e) = out else {
            panic!("wrong variant");
        };
        assert_eq!(e.window(), 3);
    }

    #[test]
    fn subscribers_see_dispatched_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.listen(|event| {
            if let ServerEvent::Weather(w) = event {
                if w.weather().thundering {
                    w.ignore(true);
                }
            }
        });

        bus.dispatch(WeatherEvent::new("world", Weather::thunder()));
        bus.dispatch(WeatherEvent::new("world", Weather::clear()));

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert!(first.is_ignored());
        assert!(!second.is_ignored());
        assert!(rx.try_recv().is_err());
    }
}
