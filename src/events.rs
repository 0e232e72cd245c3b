//! Navigation intents emitted by the console.
//!
//! State changes that the UI should follow (losing the device, opening a
//! freshly created session) are announced as [`NavigationIntent`] values on a
//! channel. Whatever owns routing drains the receiver; the core never
//! navigates by itself.

use std::fmt;

use tokio::sync::mpsc;
use tracing::debug;

/// A view the router should switch to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationIntent {
    /// The application's home view.
    Root,
    /// The view of one session.
    Session(String),
}

impl NavigationIntent {
    /// Route path of the target view.
    pub fn path(&self) -> String {
        match self {
            NavigationIntent::Root => "/".to_string(),
            NavigationIntent::Session(id) => format!("/session/{}", id),
        }
    }
}

impl fmt::Display for NavigationIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Receiving end handed to the router.
pub type NavigationReceiver = mpsc::UnboundedReceiver<NavigationIntent>;

/// Sending end shared by the components that emit intents.
#[derive(Debug, Clone)]
pub struct Navigator {
    sender: mpsc::UnboundedSender<NavigationIntent>,
}

impl Navigator {
    /// Create a navigator and the receiver its intents arrive on.
    pub fn channel() -> (Self, NavigationReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Emit an intent. A dropped receiver is not an error; nobody is routing.
    pub fn emit(&self, intent: NavigationIntent) {
        debug!(route = %intent, "navigation intent");
        if self.sender.send(intent).is_err() {
            debug!("no router listening, intent dropped");
        }
    }
}

/// Drain every intent currently queued, without waiting.
pub fn drain(receiver: &mut NavigationReceiver) -> Vec<NavigationIntent> {
    let mut intents = Vec::new();
    while let Ok(intent) = receiver.try_recv() {
        intents.push(intent);
    }
    intents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_match_router_routes() {
        assert_eq!(NavigationIntent::Root.path(), "/");
        assert_eq!(NavigationIntent::Session("42".into()).path(), "/session/42");
    }

    #[test]
    fn emitted_intents_arrive_in_order() {
        let (navigator, mut receiver) = Navigator::channel();
        navigator.emit(NavigationIntent::Session("a".into()));
        navigator.emit(NavigationIntent::Root);

        assert_eq!(
            drain(&mut receiver),
            vec![NavigationIntent::Session("a".into()), NavigationIntent::Root]
        );
        assert!(drain(&mut receiver).is_empty());
    }

    #[test]
    fn emit_without_receiver_is_silent() {
        let (navigator, receiver) = Navigator::channel();
        drop(receiver);
        navigator.emit(NavigationIntent::Root);
    }
}
