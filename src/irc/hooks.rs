//! Observers invoked for every frame the client receives.
//!
//! Hooks are registered once at startup into a [`HookRegistry`], which is
//! then frozen behind an `Arc` and handed to the client. Invocation order is
//! registration order.

use super::client::Client;
use async_trait::async_trait;
use irc::client::prelude::Message;

/// An observer of inbound frames.
///
/// A hook runs on the client's own task: it may send through `client`, but a
/// hook that blocks for long stalls every frame behind it. Slow work belongs
/// on a spawned task that reports back through a
/// [`ClientHandle`](super::client::ClientHandle).
#[async_trait]
pub trait Hook: Send + Sync {
    fn name(&self) -> &str;

    /// Handle one frame. Failures are the hook's to log; nothing is returned.
    async fn on_message(&self, client: &mut Client, message: &Message);
}

/// Ordered, append-only list of hooks.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Box<dyn Hook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H: Hook + 'static>(&mut self, hook: H) -> &mut Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Hook> {
        self.hooks.iter().map(|h| h.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|h| h.name()).collect()
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl Hook for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn on_message(&self, _client: &mut Client, _message: &Message) {}
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let mut registry = HookRegistry::new();
        assert!(registry.is_empty());

        registry
            .register(Named("first"))
            .register(Named("second"))
            .register(Named("third"));

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.names(), vec!["first", "second", "third"]);
        assert_eq!(format!("{:?}", registry), r#"["first", "second", "third"]"#);
    }
}
