//! Page contexts (clients) and which generation controls them.

use std::collections::HashMap;
use tokio::sync::RwLock;

/// Registry of open page contexts.
///
/// A client attached before any activation is uncontrolled; `claim` hands
/// every attached client to the given generation at once, without a reload.
/// Services for successive versions share one registry so the newer one can
/// take over pages opened under the older.
#[derive(Debug, Default)]
pub struct Clients {
    controllers: RwLock<HashMap<String, Option<String>>>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly opened page. `controller` is the generation serving it,
    /// if one was active when it loaded.
    pub async fn attach(&self, id: impl Into<String>, controller: Option<String>) {
        self.controllers.write().await.insert(id.into(), controller);
    }

    /// Attach `id` unless it is already tracked. Returns its controller.
    pub async fn attach_if_absent(&self, id: &str, controller: Option<String>) -> Option<String> {
        self.controllers
            .write()
            .await
            .entry(id.to_string())
            .or_insert(controller)
            .clone()
    }

    pub async fn detach(&self, id: &str) -> bool {
        self.controllers.write().await.remove(id).is_some()
    }

    pub async fn controller(&self, id: &str) -> Option<String> {
        self.controllers.read().await.get(id).cloned().flatten()
    }

    /// Take control of every attached client. Returns how many changed hands.
    pub async fn claim(&self, generation: &str) -> usize {
        let mut controllers = self.controllers.write().await;
        let mut claimed = 0;
        for controller in controllers.values_mut() {
            if controller.as_deref() != Some(generation) {
                *controller = Some(generation.to_string());
                claimed += 1;
            }
        }
        claimed
    }

    pub async fn len(&self) -> usize {
        self.controllers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.controllers.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_claim_takes_over_all_clients() {
        let clients = Clients::new();
        clients.attach("tab-1", None).await;
        clients.attach("tab-2", Some("site-v1".into())).await;

        let claimed = clients.claim("site-v2").await;

        assert_eq!(claimed, 2);
        assert_eq!(clients.controller("tab-1").await.as_deref(), Some("site-v2"));
        assert_eq!(clients.controller("tab-2").await.as_deref(), Some("site-v2"));
    }

    #[tokio::test]
    async fn test_claim_skips_already_controlled() {
        let clients = Clients::new();
        clients.attach("tab-1", Some("site-v2".into())).await;
        assert_eq!(clients.claim("site-v2").await, 0);
    }

    #[tokio::test]
    async fn test_attach_if_absent_keeps_existing_controller() {
        let clients = Clients::new();
        assert_eq!(clients.attach_if_absent("tab-1", Some("site-v1".into())).await.as_deref(), Some("site-v1"));
        assert_eq!(clients.attach_if_absent("tab-1", Some("site-v2".into())).await.as_deref(), Some("site-v1"));
        assert_eq!(clients.len().await, 1);
    }

    #[tokio::test]
    async fn test_detach() {
        let clients = Clients::new();
        clients.attach("tab-1", None).await;
        assert!(clients.detach("tab-1").await);
        assert!(!clients.detach("tab-1").await);
        assert!(clients.is_empty().await);
        assert_eq!(clients.controller("tab-1").await, None);
    }
}
