use futures::future::join_all;

use crate::error::ClientResult;
use crate::gateway::DynNotificationApi;
use crate::model::{Event, Notification};

/// A notification together with the event it announces, when it names one.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEntry {
    pub notification: Notification,
    pub event: Option<Event>,
}

pub struct NotificationFeed {
    api: DynNotificationApi,
}

impl NotificationFeed {
    pub fn new(api: DynNotificationApi) -> Self {
        Self { api }
    }

    /// Fetch notifications, then every referenced event concurrently. An event
    /// that fails to load leaves its notification without one.
    pub async fn load(&self) -> ClientResult<Vec<NotificationEntry>> {
        let notifications = self.api.notifications().await?;

        let lookups = notifications.iter().map(|n| async move {
            let id = n.event?;
            match self.api.event(id).await {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!(event = %id, error = %e, "Failed to load event");
                    None
                }
            }
        });
        let events = join_all(lookups).await;

        Ok(notifications
            .into_iter()
            .zip(events)
            .map(|(notification, event)| NotificationEntry {
                notification,
                event,
            })
            .collect())
    }
}
