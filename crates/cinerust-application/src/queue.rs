// SPDX-License-Identifier: GPL-3.0-or-later
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::download::{DownloadClient, DownloadClientItem};

/// Polls every download client and keeps the last good snapshot per
/// client. A client that fails or times out keeps its previous snapshot
/// rather than making its items vanish from the queue.
pub struct DownloadMonitor {
    clients: Vec<Arc<dyn DownloadClient>>,
    poll_timeout: Duration,
    known: HashMap<String, Vec<DownloadClientItem>>,
}

impl DownloadMonitor {
    pub fn new(clients: Vec<Arc<dyn DownloadClient>>, poll_timeout: Duration) -> Self {
        Self {
            clients,
            poll_timeout,
            known: HashMap::new(),
        }
    }

    pub async fn refresh(&mut self) {
        for client in &self.clients {
            let name = client.name().to_string();
            match tokio::time::timeout(self.poll_timeout, client.get_items()).await {
                Ok(Ok(items)) => {
                    debug!(
                        target: "queue",
                        client = %name,
                        items = items.len(),
                        "queue snapshot refreshed"
                    );
                    self.known.insert(name, items);
                }
                Ok(Err(err)) => {
                    warn!(
                        target: "queue",
                        client = %name,
                        error = %err,
                        "queue refresh failed, keeping previous snapshot"
                    );
                }
                Err(_) => {
                    warn!(
                        target: "queue",
                        client = %name,
                        timeout_secs = self.poll_timeout.as_secs(),
                        "queue refresh timed out, keeping previous snapshot"
                    );
                }
            }
        }
    }

    /// All items across clients, in client configuration order.
    pub fn items(&self) -> Vec<DownloadClientItem> {
        self.clients
            .iter()
            .filter_map(|client| self.known.get(client.name()))
            .flatten()
            .cloned()
            .collect()
    }

    pub fn items_for_client(&self, client_name: &str) -> &[DownloadClientItem] {
        self.known
            .get(client_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn find(&self, download_id: &str) -> Option<&DownloadClientItem> {
        self.known
            .values()
            .flatten()
            .find(|item| item.download_id == download_id)
    }
}
