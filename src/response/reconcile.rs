//! Periodically repair the hub from the store
//!
//! Posts written by another replica, or dropped because the hub's inbound queue was
//! never reached, only show up here.
use super::hub::Hub;
use crate::store::{self, SharedStore};

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

pub struct Reconciler {
    hub: Hub,
    store: SharedStore,
    interval: Duration,
}

impl Reconciler {
    pub fn new(hub: Hub, store: SharedStore, interval: Duration) -> Self {
        Self {
            hub,
            store,
            interval,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs forever; the first check happens one interval after the call.
    pub async fn run(self) {
        let mut ticks = time::interval_at(Instant::now() + self.interval, self.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            self.reconcile_once().await;
        }
    }

    /// Notify the hub if the store knows a newer post than the hub does.
    pub async fn reconcile_once(&self) {
        let newest = match store::blocking(&self.store, |store| store.get_last_post()).await {
            Ok(post) => post,
            Err(e) if e.is_not_found() => return,
            Err(e) => {
                log::warn!("Reconciliation skipped: {}", e);
                return;
            }
        };
        if self.hub.last_id().map_or(true, |id| newest.id > id) {
            log::info!("Reconciling the hub up to post {}", newest.id);
            if let Err(e) = self.hub.notify(newest) {
                log::warn!("Reconciliation failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::{Id, NewPost};
    use crate::store::MemoryStore;

    use std::sync::Arc;
    use tokio::time::{sleep, timeout};

    async fn settled(hub: &Hub, id: Option<Id>) {
        timeout(Duration::from_secs(2), async {
            while hub.last_id() != id {
                sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("hub never caught up with the store");
    }

    fn create(store: &SharedStore, text: &str) {
        store
            .create_post(&NewPost::new("writer", text))
            .expect("memory store");
    }

    #[tokio::test]
    async fn empty_store_is_not_an_error() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let hub = Hub::new(None, 3, false);
        Reconciler::new(hub.clone(), store, Duration::from_secs(30))
            .reconcile_once()
            .await;
        sleep(Duration::from_millis(20)).await;
        assert_eq!(hub.last_id(), None);
    }

    #[tokio::test]
    async fn posts_missing_from_the_hub_are_notified() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let hub = Hub::new(None, 3, false);
        let reconciler = Reconciler::new(hub.clone(), Arc::clone(&store), Duration::from_secs(30));

        create(&store, "one");
        reconciler.reconcile_once().await;
        settled(&hub, Some(Id(1))).await;

        create(&store, "two");
        create(&store, "three");
        reconciler.reconcile_once().await;
        settled(&hub, Some(Id(3))).await;
    }

    #[tokio::test]
    async fn hub_ahead_of_the_store_is_left_alone() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        create(&store, "one");
        let hub = Hub::new(None, 3, false);
        hub.notify(crate::post::sample(9, 1, &[])).expect("worker running");
        settled(&hub, Some(Id(9))).await;

        Reconciler::new(hub.clone(), store, Duration::from_secs(30))
            .reconcile_once()
            .await;
        sleep(Duration::from_millis(20)).await;
        assert_eq!(hub.last_id(), Some(Id(9)));
    }

    #[tokio::test]
    async fn spawned_poller_ticks_on_its_interval() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let hub = Hub::new(None, 3, false);
        let poller =
            Reconciler::new(hub.clone(), Arc::clone(&store), Duration::from_millis(10)).spawn();

        create(&store, "one");
        settled(&hub, Some(Id(1))).await;
        create(&store, "two");
        settled(&hub, Some(Id(2))).await;
        poller.abort();
    }
}
