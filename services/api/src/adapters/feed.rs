//! services/api/src/adapters/feed.rs
//!
//! Wraps any `SolutionRepository` and keeps one `watch` channel per user with the
//! user's latest saved-solution list. Every successful create or delete republishes
//! the full list, so subscribers always see a complete, newest-first snapshot.
//! Channels with no receiver left are dropped.

use askpix_core::domain::{NewSavedSolution, SavedSolution};
use askpix_core::ports::{PortError, PortResult, SolutionRepository};
use async_trait::async_trait;
use futures::Stream;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, warn};
use uuid::Uuid;

type Snapshot = Vec<SavedSolution>;

/// One user's channel. `refresh` is held from re-listing until the snapshot is
/// sent, so snapshots reach subscribers in the order the writes finished.
struct UserChannel {
    sender: watch::Sender<Snapshot>,
    refresh: AsyncMutex<()>,
}

type Channels = HashMap<String, Arc<UserChannel>>;

pub struct SolutionFeed {
    inner: Arc<dyn SolutionRepository>,
    channels: Mutex<Channels>,
}

impl SolutionFeed {
    pub fn new(inner: Arc<dyn SolutionRepository>) -> Self {
        Self {
            inner,
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn channels(&self) -> PortResult<MutexGuard<'_, Channels>> {
        self.channels
            .lock()
            .map_err(|_| PortError::Unexpected("solution feed lock poisoned".to_string()))
    }

    fn prune(channels: &mut Channels) {
        channels.retain(|_, channel| channel.sender.receiver_count() > 0);
    }

    /// Drops the channels of users with no live subscriber left.
    pub fn release_idle(&self) {
        match self.channels() {
            Ok(mut channels) => Self::prune(&mut channels),
            Err(e) => warn!("Could not release idle live channels: {}", e),
        }
    }

    /// Subscribes to the user's list. The receiver starts at the current snapshot.
    pub async fn subscribe(&self, user_id: &str) -> PortResult<watch::Receiver<Snapshot>> {
        let (channel, mut receiver) = {
            let mut channels = self.channels()?;
            Self::prune(&mut channels);
            let channel = channels
                .entry(user_id.to_string())
                .or_insert_with(|| {
                    Arc::new(UserChannel {
                        sender: watch::channel(Vec::new()).0,
                        refresh: AsyncMutex::new(()),
                    })
                })
                .clone();
            let receiver = channel.sender.subscribe();
            (channel, receiver)
        };

        {
            let _refresh = channel.refresh.lock().await;
            let current = self.inner.list(user_id).await?;
            channel.sender.send_replace(current);
        }
        receiver.borrow_and_update();
        debug!("New live subscriber for user {}", user_id);
        Ok(receiver)
    }

    /// Re-reads the user's list and pushes it to any subscribers.
    async fn publish(&self, user_id: &str) {
        let channel = match self.channels() {
            Ok(mut channels) => {
                Self::prune(&mut channels);
                channels.get(user_id).cloned()
            }
            Err(e) => {
                warn!("Skipping live update for user {}: {}", user_id, e);
                return;
            }
        };
        let Some(channel) = channel else { return };

        let _refresh = channel.refresh.lock().await;
        match self.inner.list(user_id).await {
            Ok(snapshot) => {
                channel.sender.send_replace(snapshot);
            }
            Err(e) => warn!("Failed to refresh live list for user {}: {}", user_id, e),
        }
    }
}

/// A receiver as a stream: its current snapshot first, then one per change.
pub fn snapshots(mut receiver: watch::Receiver<Snapshot>) -> impl Stream<Item = Snapshot> {
    async_stream::stream! {
        let first = receiver.borrow_and_update().clone();
        yield first;
        while receiver.changed().await.is_ok() {
            let next = receiver.borrow_and_update().clone();
            yield next;
        }
    }
}

#[async_trait]
impl SolutionRepository for SolutionFeed {
    async fn create(&self, user_id: &str, solution: NewSavedSolution) -> PortResult<SavedSolution> {
        let saved = self.inner.create(user_id, solution).await?;
        self.publish(user_id).await;
        Ok(saved)
    }

    async fn list(&self, user_id: &str) -> PortResult<Vec<SavedSolution>> {
        self.inner.list(user_id).await
    }

    async fn delete(&self, user_id: &str, solution_id: Uuid) -> PortResult<()> {
        self.inner.delete(user_id, solution_id).await?;
        self.publish(user_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askpix_core::domain::{Language, Subject};
    use askpix_core::MemorySolutionRepository;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn new_solution(topic: &str) -> NewSavedSolution {
        NewSavedSolution {
            cropped_image: None,
            topic: topic.to_string(),
            solution: "Worked answer".to_string(),
            formulas: None,
            subject: Subject::Physics,
            identified_subject: Subject::Physics,
            language: Language::En,
            youtube_video_id: None,
            youtube_video_thumbnail: None,
        }
    }

    fn feed() -> SolutionFeed {
        SolutionFeed::new(Arc::new(MemorySolutionRepository::new(1024)))
    }

    #[tokio::test]
    async fn subscribers_see_creates_and_deletes() {
        let feed = feed();
        let mut receiver = feed.subscribe("user-1").await.unwrap();
        assert!(receiver.borrow().is_empty());

        let saved = feed.create("user-1", new_solution("Kinematics")).await.unwrap();
        receiver.changed().await.unwrap();
        assert_eq!(receiver.borrow_and_update()[0].id, saved.id);

        feed.delete("user-1", saved.id).await.unwrap();
        receiver.changed().await.unwrap();
        assert!(receiver.borrow_and_update().iter().all(|s| s.id != saved.id));
    }

    #[tokio::test]
    async fn other_users_are_not_notified() {
        let feed = feed();
        let receiver = feed.subscribe("user-1").await.unwrap();
        feed.create("user-2", new_solution("Optics")).await.unwrap();
        assert!(!receiver.has_changed().unwrap());
    }

    #[tokio::test]
    async fn stream_starts_with_the_current_list() {
        let feed = feed();
        feed.create("user-1", new_solution("Waves")).await.unwrap();

        let stream = snapshots(feed.subscribe("user-1").await.unwrap());
        futures::pin_mut!(stream);
        let first = stream.next().await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].topic, "Waves");
    }

    #[tokio::test]
    async fn failed_deletes_publish_nothing() {
        let feed = feed();
        let saved = feed.create("user-1", new_solution("Heat")).await.unwrap();
        let receiver = feed.subscribe("user-2").await.unwrap();

        let result = feed.delete("user-2", saved.id).await;
        assert!(matches!(result, Err(PortError::PermissionDenied(_))));
        assert!(!receiver.has_changed().unwrap());
    }

    /// Delays the second `list` call after it has read the store.
    struct SlowSecondList {
        inner: MemorySolutionRepository,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SolutionRepository for SlowSecondList {
        async fn create(&self, user_id: &str, solution: NewSavedSolution) -> PortResult<SavedSolution> {
            self.inner.create(user_id, solution).await
        }

        async fn list(&self, user_id: &str) -> PortResult<Vec<SavedSolution>> {
            let result = self.inner.list(user_id).await;
            if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            result
        }

        async fn delete(&self, user_id: &str, solution_id: Uuid) -> PortResult<()> {
            self.inner.delete(user_id, solution_id).await
        }
    }

    #[tokio::test]
    async fn a_slow_refresh_never_overwrites_a_newer_list() {
        let feed = Arc::new(SolutionFeed::new(Arc::new(SlowSecondList {
            inner: MemorySolutionRepository::new(1024),
            calls: AtomicUsize::new(0),
        })));
        let receiver = feed.subscribe("user-1").await.unwrap();

        let first = {
            let feed = feed.clone();
            tokio::spawn(async move { feed.create("user-1", new_solution("A")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        feed.create("user-1", new_solution("B")).await.unwrap();
        first.await.unwrap().unwrap();

        let stored: Vec<String> = feed
            .list("user-1")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.topic)
            .collect();
        let live: Vec<String> = receiver.borrow().iter().map(|s| s.topic.clone()).collect();
        assert_eq!(stored, vec!["B", "A"]);
        assert_eq!(live, stored);
    }

    #[tokio::test]
    async fn idle_channels_are_released() {
        let feed = feed();
        let receiver = feed.subscribe("user-1").await.unwrap();
        assert_eq!(feed.channels().unwrap().len(), 1);

        drop(receiver);
        feed.release_idle();
        assert!(feed.channels().unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscribing_prunes_channels_left_by_other_users() {
        let feed = feed();
        drop(feed.subscribe("user-1").await.unwrap());
        let _receiver = feed.subscribe("user-2").await.unwrap();

        let channels = feed.channels().unwrap();
        assert_eq!(channels.len(), 1);
        assert!(channels.contains_key("user-2"));
    }
}
