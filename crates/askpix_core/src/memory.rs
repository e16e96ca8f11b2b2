//! crates/askpix_core/src/memory.rs
//!
//! An in-process `SolutionRepository`, used when no database is configured and in tests.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::{NewSavedSolution, SavedSolution};
use crate::ports::{PortError, PortResult, SolutionRepository};

struct Row {
    user_id: String,
    seq: u64,
    solution: SavedSolution,
}

#[derive(Default)]
struct Rows {
    next_seq: u64,
    rows: Vec<Row>,
}

pub struct MemorySolutionRepository {
    max_image_bytes: usize,
    rows: Mutex<Rows>,
}

impl MemorySolutionRepository {
    pub fn new(max_image_bytes: usize) -> Self {
        Self {
            max_image_bytes,
            rows: Mutex::new(Rows::default()),
        }
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, Rows>> {
        self.rows
            .lock()
            .map_err(|_| PortError::Unexpected("solution store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SolutionRepository for MemorySolutionRepository {
    async fn create(&self, user_id: &str, solution: NewSavedSolution) -> PortResult<SavedSolution> {
        solution.ensure_image_within(self.max_image_bytes)?;
        let saved = solution.into_saved(Uuid::new_v4(), Utc::now());

        let mut rows = self.lock()?;
        let seq = rows.next_seq;
        rows.next_seq += 1;
        rows.rows.push(Row {
            user_id: user_id.to_string(),
            seq,
            solution: saved.clone(),
        });
        Ok(saved)
    }

    async fn list(&self, user_id: &str) -> PortResult<Vec<SavedSolution>> {
        let rows = self.lock()?;
        let mut mine: Vec<&Row> = rows.rows.iter().filter(|r| r.user_id == user_id).collect();
        // Newest first; insertion order breaks timestamp ties.
        mine.sort_by(|a, b| {
            b.solution
                .created_at
                .cmp(&a.solution.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        Ok(mine.into_iter().map(|r| r.solution.clone()).collect())
    }

    async fn delete(&self, user_id: &str, solution_id: Uuid) -> PortResult<()> {
        let mut rows = self.lock()?;
        let index = rows
            .rows
            .iter()
            .position(|r| r.solution.id == solution_id)
            .ok_or_else(|| PortError::NotFound(format!("Solution {} not found", solution_id)))?;
        if rows.rows[index].user_id != user_id {
            return Err(PortError::PermissionDenied(
                "You don't have permission to delete this solution.".to_string(),
            ));
        }
        rows.rows.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Language, Subject};

    fn new_solution(topic: &str) -> NewSavedSolution {
        NewSavedSolution {
            cropped_image: None,
            topic: topic.to_string(),
            solution: "...".to_string(),
            formulas: None,
            subject: Subject::General,
            identified_subject: Subject::General,
            language: Language::En,
            youtube_video_id: None,
            youtube_video_thumbnail: None,
        }
    }

    #[tokio::test]
    async fn lists_newest_first_per_user() {
        let repo = MemorySolutionRepository::new(1024);
        repo.create("alice", new_solution("first")).await.unwrap();
        repo.create("bob", new_solution("other")).await.unwrap();
        repo.create("alice", new_solution("second")).await.unwrap();

        let topics: Vec<String> = repo
            .list("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.topic)
            .collect();
        assert_eq!(topics, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_owned_solution() {
        let repo = MemorySolutionRepository::new(1024);
        let keep = repo.create("alice", new_solution("keep")).await.unwrap();
        let drop = repo.create("alice", new_solution("drop")).await.unwrap();

        assert!(matches!(
            repo.delete("bob", drop.id).await,
            Err(PortError::PermissionDenied(_))
        ));
        repo.delete("alice", drop.id).await.unwrap();
        assert!(matches!(
            repo.delete("alice", drop.id).await,
            Err(PortError::NotFound(_))
        ));

        let ids: Vec<Uuid> = repo.list("alice").await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![keep.id]);
    }

    #[tokio::test]
    async fn oversized_images_are_not_stored() {
        let repo = MemorySolutionRepository::new(8);
        let mut big = new_solution("big");
        big.cropped_image = Some("data:image/png;base64,AAAAAAAA".to_string());
        assert_eq!(repo.create("alice", big).await, Err(PortError::PayloadTooLarge));
        assert!(repo.list("alice").await.unwrap().is_empty());
    }
}
