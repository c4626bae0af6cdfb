use super::types::{HistoryItem, JobHandle};

/// Completed jobs, most recent first. At most one entry per job id.
#[derive(Debug, Clone, Default)]
pub struct History {
    items: Vec<HistoryItem>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, job_id: &JobHandle) -> Option<&HistoryItem> {
        self.items.iter().find(|item| &item.job_id == job_id)
    }

    /// Puts `item` at the front, replacing any entry for the same job.
    pub fn upsert_front(&mut self, item: HistoryItem) {
        self.items.retain(|existing| existing.job_id != item.job_id);
        self.items.insert(0, item);
    }

    /// Replaces the whole list with `items`, newest first. Entries without a
    /// timestamp go last; duplicate job ids keep their first occurrence.
    pub fn replace_all(&mut self, mut items: Vec<HistoryItem>) {
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let mut seen = std::collections::HashSet::new();
        items.retain(|item| seen.insert(item.job_id.clone()));
        self.items = items;
    }

    /// Removes the entry locally. The stored backend record is untouched.
    pub fn remove(&mut self, job_id: &JobHandle) -> Option<HistoryItem> {
        let index = self.items.iter().position(|item| &item.job_id == job_id)?;
        Some(self.items.remove(index))
    }
}
