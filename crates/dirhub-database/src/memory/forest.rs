//! In-memory directory forest.
//!
//! Holds every directory plus a parent → children index. Transitive reads
//! walk the index one level at a time, so descendants come out breadth
//! first and every directory follows its ancestors.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use dirhub_core::error::AppError;
use dirhub_core::result::AppResult;
use dirhub_core::types::DirectoryId;
use dirhub_entity::{Directory, NewDirectory};

#[derive(Debug, Clone, Default)]
pub(crate) struct Forest {
    nodes: HashMap<DirectoryId, Directory>,
    children: HashMap<DirectoryId, Vec<DirectoryId>>,
    roots: Vec<DirectoryId>,
}

impl Forest {
    pub(crate) fn get(&self, id: DirectoryId, with_deleted: bool) -> AppResult<&Directory> {
        self.nodes
            .get(&id)
            .filter(|d| with_deleted || !d.is_deleted())
            .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))
    }

    pub(crate) fn insert_root(&mut self, data: NewDirectory, now: DateTime<Utc>) -> Directory {
        let directory = Directory::create(data, now);
        self.roots.push(directory.id);
        self.nodes.insert(directory.id, directory.clone());
        directory
    }

    pub(crate) fn insert_child(
        &mut self,
        data: NewDirectory,
        parent: DirectoryId,
        now: DateTime<Utc>,
    ) -> AppResult<Directory> {
        self.get(parent, false)
            .map_err(|_| AppError::not_found(format!("Parent directory {parent} not found")))?;

        let directory = Directory::create(data, now);
        if directory.id == parent {
            return Err(AppError::validation("A directory cannot be its own parent"));
        }
        self.children.entry(parent).or_default().push(directory.id);
        self.nodes.insert(directory.id, directory.clone());
        Ok(directory)
    }

    pub(crate) fn roots(&self, with_deleted: bool) -> Vec<DirectoryId> {
        self.roots
            .iter()
            .filter(|id| self.get(**id, with_deleted).is_ok())
            .copied()
            .collect()
    }

    /// Ancestors nearest first, excluding `id`.
    pub(crate) fn ancestors(&self, id: DirectoryId, with_deleted: bool) -> AppResult<Vec<DirectoryId>> {
        let mut current = self.get(id, with_deleted)?;
        let mut chain = Vec::new();
        while let Some(parent) = current.parent {
            chain.push(parent);
            current = self.get(parent, true)?;
        }
        Ok(chain)
    }

    /// Ancestors nearest first, stopping at and including `ancestor`.
    pub(crate) fn ancestors_until(
        &self,
        child: DirectoryId,
        ancestor: DirectoryId,
        with_deleted: bool,
    ) -> AppResult<Vec<DirectoryId>> {
        let chain = self.ancestors(child, with_deleted)?;
        match chain.iter().position(|id| *id == ancestor) {
            Some(pos) => Ok(chain[..=pos].to_vec()),
            None => Err(AppError::not_found(format!(
                "Directory {ancestor} is not an ancestor of {child}"
            ))),
        }
    }

    /// All descendants of `id`, breadth first, excluding `id`.
    pub(crate) fn descendants(&self, id: DirectoryId, with_deleted: bool) -> AppResult<Vec<DirectoryId>> {
        self.get(id, with_deleted)?;

        let mut out = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            for child in self.children.get(&next).into_iter().flatten() {
                if self.get(*child, with_deleted).is_ok() {
                    out.push(*child);
                    queue.push_back(*child);
                }
            }
        }
        Ok(out)
    }

    /// Soft delete `id` and its live descendants with one timestamp.
    ///
    /// Returns the directories that transitioned; `NotFound` when `id` is
    /// unknown or nothing below it was still live.
    pub(crate) fn soft_delete(&mut self, id: DirectoryId, now: DateTime<Utc>) -> AppResult<Vec<Directory>> {
        let mut subtree = vec![id];
        subtree.extend(self.descendants(id, true)?);

        let mut deleted = Vec::new();
        for member in subtree {
            if let Some(directory) = self.nodes.get_mut(&member) {
                if directory.mark_deleted(now) {
                    deleted.push(directory.clone());
                }
            }
        }

        if deleted.is_empty() {
            return Err(AppError::not_found(format!("Directory {id} is already deleted")));
        }
        Ok(deleted)
    }
}
