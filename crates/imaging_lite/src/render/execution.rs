//! Execution engine
//!
//! Runs an ordered list of tasks exactly once per call. Looping until the
//! image converges is the caller's business.

use crate::core::ScenePath;
use crate::render::index::RenderIndex;
use crate::render::scene_delegate::SceneDelegate;
use crate::render::task::Task;
use crate::render::{RenderError, RenderResult};

/// Drives sync → prepare → execute over a task list
#[derive(Debug, Default, Clone, Copy)]
pub struct RenderEngine;

struct CheckedOutTask {
    id: ScenePath,
    delegate_id: ScenePath,
    task: Box<dyn Task>,
}

impl RenderEngine {
    /// Create an execution engine
    pub const fn new() -> Self {
        Self
    }

    /// Run every task in `task_ids` once
    ///
    /// Tasks are checked out of the index for the duration of the call and
    /// always returned, even when a phase fails.
    pub fn execute(
        &self,
        index: &mut RenderIndex,
        delegates: &[&dyn SceneDelegate],
        task_ids: &[ScenePath],
    ) -> RenderResult<()> {
        let mut tasks = Vec::with_capacity(task_ids.len());
        let mut result = Ok(());
        for id in task_ids {
            match index.take_task(id) {
                Ok((delegate_id, task)) => tasks.push(CheckedOutTask {
                    id: id.clone(),
                    delegate_id,
                    task,
                }),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }

        if result.is_ok() {
            result = Self::run(index, delegates, &mut tasks);
        }

        for checked_out in tasks {
            index.return_task(&checked_out.id, checked_out.task);
        }
        result
    }

    fn run(
        index: &mut RenderIndex,
        delegates: &[&dyn SceneDelegate],
        tasks: &mut [CheckedOutTask],
    ) -> RenderResult<()> {
        for checked_out in tasks.iter_mut() {
            let delegate = delegates
                .iter()
                .copied()
                .find(|delegate| delegate.delegate_id() == &checked_out.delegate_id)
                .ok_or_else(|| RenderError::MissingSceneDelegate(checked_out.delegate_id.clone()))?;
            let mut dirty_bits = index.change_tracker().task_dirty_bits(&checked_out.id);
            let synced = checked_out.task.sync(delegate, index, &mut dirty_bits);
            index
                .change_tracker_mut()
                .set_task_dirty_bits(&checked_out.id, dirty_bits);
            synced?;
        }

        index.sync_all(delegates)?;

        for checked_out in tasks.iter_mut() {
            checked_out.task.prepare(index)?;
        }
        for checked_out in tasks.iter_mut() {
            log::trace!("Executing task {}", checked_out.id);
            checked_out.task.execute(index)?;
        }
        Ok(())
    }
}
