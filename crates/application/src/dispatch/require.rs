//! `require` tasks: load a resource into the context.

use tapestry_domain::RequireTask;

use super::{TaskEffect, TaskError};
use crate::ports::ResourceLoader;

pub(super) async fn execute(
    loader: &dyn ResourceLoader,
    task: &RequireTask,
) -> Result<TaskEffect, TaskError> {
    let value = loader.load(&task.require_path).await?;
    Ok(TaskEffect::Store {
        key: task.context_key.clone(),
        value,
    })
}
