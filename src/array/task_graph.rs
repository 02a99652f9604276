use rayon::prelude::*;
use rayon_iter_concurrent_limit::iter_concurrent_limit;

use crate::{array_subset::ArraySubset, config::global_config};

use super::{
    ArrayError, ArrayShape, Block, CompressedArray, SubarrayDescriptor, SubarrayLocation,
};

/// One independently computable task of a [`TaskGraph`].
///
/// A task decompresses one subarray. Tasks share no mutable state and have no ordering requirements.
#[derive(Clone, Debug)]
pub struct ChunkTask {
    array: CompressedArray,
    descriptor: SubarrayDescriptor,
}

impl ChunkTask {
    pub(crate) fn new(array: CompressedArray, descriptor: SubarrayDescriptor) -> Self {
        Self { array, descriptor }
    }

    /// The region of the uncompressed array computed by this task.
    #[must_use]
    pub fn region(&self) -> &ArraySubset {
        self.descriptor.region()
    }

    /// The location of the compressed data read by this task.
    #[must_use]
    pub fn location(&self) -> &SubarrayLocation {
        self.descriptor.location()
    }

    /// Compute the task.
    ///
    /// # Errors
    /// Returns an [`ArrayError::SubarrayError`] identifying this task if its subarray cannot be read or decompressed.
    pub fn compute(&self) -> Result<Block, ArrayError> {
        self.array.decompress(&self.descriptor)
    }
}

/// A chunked evaluation plan for a compressed array.
///
/// Created with [`CompressedArray::to_chunked_graph`].
/// The task regions partition the uncompressed array.
#[derive(Clone, Debug)]
pub struct TaskGraph {
    shape: ArrayShape,
    tasks: Vec<ChunkTask>,
}

impl TaskGraph {
    pub(crate) fn new(shape: ArrayShape, tasks: Vec<ChunkTask>) -> Self {
        Self { shape, tasks }
    }

    /// The shape of the uncompressed array.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The tasks.
    #[must_use]
    pub fn tasks(&self) -> &[ChunkTask] {
        &self.tasks
    }

    /// The number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if the graph has no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Compute every task in parallel.
    ///
    /// Results are in task order. A failing task does not prevent other tasks from completing.
    #[must_use]
    pub fn compute(&self) -> Vec<Result<Block, ArrayError>> {
        let chunk_concurrent_limit = global_config().chunk_concurrent_limit();
        iter_concurrent_limit!(
            chunk_concurrent_limit,
            (0..self.tasks.len()),
            map,
            |index: usize| self.tasks[index].compute()
        )
        .collect()
    }

    /// Compute the tasks at `indices` in parallel.
    ///
    /// Results are in the order of `indices`.
    /// An index without a task yields [`ArrayError::IncompatibleSubarray`].
    #[must_use]
    pub fn compute_subset(&self, indices: &[usize]) -> Vec<Result<Block, ArrayError>> {
        let chunk_concurrent_limit = global_config().chunk_concurrent_limit();
        iter_concurrent_limit!(
            chunk_concurrent_limit,
            (0..indices.len()),
            map,
            |position: usize| {
                let index = indices[position];
                self.tasks.get(index).map_or_else(
                    || {
                        Err(ArrayError::IncompatibleSubarray(format!(
                            "task {index} of {}",
                            self.tasks.len()
                        )))
                    },
                    ChunkTask::compute,
                )
            }
        )
        .collect()
    }

    /// Compute every task and assemble the uncompressed array.
    ///
    /// # Errors
    /// Returns the error of the first failing task, in task order.
    pub fn assemble(&self) -> Result<Block, ArrayError> {
        let mut output = Block::masked(&self.shape);
        for (task, block) in std::iter::zip(&self.tasks, self.compute()) {
            output.assign(task.region(), &block?)?;
        }
        Ok(output)
    }
}
