//! An explicit task graph. Each task names the tasks whose outputs it needs
//! and supplies a pure transform over those outputs. [`TaskGraph::run`]
//! executes tasks in topological waves; the tasks within one wave don't
//! depend on each other and run in parallel. A task only ever sees the
//! outputs of the tasks it declared.

use rayon::prelude::*;
use std::collections::HashMap;
use tracing::debug;

type Transform<'a, T, E> = Box<dyn Fn(&Upstream<'_, T>) -> Result<T, E> + Send + Sync + 'a>;

struct Task<'a, T, E> {
    name: String,
    deps: Vec<String>,
    run: Transform<'a, T, E>,
}

/// The outputs of a task's declared dependencies.
pub struct Upstream<'u, T> {
    task: &'u str,
    outputs: HashMap<&'u str, &'u T>,
}

impl<'u, T> Upstream<'u, T> {
    /// The output of the dependency `name`.
    pub fn get(&self, name: &str) -> Result<&'u T, GraphError> {
        self.outputs
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::Undeclared {
                task: self.task.to_owned(),
                dep: name.to_owned(),
            })
    }
}

/// A set of named tasks producing values of type `T` or failing with `E`.
pub struct TaskGraph<'a, T, E> {
    tasks: Vec<Task<'a, T, E>>,
}

impl<'a, T, E> Default for TaskGraph<'a, T, E> {
    fn default() -> Self {
        TaskGraph { tasks: Vec::new() }
    }
}

impl<'a, T, E> TaskGraph<'a, T, E>
where
    T: Send + Sync,
    E: From<GraphError> + Send,
{
    pub fn new() -> Self {
        TaskGraph::default()
    }

    /// Adds a task. Names must be unique.
    pub fn add<F>(&mut self, name: &str, deps: &[&str], run: F) -> Result<(), GraphError>
    where
        F: Fn(&Upstream<'_, T>) -> Result<T, E> + Send + Sync + 'a,
    {
        if self.tasks.iter().any(|task| task.name == name) {
            return Err(GraphError::DuplicateTask(name.to_owned()));
        }
        self.tasks.push(Task {
            name: name.to_owned(),
            deps: deps.iter().map(|dep| (*dep).to_owned()).collect(),
            run: Box::new(run),
        });
        Ok(())
    }

    /// Groups task indices into waves: every task's dependencies lie in
    /// earlier waves. Within a wave, tasks keep the order they were added.
    pub fn schedule(&self) -> Result<Vec<Vec<usize>>, GraphError> {
        let positions: HashMap<&str, usize> = self
            .tasks
            .iter()
            .enumerate()
            .map(|(i, task)| (task.name.as_str(), i))
            .collect();

        let mut pending = vec![0usize; self.tasks.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.tasks.len()];
        for (i, task) in self.tasks.iter().enumerate() {
            for dep in &task.deps {
                let &d = positions.get(dep.as_str()).ok_or_else(|| GraphError::UnknownDependency {
                    task: task.name.clone(),
                    dep: dep.clone(),
                })?;
                pending[i] += 1;
                dependents[d].push(i);
            }
        }

        let mut waves = Vec::new();
        let mut ready: Vec<usize> = (0..self.tasks.len()).filter(|&i| pending[i] == 0).collect();
        let mut scheduled = 0;
        while !ready.is_empty() {
            scheduled += ready.len();
            let mut next = Vec::new();
            for &i in &ready {
                for &dependent in &dependents[i] {
                    pending[dependent] -= 1;
                    if pending[dependent] == 0 {
                        next.push(dependent);
                    }
                }
            }
            next.sort_unstable();
            waves.push(std::mem::replace(&mut ready, next));
        }

        if scheduled < self.tasks.len() {
            return Err(GraphError::Cycle(
                self.tasks
                    .iter()
                    .zip(&pending)
                    .filter(|(_, &p)| p > 0)
                    .map(|(task, _)| task.name.clone())
                    .collect(),
            ));
        }
        Ok(waves)
    }

    /// Runs every task and returns each task's output by name. The first
    /// failure aborts the run.
    pub fn run(self) -> Result<HashMap<String, T>, E> {
        let waves = self.schedule()?;
        let mut outputs: HashMap<String, T> = HashMap::with_capacity(self.tasks.len());
        for (n, wave) in waves.iter().enumerate() {
            debug!(
                wave = n,
                tasks = ?wave.iter().map(|&i| self.tasks[i].name.as_str()).collect::<Vec<_>>(),
                "running tasks"
            );
            let results: Vec<(String, T)> = wave
                .par_iter()
                .map(|&i| {
                    let task = &self.tasks[i];
                    let upstream = Upstream {
                        task: &task.name,
                        outputs: task
                            .deps
                            .iter()
                            .filter_map(|dep| outputs.get(dep).map(|out| (dep.as_str(), out)))
                            .collect(),
                    };
                    (task.run)(&upstream).map(|out| (task.name.clone(), out))
                })
                .collect::<Result<Vec<_>, E>>()?;
            outputs.extend(results);
        }
        Ok(outputs)
    }
}

/// Represents a malformed task graph.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("task `{0}` was added twice")]
    DuplicateTask(String),

    #[error("task `{task}` depends on unknown task `{dep}`")]
    UnknownDependency { task: String, dep: String },

    #[error("tasks {0:?} form a dependency cycle")]
    Cycle(Vec<String>),

    #[error("task `{task}` read `{dep}` without declaring it")]
    Undeclared { task: String, dep: String },
}
