//! Task registration and ordering.
//!
//! Registered tasks live in the store itself: `__BBTASKS` lists them in registration order and each
//! task's `deps` flag lists what it runs after. [`TaskList`] is a typed snapshot of both.

use std::cell::RefCell;
use std::collections::BTreeSet;

use indexmap::IndexMap;
use itertools::Itertools;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::trace;

use metabake_datasmart::DataSmart;
use metabake_util::words::{append_unique, prepend_unique, words};

use crate::errors::MetadataError;
use crate::MetaResult;

pub const BBTASKS: &str = "__BBTASKS";

/// `build` and `do_build` both name the task variable `do_build`.
pub fn task_name(task: &str) -> String {
    if task.starts_with("do_") {
        task.to_string()
    } else {
        format!("do_{}", task)
    }
}

pub fn add_task<S: AsRef<str>>(task: &str, before: &[S], after: &[S], d: &DataSmart) {
    let var = task_name(task);
    trace!(task = var.as_str(), "addtask");

    d.set_var_flag(&var, "task", "1");
    if let Some(tasks) = append_unique(d.get_var(BBTASKS).as_deref(), &var) {
        d.set_var(BBTASKS, tasks);
    }

    for entry in after {
        let entry = task_name(entry.as_ref());
        if let Some(deps) = append_unique(d.get_var_flag(&var, "deps").as_deref(), &entry) {
            d.set_var_flag(&var, "deps", deps);
        }
    }

    for entry in before {
        let entry = task_name(entry.as_ref());
        if let Some(deps) = prepend_unique(d.get_var_flag(&entry, "deps").as_deref(), &var) {
            d.set_var_flag(&entry, "deps", deps);
        }
    }
}

/// Names in the `deps` flag of `task`, which need not be a registered task.
pub fn task_deps(d: &DataSmart, task: &str) -> Vec<String> {
    words(d.get_var_flag(task, "deps").as_deref())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    tasks: IndexMap<String, Vec<String>>,
}

impl TaskList {
    pub fn from_data(d: &DataSmart) -> Self {
        let tasks = words(d.get_var(BBTASKS).as_deref())
            .into_iter()
            .map(|task| {
                let deps = task_deps(d, &task);
                (task, deps)
            })
            .collect();
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn deps(&self, task: &str) -> Option<&[String]> {
        self.tasks.get(task).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.tasks
            .iter()
            .map(|(task, deps)| (task.as_str(), deps.as_slice()))
    }

    /// Dependencies first. Among tasks that are ready at the same time, the one registered first
    /// runs first. Dependencies on tasks that were never registered are ignored.
    pub fn execution_order(&self) -> MetaResult<Vec<String>> {
        let mut graph = DiGraph::<&str, ()>::with_capacity(self.tasks.len(), 0);
        let nodes: IndexMap<&str, NodeIndex> = self
            .tasks
            .keys()
            .map(|task| (task.as_str(), graph.add_node(task.as_str())))
            .collect();

        for (task, deps) in &self.tasks {
            for dep in deps {
                if let Some(&dep_node) = nodes.get(dep.as_str()) {
                    graph.update_edge(dep_node, nodes[task.as_str()], ());
                }
            }
        }

        let mut pending: Vec<usize> = graph
            .node_indices()
            .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();
        let mut ready: BTreeSet<NodeIndex> = graph
            .node_indices()
            .filter(|n| pending[n.index()] == 0)
            .collect();

        let mut order = Vec::with_capacity(graph.node_count());
        while let Some(node) = ready.pop_first() {
            order.push(graph[node].to_string());
            for next in graph.neighbors_directed(node, Direction::Outgoing) {
                pending[next.index()] -= 1;
                if pending[next.index()] == 0 {
                    ready.insert(next);
                }
            }
        }

        if order.len() != graph.node_count() {
            let stuck = graph
                .node_indices()
                .filter(|n| pending[n.index()] > 0)
                .map(|n| graph[n])
                .join(", ");
            return Err(MetadataError::TaskCycle(stuck).into());
        }

        Ok(order)
    }
}

/// Receives the task list of every finalized recipe.
pub trait TaskEngine {
    fn add_tasks(&self, tasks: &TaskList, d: &DataSmart) -> MetaResult<()>;
}

/// Keeps the task lists it is handed, most recent last.
#[derive(Debug, Default)]
pub struct TaskQueue {
    received: RefCell<Vec<TaskList>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<TaskList> {
        self.received.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.received.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.received.borrow().is_empty()
    }
}

impl TaskEngine for TaskQueue {
    fn add_tasks(&self, tasks: &TaskList, _d: &DataSmart) -> MetaResult<()> {
        self.received.borrow_mut().push(tasks.clone());
        Ok(())
    }
}
