use serde::{Deserialize, Serialize};

/// Where an agent stands relative to its currently assigned task. Mirrors
/// `cbs_mapd.cpp::TransportStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Heading to the task's pickup vertex.
    Approach,
    /// Carrying the container toward the task's goal vertex.
    Delivery,
    /// No task left to perform (or none assigned).
    Done,
}

/// A container pickup-and-delivery task: mirrors `cbs_mapd.cpp::Container`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Task {
    pub container: usize,
    pub start: usize,
    pub goal: usize,
}

/// Time-expanded low-level search state: mirrors `cbs_mapd.cpp::State`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct State {
    pub time: usize,
    pub vertex: usize,
    pub status: Status,
}

/// Applies the task's pickup/delivery transition rule to the *current*
/// position, exactly as `cbs_mapd.cpp::getNextStatus`: an agent instantly
/// picks up its container the moment it reaches the task's start vertex,
/// there is no separate `PickUp` action.
pub fn next_status(vertex: usize, status: Status, task: Option<&Task>) -> Status {
    let Some(task) = task else {
        return Status::Done;
    };
    match status {
        Status::Approach if vertex == task.start => Status::Delivery,
        Status::Delivery if vertex == task.goal => Status::Done,
        other => other,
    }
}

pub fn initial_status(start_vertex: usize, task: Option<&Task>) -> Status {
    match task {
        None => Status::Done,
        Some(task) if start_vertex == task.start => Status::Delivery,
        Some(_) => Status::Approach,
    }
}
