mod deadline_queue;
mod multi_class_queue;
mod stacked_array;

pub use deadline_queue::DeadlineQueue;
pub use stacked_array::DuplexArray;
