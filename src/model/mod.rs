mod node;
mod workflow;

pub use node::NodeModel;
pub use workflow::WorkflowModel;
