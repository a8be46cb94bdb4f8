pub mod branch;
pub mod edge;
pub mod event;
pub mod graph;
pub mod node;
pub mod propagation;
pub mod runner;

pub use branch::*;
pub use edge::*;
pub use event::*;
pub use graph::*;
pub use node::*;
pub use propagation::*;
pub use runner::*;
