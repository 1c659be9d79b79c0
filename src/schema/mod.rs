//! Schema Object Model and migration planner: turns table descriptors into
//! an ordered set of nodes, diffs two such sets, and replays the diff as a
//! sequence of recorded actions.

pub mod descriptor;
pub mod node;
pub mod planner;
pub mod recorder;

pub use descriptor::{BaseType, FieldDescriptor, TableDescriptor};
pub use node::{ColumnNode, ColumnTypeRef, ConstraintNode, EnumTypeNode, SchemaNode, TableNode};
pub use planner::{Dependency, MigrationPlanner, Snapshot};
pub use recorder::{Action, ActionRecorder, ConstraintArgs, Entry};
