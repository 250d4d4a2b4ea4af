pub mod invoker;

pub use invoker::{ExternalSolver, LabelPropagationSolver, SolverError, SolverRequest};
