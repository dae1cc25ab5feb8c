// Self-consistent eigenstates of a discretized Schrödinger problem

pub mod app;
pub mod config;
pub mod eigen;
pub mod error;
pub mod io;
pub mod operators;
pub mod postprocess;
pub mod scf_impl;

pub use eigen::{EigenSolverPolicy, EigenpairSet, GeneralizedEigensolver};
pub use error::{Result, ScfError};
pub use operators::{LinearChain, MassKind, OperatorProvider};
pub use scf_impl::{run_scf, BroydenDriver, FixedPointMap, KohnShamMap, MixingParams};
