/// Solver engine
///
/// A thin front over a pluggable [`SolverInterface`] backend, generic over the
/// constraint representation `C` used by the symbolic engine. Models map
/// symbolic variable ids to concrete values.
use std::fmt;
use std::time::Duration;

use dyn_clone::{clone_trait_object, DynClone};
use fxhash::FxHashMap as HashMap;
use thiserror::Error;

use crate::value::U512;

/// Default number of models requested by [`SolverEngine::get_models`].
pub const SOLVER_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no solver backend installed")]
    InvalidSolver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverStatus {
    Sat,
    Unsat,
    Timeout,
    OutOfMemory,
    Unknown,
}

impl SolverStatus {
    pub fn is_sat(&self) -> bool {
        matches!(self, Self::Sat)
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Sat => "sat",
            Self::Unsat => "unsat",
            Self::Timeout => "timeout",
            Self::OutOfMemory => "out of memory",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SolverKind {
    #[default]
    Invalid,
    Custom,
}

/// A value assigned to one symbolic variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SolverModel {
    id: usize,
    value: U512,
    name: String,
}

impl SolverModel {
    pub fn new(id: usize, value: U512, name: impl Into<String>) -> Self {
        Self {
            id,
            value,
            name: name.into(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn value(&self) -> &U512 {
        &self.value
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for SolverModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.value)
    }
}

/// Symbolic variable id to modelled value.
pub type Model = HashMap<usize, SolverModel>;

/// A solver answer with its status and the time spent producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverResult<T> {
    pub value: T,
    pub status: SolverStatus,
    pub time: Duration,
}

impl<T> SolverResult<T> {
    pub fn new(value: T, status: SolverStatus, time: Duration) -> Self {
        Self {
            value,
            status,
            time,
        }
    }

    pub fn map<U, F>(self, f: F) -> SolverResult<U>
    where
        F: FnOnce(T) -> U,
    {
        SolverResult {
            value: f(self.value),
            status: self.status,
            time: self.time,
        }
    }
}

/// A solver backend.
///
/// A `timeout` of zero means the backend's configured default applies.
pub trait SolverInterface<C>: DynClone + Send {
    fn name(&self) -> String;

    fn get_model(&self, constraint: &C, timeout: Duration) -> SolverResult<Model>;

    /// Up to `limit` distinct models, in the order found.
    fn get_models(&self, constraint: &C, limit: usize, timeout: Duration) -> SolverResult<Vec<Model>>;

    fn is_sat(&self, constraint: &C, timeout: Duration) -> SolverResult<bool>;

    fn set_timeout(&mut self, timeout: Duration);

    /// Memory limit in megabytes.
    fn set_memory_limit(&mut self, limit: usize);
}
clone_trait_object!(<C> SolverInterface<C>);

pub struct SolverEngine<C> {
    kind: SolverKind,
    solver: Option<Box<dyn SolverInterface<C>>>,
}

impl<C> Clone for SolverEngine<C> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            solver: self.solver.clone(),
        }
    }
}

impl<C> Default for SolverEngine<C> {
    fn default() -> Self {
        Self {
            kind: SolverKind::Invalid,
            solver: None,
        }
    }
}

impl<C> fmt::Debug for SolverEngine<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SolverEngine")
            .field("kind", &self.kind)
            .field("solver", &self.solver.as_ref().map(|s| s.name()))
            .finish()
    }
}

impl<C> SolverEngine<C> {
    /// An engine without a backend.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with<S>(solver: S) -> Self
    where
        S: SolverInterface<C> + 'static,
    {
        let mut engine = Self::new();
        engine.set_custom_solver(solver);
        engine
    }

    pub fn kind(&self) -> SolverKind {
        self.kind
    }

    pub fn is_valid(&self) -> bool {
        self.solver.is_some()
    }

    pub fn set_custom_solver<S>(&mut self, solver: S)
    where
        S: SolverInterface<C> + 'static,
    {
        self.kind = SolverKind::Custom;
        self.solver = Some(Box::new(solver));
    }

    fn solver(&self) -> Result<&dyn SolverInterface<C>, Error> {
        self.solver.as_deref().ok_or(Error::InvalidSolver)
    }

    fn solver_mut(&mut self) -> Result<&mut (dyn SolverInterface<C> + 'static), Error> {
        self.solver.as_deref_mut().ok_or(Error::InvalidSolver)
    }

    pub fn name(&self) -> Result<String, Error> {
        Ok(self.solver()?.name())
    }

    pub fn get_model(&self, constraint: &C, timeout: Duration) -> Result<SolverResult<Model>, Error> {
        Ok(self.solver()?.get_model(constraint, timeout))
    }

    pub fn get_models(
        &self,
        constraint: &C,
        limit: Option<usize>,
        timeout: Duration,
    ) -> Result<SolverResult<Vec<Model>>, Error> {
        let limit = limit.unwrap_or(SOLVER_LIMIT);
        Ok(self.solver()?.get_models(constraint, limit, timeout))
    }

    pub fn is_sat(&self, constraint: &C, timeout: Duration) -> Result<SolverResult<bool>, Error> {
        Ok(self.solver()?.is_sat(constraint, timeout))
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), Error> {
        self.solver_mut()?.set_timeout(timeout);
        Ok(())
    }

    pub fn set_memory_limit(&mut self, limit: usize) -> Result<(), Error> {
        self.solver_mut()?.set_memory_limit(limit);
        Ok(())
    }
}
