//! Two-phase resource libraries.
//!
//! A [`Library`] owns a set of named resources that go through exactly two
//! phases: a CPU-only *building* phase in which descriptions are declared and
//! resolved, and a one-shot *commit* that turns every description into a
//! GPU-resident value. The lifecycle is tracked by [`Stage`]:
//!
//! `Uninitialized -> Building -> Committed`
//!
//! No transition skips a stage and none goes backwards. Dependents refer to
//! resources through [`Handle`]s obtained from [`Library::declare`] or
//! [`Library::resolve`], so an identifier is validated once, at construction.

use std::{collections::HashMap, fmt, hash::Hash, marker::PhantomData};

use thiserror::Error;

/// Lifecycle stage of a [`Library`] (or any other two-phase resource owner).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Uninitialized,
    Building,
    Committed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Uninitialized => f.write_str("uninitialized"),
            Stage::Building => f.write_str("building"),
            Stage::Committed => f.write_str("committed"),
        }
    }
}

/// Ordering violations and lookup failures of a two-phase library.
///
/// All of these indicate an integration error. Callers are expected to
/// propagate them up to the engine which aborts start-up.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("{library}: begin() has not been called")]
    NotBegun { library: &'static str },
    #[error("{library}: already committed to the GPU")]
    AlreadyCommitted { library: &'static str },
    #[error("{library}: not committed to the GPU yet (stage: {stage})")]
    NotCommitted { library: &'static str, stage: Stage },
    #[error("{library}: `{name}` is declared twice")]
    Duplicate { library: &'static str, name: String },
    #[error("{library}: no resource named `{name}`")]
    Unresolved { library: &'static str, name: String },
    #[error("{library}: failed to upload `{name}`: {source}")]
    Upload {
        library: &'static str,
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Tracks the stage of a two-phase resource owner and rejects out-of-order calls.
#[derive(Clone, Copy, Debug)]
pub struct Lifecycle {
    label: &'static str,
    stage: Stage,
}

impl Lifecycle {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            stage: Stage::Uninitialized,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Enter the building stage. Calling it again while building is a no-op.
    pub fn begin(&mut self) -> Result<(), LibraryError> {
        match self.stage {
            Stage::Uninitialized => {
                log::debug!("{}: {} -> {}", self.label, self.stage, Stage::Building);
                self.stage = Stage::Building;
                Ok(())
            }
            Stage::Building => Ok(()),
            Stage::Committed => Err(LibraryError::AlreadyCommitted { library: self.label }),
        }
    }

    /// Fails unless the owner is in the building stage.
    pub fn ensure_building(&self) -> Result<(), LibraryError> {
        match self.stage {
            Stage::Building => Ok(()),
            Stage::Uninitialized => Err(LibraryError::NotBegun { library: self.label }),
            Stage::Committed => Err(LibraryError::AlreadyCommitted { library: self.label }),
        }
    }

    /// Fails unless the owner has been committed.
    pub fn ensure_committed(&self) -> Result<(), LibraryError> {
        match self.stage {
            Stage::Committed => Ok(()),
            stage => Err(LibraryError::NotCommitted {
                library: self.label,
                stage,
            }),
        }
    }

    /// Mark the commit as done. Only valid from the building stage.
    pub fn commit(&mut self) -> Result<(), LibraryError> {
        self.ensure_building()?;
        log::debug!("{}: {} -> {}", self.label, self.stage, Stage::Committed);
        self.stage = Stage::Committed;
        Ok(())
    }
}

/// Typed index into a [`Library`].
///
/// Handles are only handed out by the library that owns the resource, so a
/// handle always refers to a declared entry.
pub struct Handle<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: usize) -> Self {
        Self {
            index: index as u32,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }
}

// Derives would put bounds on `T`.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Handle<T> {}
impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}
impl<T> Eq for Handle<T> {}
impl<T> Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}
impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.index)
    }
}

/// An owning collection of same-kind resources with a declare/commit lifecycle.
///
/// `D` is the CPU-side description, `G` the value produced by the commit
/// (usually a set of GPU handles). Descriptions stay readable after the
/// commit.
pub struct Library<D, G> {
    lifecycle: Lifecycle,
    names: HashMap<String, Handle<D>>,
    order: Vec<String>,
    descriptions: Vec<D>,
    resident: Vec<G>,
}

impl<D, G> Library<D, G> {
    pub fn new(label: &'static str) -> Self {
        Self {
            lifecycle: Lifecycle::new(label),
            names: HashMap::new(),
            order: Vec::new(),
            descriptions: Vec::new(),
            resident: Vec::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.lifecycle.label()
    }

    pub fn stage(&self) -> Stage {
        self.lifecycle.stage()
    }

    pub fn begin(&mut self) -> Result<(), LibraryError> {
        self.lifecycle.begin()
    }

    pub fn declare(&mut self, name: &str, description: D) -> Result<Handle<D>, LibraryError> {
        self.lifecycle.ensure_building()?;
        if self.names.contains_key(name) {
            return Err(LibraryError::Duplicate {
                library: self.label(),
                name: name.to_string(),
            });
        }
        let handle = Handle::new(self.descriptions.len());
        self.descriptions.push(description);
        self.names.insert(name.to_string(), handle);
        self.order.push(name.to_string());
        Ok(handle)
    }

    /// Look up a declared resource. Valid while building and after the commit.
    pub fn resolve(&self, name: &str) -> Result<Handle<D>, LibraryError> {
        if self.stage() == Stage::Uninitialized {
            return Err(LibraryError::NotBegun {
                library: self.label(),
            });
        }
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| LibraryError::Unresolved {
                library: self.label(),
                name: name.to_string(),
            })
    }

    pub fn description(&self, handle: Handle<D>) -> &D {
        &self.descriptions[handle.index()]
    }

    pub fn name(&self, handle: Handle<D>) -> &str {
        &self.order[handle.index()]
    }

    /// Declared names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }

    /// Turn every description into its resident value, in declaration order.
    ///
    /// If any upload fails nothing is kept and the library stays in the
    /// building stage.
    pub fn commit<F>(&mut self, mut upload: F) -> Result<(), LibraryError>
    where
        F: FnMut(&str, &D) -> anyhow::Result<G>,
    {
        self.lifecycle.ensure_building()?;
        let mut resident = Vec::with_capacity(self.descriptions.len());
        for (name, description) in self.order.iter().zip(self.descriptions.iter()) {
            match upload(name, description) {
                Ok(value) => resident.push(value),
                Err(source) => {
                    return Err(LibraryError::Upload {
                        library: self.label(),
                        name: name.clone(),
                        source,
                    });
                }
            }
        }
        self.resident = resident;
        self.lifecycle.commit()
    }

    pub fn resident(&self, handle: Handle<D>) -> Result<&G, LibraryError> {
        self.lifecycle.ensure_committed()?;
        Ok(&self.resident[handle.index()])
    }
}
