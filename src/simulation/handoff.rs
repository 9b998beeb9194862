use thiserror::Error;

use crate::error::Result;
use crate::simulation::attractors::AttractorSet;
use crate::simulation::kernels::{Kernel, KernelBackend};

/// Which GPU subsystem may touch the particle buffer right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Owner {
    Render,
    Compute,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum HandoffError {
    #[error("particle buffer acquired for compute twice without a release")]
    AlreadyAcquired,

    #[error("particle buffer is held by compute; the renderer may not read it")]
    HeldByCompute,
}

/// The particle buffer together with its ownership token.
///
/// Render owns the buffer between frames. Compute work has to go through
/// [`SharedBuffer::acquire_for_compute`], and the returned [`ComputeAccess`]
/// is the only way to enqueue kernels or hand the buffer back.
pub(crate) struct SharedBuffer<B> {
    backend: B,
    owner: Owner,
}

impl<B: KernelBackend> SharedBuffer<B> {
    pub(crate) fn new(backend: B) -> Self {
        Self {
            backend,
            owner: Owner::Render,
        }
    }

    #[cfg(test)]
    pub(crate) fn owner(&self) -> Owner {
        self.owner
    }

    /// Waits for outstanding render work and takes the buffer for compute.
    pub(crate) fn acquire_for_compute(&mut self) -> Result<ComputeAccess<'_, B>> {
        if self.owner == Owner::Compute {
            return Err(HandoffError::AlreadyAcquired.into());
        }
        self.backend.acquire()?;
        self.owner = Owner::Compute;
        log::trace!("particle buffer acquired for compute");
        Ok(ComputeAccess { shared: self })
    }

    /// The buffer as a vertex source, refused while compute holds it.
    pub(crate) fn for_render(&self) -> Result<&B::Buffer, HandoffError> {
        match self.owner {
            Owner::Render => Ok(self.backend.buffer()),
            Owner::Compute => Err(HandoffError::HeldByCompute),
        }
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }
}

/// Exclusive compute access for one batch of dispatches.
///
/// Dropping it without calling [`ComputeAccess::release_for_render`] leaves
/// the buffer with compute, so the next acquire or draw fails loudly.
pub(crate) struct ComputeAccess<'a, B: KernelBackend> {
    shared: &'a mut SharedBuffer<B>,
}

impl<B: KernelBackend> ComputeAccess<'_, B> {
    pub(crate) fn dispatch(&mut self, kernel: Kernel, attractors: Option<&AttractorSet>) -> Result<()> {
        log::trace!("enqueue {}", kernel.name());
        self.shared.backend.enqueue(kernel, attractors)
    }

    /// Finishes every enqueued kernel, then hands the buffer back to render.
    pub(crate) fn release_for_render(self) -> Result<()> {
        self.shared.backend.finish()?;
        self.shared.backend.release()?;
        self.shared.owner = Owner::Render;
        log::trace!("particle buffer released to render");
        Ok(())
    }
}
