use crate::error::{Error, Result};
use crate::simulation::attractors::AttractorSet;
use crate::simulation::kernels::{Kernel, KernelBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Call {
    Acquire,
    /// The kernel and whether attractor state came with it.
    Enqueue(Kernel, bool),
    Finish,
    Release,
}

/// Stands in for the GPU and records every call it receives.
#[derive(Debug, Default)]
pub(crate) struct RecordingBackend {
    pub(crate) calls: Vec<Call>,
    fail_on: Option<Kernel>,
    held: bool,
}

impl RecordingBackend {
    pub(crate) fn failing_on(kernel: Kernel) -> Self {
        Self {
            fail_on: Some(kernel),
            ..Self::default()
        }
    }

    pub(crate) fn kernels(&self) -> Vec<Kernel> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Enqueue(kernel, _) => Some(*kernel),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn acquires(&self) -> usize {
        self.calls.iter().filter(|c| **c == Call::Acquire).count()
    }

    pub(crate) fn releases(&self) -> usize {
        self.calls.iter().filter(|c| **c == Call::Release).count()
    }
}

impl KernelBackend for RecordingBackend {
    type Buffer = ();

    fn buffer(&self) -> &Self::Buffer {
        &()
    }

    fn acquire(&mut self) -> Result<()> {
        assert!(!self.held, "acquired twice");
        self.held = true;
        self.calls.push(Call::Acquire);
        Ok(())
    }

    fn enqueue(&mut self, kernel: Kernel, attractors: Option<&AttractorSet>) -> Result<()> {
        assert!(self.held, "enqueue outside acquire/release");
        self.calls.push(Call::Enqueue(kernel, attractors.is_some()));
        if self.fail_on == Some(kernel) {
            return Err(Error::gpu("enqueue", format!("{} rejected", kernel.name())));
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.calls.push(Call::Finish);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        assert!(self.held, "released without acquire");
        self.held = false;
        self.calls.push(Call::Release);
        Ok(())
    }
}
