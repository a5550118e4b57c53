use core::fmt;

/// Step of the engine in which the hardware capability failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Initial configuration of all ports.
    Setup,
    /// Reconfiguring ports which stop driving.
    MakeSafe,
    /// Reconfiguring ports which start driving.
    Drive,
    /// Writing output levels.
    PinWrite,
    /// Sampling pin levels.
    Read,
}

/// Errors of the synchronization engine.
///
/// `E` is the error type of the [`GpioBackend`](crate::GpioBackend).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The command buffer was shorter than one byte per port.
    MalformedInput { expected: usize, actual: usize },
    /// The hardware capability reported a failure.  The rest of the cycle was not applied.
    HardwareFault { phase: Phase, source: E },
}

impl<E> Error<E> {
    pub(crate) fn fault(phase: Phase) -> impl FnOnce(E) -> Self {
        move |source| Error::HardwareFault { phase, source }
    }

    /// Backend error, if this is a hardware fault.
    pub fn hardware(&self) -> Option<&E> {
        match self {
            Error::HardwareFault { source, .. } => Some(source),
            Error::MalformedInput { .. } => None,
        }
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedInput { expected, actual } => write!(
                f,
                "malformed command: expected {} bytes, got {}",
                expected, actual
            ),
            Error::HardwareFault { phase, source } => {
                write!(f, "hardware fault during {:?}: {:?}", phase, source)
            }
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for Error<E> {}
