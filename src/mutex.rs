use crate::{Engine, Error, GpioBackend, Report, Trigger};

/// Common interface for mutex implementations.
///
/// When an engine is shared between execution contexts (e.g. a USB interrupt delivering commands
/// and a main loop polling pins), the whole read, decode and commit cycle has to run under one
/// lock.  Releasing the lock between the make-safe and the drive phase would allow another
/// context to observe or reconfigure ports in between.  [`SharedEngine`] takes the lock exactly
/// once per operation.
///
/// | Mutex | Feature Name | Notes |
/// | --- | --- | --- |
/// | [`core::cell::RefCell`] | _always available_ | For sharing within a single execution context. |
/// | [`std::sync::Mutex`][mutex-std] | `std` | For platforms where `std` is available. |
/// | [`critical_section::Mutex`][mutex-cs] | `critical-section` | Use critical-section to ensure synchronized access via the [critical-section][crate-cs] crate. |
///
/// [mutex-std]: https://doc.rust-lang.org/std/sync/struct.Mutex.html
/// [mutex-cs]: https://docs.rs/critical-section/latest/critical_section/struct.Mutex.html
/// [crate-cs]: https://crates.io/crates/critical-section
///
/// For other mutex types, a custom implementation is needed.  Due to the orphan rule, it might be
/// necessary to wrap it in a newtype.
pub trait EngineMutex {
    /// The value wrapped inside this mutex.
    type Engine;

    /// Create a new mutex of this type.
    fn create(v: Self::Engine) -> Self;

    /// Lock the mutex and give a closure access to the value inside.
    fn lock<R, F: FnOnce(&mut Self::Engine) -> R>(&self, f: F) -> R;
}

impl<T> EngineMutex for core::cell::RefCell<T> {
    type Engine = T;

    fn create(v: Self::Engine) -> Self {
        core::cell::RefCell::new(v)
    }

    fn lock<R, F: FnOnce(&mut Self::Engine) -> R>(&self, f: F) -> R {
        let mut v = self.borrow_mut();
        f(&mut v)
    }
}

#[cfg(any(test, feature = "std"))]
impl<T> EngineMutex for std::sync::Mutex<T> {
    type Engine = T;

    fn create(v: Self::Engine) -> Self {
        std::sync::Mutex::new(v)
    }

    fn lock<R, F: FnOnce(&mut Self::Engine) -> R>(&self, f: F) -> R {
        // A panic inside a cycle poisons the lock; the engine state is still consistent because
        // the live state is only replaced after a complete commit.
        let mut v = match self.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut v)
    }
}

#[cfg(feature = "critical-section")]
impl<T> EngineMutex for critical_section::Mutex<core::cell::RefCell<T>> {
    type Engine = T;

    fn create(v: Self::Engine) -> Self {
        critical_section::Mutex::new(core::cell::RefCell::new(v))
    }

    fn lock<R, F: FnOnce(&mut Self::Engine) -> R>(&self, f: F) -> R {
        critical_section::with(|cs| {
            let mut v = self.borrow_ref_mut(cs);
            f(&mut v)
        })
    }
}

/// An [`Engine`] behind a mutex, usable through a shared reference.
pub struct SharedEngine<M>(M);

impl<B, M> SharedEngine<M>
where
    B: GpioBackend,
    M: EngineMutex<Engine = Engine<B>>,
{
    pub fn new(engine: Engine<B>) -> Self {
        Self(M::create(engine))
    }

    /// Run one full command cycle under the lock.
    pub fn process(&self, command: &[u8]) -> Result<Trigger, Error<B::Error>> {
        self.0.lock(|engine| engine.process(command))
    }

    /// Read all pins and build a status report under the lock.
    pub fn poll(&self) -> Result<Report, Error<B::Error>> {
        self.0.lock(|engine| engine.poll())
    }

    /// Status report of the live state, without reading pins.
    pub fn report(&self) -> Report {
        self.0.lock(|engine| engine.report())
    }

    pub fn trigger(&self) -> Trigger {
        self.0.lock(|engine| engine.trigger())
    }

    /// Lock the engine for arbitrary access.
    pub fn lock<R, F: FnOnce(&mut Engine<B>) -> R>(&self, f: F) -> R {
        self.0.lock(f)
    }
}
