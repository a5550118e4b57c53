//! Concrete hardware backends.
//!
//! The engine only needs a [`GpioBackend`](crate::GpioBackend); the backends in here are ready-made
//! implementations for common hardware.

pub mod pcal6416a;
