//! Backend/board contracts.
//!
//! A board type lists the component kinds it supports
//! ([`BoardType::SUPPORTED`](crate::board::BoardType::SUPPORTED)); a backend
//! serving that board must implement the capability interface of every one
//! of them. This is checked in two places:
//!
//! 1. At compile time, [`register_backend!`](crate::register_backend)
//!    asserts the backend implements [`Provides`] for each kind it claims,
//!    so a claim without the matching trait impl does not build.
//! 2. At startup, [`verify_registry`] compares every registered backend's
//!    claims against its board's requirements and fails with
//!    [`Error::ContractViolation`] naming whatever is missing. The daemon
//!    refuses to start in that case.
//!
//! ## Registering a backend
//!
//! ```ignore
//! register_backend!(SbArduinoBackend => ArduinoUno: [GpioPin, Led, Ultrasound]);
//! ```

use crate::{
    capability::{
        kind, Capability, ComponentKind, GpioPinInterface, LedInterface, MotorInterface,
        UltrasoundInterface,
    },
    error::{Error, Result},
    tracing::prelude::*,
};

/// Implemented by every backend able to serve component kind `K`.
///
/// There are blanket impls for each capability interface; nothing should
/// implement this by hand.
pub trait Provides<K: ComponentKind> {}

impl<T: GpioPinInterface + ?Sized> Provides<kind::GpioPin> for T {}
impl<T: LedInterface + ?Sized> Provides<kind::Led> for T {}
impl<T: UltrasoundInterface + ?Sized> Provides<kind::Ultrasound> for T {}
impl<T: MotorInterface + ?Sized> Provides<kind::Motor> for T {}

/// Registration record for a backend, collected by `inventory`.
#[derive(Debug)]
pub struct BackendDescriptor {
    /// Backend type name
    pub name: &'static str,
    /// Name of the board type the backend is bound to
    pub board: &'static str,
    /// Capabilities the board advertises
    pub required: &'static [Capability],
    /// Capabilities the backend was registered as providing
    pub provided: &'static [Capability],
}

inventory::collect!(BackendDescriptor);

impl BackendDescriptor {
    /// Capabilities the board needs that the backend does not provide.
    pub fn missing(&self) -> Vec<Capability> {
        self.required
            .iter()
            .copied()
            .filter(|cap| !self.provided.contains(cap))
            .collect()
    }

    pub fn verify(&self) -> Result<()> {
        let missing = self.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::ContractViolation {
                backend: self.name,
                board: self.board,
                missing,
            })
        }
    }
}

/// All registered backends.
pub fn descriptors() -> impl Iterator<Item = &'static BackendDescriptor> {
    inventory::iter::<BackendDescriptor>.into_iter()
}

/// Verify every registered backend against its board.
///
/// Returns the number of backends checked.
pub fn verify_registry() -> Result<usize> {
    verify_all(descriptors())
}

fn verify_all<'a>(descriptors: impl IntoIterator<Item = &'a BackendDescriptor>) -> Result<usize> {
    let mut count = 0;
    for descriptor in descriptors {
        descriptor.verify()?;
        debug!(
            backend = descriptor.name,
            board = descriptor.board,
            "Backend satisfies board contract"
        );
        count += 1;
    }
    Ok(count)
}

/// Bind a backend to the board type it serves and register it.
///
/// `register_backend!(Backend => Board: [Kind, ...])` checks at compile time
/// that `Backend: Backend<Board = Board>` and that it implements the
/// capability interface of every listed kind (see
/// [`capability::kind`](crate::capability::kind)), then submits a
/// [`BackendDescriptor`] for [`verify_registry`].
#[macro_export]
macro_rules! register_backend {
    ($backend:ty => $board:ty : [$($kind:ident),* $(,)?]) => {
        const _: () = {
            fn assert_bound<B: $crate::backend::Backend<Board = Bd>, Bd>() {}
            fn assert_provides<K, B>()
            where
                K: $crate::capability::ComponentKind,
                B: $crate::contract::Provides<K> + ?Sized,
            {
            }

            #[allow(dead_code)]
            fn check() {
                assert_bound::<$backend, $board>();
                $(assert_provides::<$crate::capability::kind::$kind, $backend>();)*
            }
        };

        $crate::inventory::submit! {
            $crate::contract::BackendDescriptor {
                name: stringify!($backend),
                board: <$board as $crate::board::BoardType>::NAME,
                required: <$board as $crate::board::BoardType>::SUPPORTED,
                provided: &[$(
                    <$crate::capability::kind::$kind as $crate::capability::ComponentKind>::CAPABILITY
                ),*],
            }
        }
    };
}
