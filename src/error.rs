//! Error handling primitives for the MAX31790 driver.

/// Crate-wide result type alias.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Error variants produced by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Any error reported by the underlying bus (NACK, timeout, arbitration loss).
    Bus(E),
    /// Channel out of range, unknown enumeration code, or a value outside the
    /// domain of the requested operation.
    InvalidArgument,
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Self::Bus(err)
    }
}
