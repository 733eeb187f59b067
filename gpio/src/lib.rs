pub mod gpiod;
pub mod keypad;
pub mod sim;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// Specifies the active level of a GPIO line.
///
/// By default, the active level is high. A matrix keypad strobed against
/// pulled-up rows is an active-low circuit on both sides, so both buses get
/// configured with [GpioActiveLevel::Low] and the rest of the code speaks in
/// logical (active/inactive) terms only.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioActiveLevel {
    #[default]
    High,
    Low,
}

impl GpioActiveLevel {
    /// Gets the electrical state a line must take for the given logical value.
    pub fn get_state(&self, value: bool) -> bool {
        match self {
            GpioActiveLevel::High => value,
            GpioActiveLevel::Low => !value,
        }
    }
}

/// Specifies the bias of a GPIO line.
///
/// Pull-up is what keeps an open keypad row at a defined idle level.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioBias {
    #[default]
    None,
    PullUp,
    PullDown,
}

/// A source of GPIO line groups.
///
/// The keypad scanner only ever talks to whole groups (the row lines, the
/// column lines), so drivers hand out buses rather than individual pins.
pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO lines available.
    fn line_count(&self) -> GpioResult<usize>;

    /// Gets a bus over the lines at the given indices.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if any index is out of range.
    /// - `GpioError::AlreadyInUse` if any line is already part of a live bus.
    fn get_bus<const N: usize>(&self, pins: [usize; N]) -> GpioResult<Box<dyn GpioBus<N> + '_>>;
}

/// A group of GPIO lines configured and accessed together.
///
/// Bias and active level are set while the bus is still undirected; splitting
/// it into an input or output half fixes the direction.
pub trait GpioBus<const N: usize>: Debug {
    /// Sets the bus direction to input, allowing its lines to be read.
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>>;
    /// Sets the bus direction to output, allowing its lines to be written.
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>>;

    /// Gets the active level of the bus lines.
    fn active_level(&self) -> GpioActiveLevel {
        GpioActiveLevel::High
    }
    /// Sets the active level of the bus lines.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the backend cannot remap levels.
    fn set_active_level(&mut self, _level: GpioActiveLevel) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }

    /// Gets the bias of the bus lines.
    fn bias(&self) -> GpioBias {
        GpioBias::None
    }
    /// Sets the bias of the bus lines.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the backend has no bias control.
    fn set_bias(&mut self, _bias: GpioBias) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
}

pub trait GpioBusInput<const N: usize>: Debug {
    /// Reads the logical values of the lines, in bus order.
    fn read(&self) -> GpioResult<[bool; N]>;
}

pub trait GpioBusOutput<const N: usize>: Debug {
    /// Writes the logical values of the lines, in bus order.
    fn write(&self, values: &[bool; N]) -> GpioResult<()>;
}
