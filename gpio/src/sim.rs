//! Simulated keypad board for running the scanner without hardware.
//!
//! Models a diode-less 3x4 switch matrix: column lines remember the level
//! they were last driven to, and a row line reads electrically low exactly
//! when a closed switch on that row connects it to a column currently held
//! low. Open rows sit at the pull-up idle level.

use crate::keypad::{COLS, ROWS};
use crate::{
    GpioActiveLevel, GpioBias, GpioBus, GpioBusInput, GpioBusOutput, GpioDriver, GpioError,
    GpioResult,
};
use bitvec::vec::BitVec;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::AtomicU8;

/// An in-memory 3x4 matrix keypad wired to numbered lines.
///
/// Switch state is mutated through `&self`, so tests can press and release
/// keys while the scanner still borrows the row and column buses.
pub struct SimKeypadBoard {
    col_pins: [usize; COLS],
    row_pins: [usize; ROWS],
    used_pins: BitVec<AtomicU8>,
    /// Electrical level of each column line, true = high. Idles high.
    col_levels: BitVec<AtomicU8>,
    /// Closed switches, row-major (`row * COLS + col`).
    switches: BitVec<AtomicU8>,
}

impl SimKeypadBoard {
    pub fn new(col_pins: [usize; COLS], row_pins: [usize; ROWS]) -> Self {
        let line_count = col_pins
            .iter()
            .chain(row_pins.iter())
            .max()
            .map_or(0, |&pin| pin + 1);
        Self {
            col_pins,
            row_pins,
            used_pins: BitVec::repeat(false, line_count),
            col_levels: BitVec::repeat(true, COLS),
            switches: BitVec::repeat(false, ROWS * COLS),
        }
    }

    /// Closes the switch at the given matrix position.
    pub fn press(&self, row: usize, col: usize) {
        assert!(row < ROWS && col < COLS, "switch position out of range");
        self.switches.set_aliased(row * COLS + col, true);
    }

    /// Opens the switch at the given matrix position.
    pub fn release(&self, row: usize, col: usize) {
        assert!(row < ROWS && col < COLS, "switch position out of range");
        self.switches.set_aliased(row * COLS + col, false);
    }

    /// Opens every switch.
    pub fn release_all(&self) {
        for i in 0..ROWS * COLS {
            self.switches.set_aliased(i, false);
        }
    }

    /// Gets the electrical levels of the column lines (true = high).
    pub fn column_levels(&self) -> [bool; COLS] {
        let mut levels = [false; COLS];
        for (col, level) in levels.iter_mut().enumerate() {
            *level = self.col_levels[col];
        }
        levels
    }

    fn col_index(&self, pin: usize) -> Option<usize> {
        self.col_pins.iter().position(|&p| p == pin)
    }

    fn row_index(&self, pin: usize) -> Option<usize> {
        self.row_pins.iter().position(|&p| p == pin)
    }

    /// Electrical level of a row line: high from the pull-up unless a closed
    /// switch connects it to a column that is currently driven low.
    fn row_level(&self, row: usize) -> bool {
        !(0..COLS).any(|col| self.switches[row * COLS + col] && !self.col_levels[col])
    }
}

impl Debug for SimKeypadBoard {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SimKeypadBoard(cols: {:?}, rows: {:?})",
            self.col_pins, self.row_pins
        )
    }
}

impl GpioDriver for SimKeypadBoard {
    fn line_count(&self) -> GpioResult<usize> {
        Ok(self.used_pins.len())
    }

    fn get_bus<const N: usize>(&self, pins: [usize; N]) -> GpioResult<Box<dyn GpioBus<N> + '_>> {
        let n = self.line_count()?;

        if pins.iter().any(|&pin| pin >= n) {
            return Err(GpioError::InvalidArgument);
        }

        if pins.iter().any(|&pin| self.used_pins[pin]) {
            return Err(GpioError::AlreadyInUse);
        }

        for pin in pins {
            self.used_pins.set_aliased(pin, true);
        }

        Ok(Box::new(SimBus {
            board: self,
            pins,
            active_level: GpioActiveLevel::High,
            bias: GpioBias::None,
        }))
    }
}

struct SimBus<'a, const N: usize> {
    board: &'a SimKeypadBoard,
    pins: [usize; N],
    active_level: GpioActiveLevel,
    bias: GpioBias,
}

impl<const N: usize> Debug for SimBus<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.board, self.pins)
    }
}

impl<const N: usize> GpioBus<N> for SimBus<'_, N> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>> {
        // Only the row lines can be sensed, and a floating row has no
        // defined idle level, so the pull-up is mandatory.
        if self.pins.iter().any(|&pin| self.board.row_index(pin).is_none()) {
            return Err(GpioError::NotSupported);
        }
        if self.bias != GpioBias::PullUp {
            return Err(GpioError::NotSupported);
        }
        Ok(Box::new(SimBusInput { bus: self }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        if self.pins.iter().any(|&pin| self.board.col_index(pin).is_none()) {
            return Err(GpioError::NotSupported);
        }
        Ok(Box::new(SimBusOutput { bus: self }))
    }

    fn active_level(&self) -> GpioActiveLevel {
        self.active_level
    }

    fn set_active_level(&mut self, level: GpioActiveLevel) -> GpioResult<()> {
        self.active_level = level;
        Ok(())
    }

    fn bias(&self) -> GpioBias {
        self.bias
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.bias = bias;
        Ok(())
    }
}

impl<const N: usize> Drop for SimBus<'_, N> {
    fn drop(&mut self) {
        for &pin in &self.pins {
            self.board.used_pins.set_aliased(pin, false);
        }
    }
}

struct SimBusInput<'a, const N: usize> {
    bus: &'a SimBus<'a, N>,
}

impl<const N: usize> Debug for SimBusInput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.bus)
    }
}

impl<const N: usize> GpioBusInput<N> for SimBusInput<'_, N> {
    fn read(&self) -> GpioResult<[bool; N]> {
        let mut values = [false; N];
        for (value, &pin) in values.iter_mut().zip(&self.bus.pins) {
            let row = self.bus.board.row_index(pin).ok_or(GpioError::InvalidArgument)?;
            let electrical = self.bus.board.row_level(row);
            *value = self.bus.active_level.get_state(electrical);
        }
        Ok(values)
    }
}

struct SimBusOutput<'a, const N: usize> {
    bus: &'a SimBus<'a, N>,
}

impl<const N: usize> Debug for SimBusOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.bus)
    }
}

impl<const N: usize> GpioBusOutput<N> for SimBusOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        for (&value, &pin) in values.iter().zip(&self.bus.pins) {
            let col = self.bus.board.col_index(pin).ok_or(GpioError::InvalidArgument)?;
            let electrical = self.bus.active_level.get_state(value);
            self.bus.board.col_levels.set_aliased(col, electrical);
        }
        Ok(())
    }
}
