//! Polling scanner for a 3x4 matrix keypad.
//!
//! The matrix is scanned by strobing one column active at a time and sensing
//! which pulled-up rows follow it low. Every read is a fresh, memoryless
//! sample of the switch grid: no debouncing, no edge detection, no history.

use crate::{GpioBusInput, GpioBusOutput, GpioResult};
use log::debug;
use std::fmt::{Debug, Formatter};

/// Number of row (sense) lines.
pub const ROWS: usize = 4;
/// Number of column (strobe) lines.
pub const COLS: usize = 3;

/// Character reported while no key is held down.
pub const NO_PRESS: char = 'X';
/// Character reported while more than one key is held down.
///
/// A diode-less matrix can ghost: with two or more switches closed, current
/// sneaking through neighbouring switches can set bits for keys nobody is
/// touching. Any multi-bit scan is therefore reported as indeterminate
/// instead of decoded.
pub const MULTI_PRESS: char = 'M';

/// Characters of the keypad in probe order (column-major), decoded by the
/// index of the scan bit counted from the least-significant end.
pub const CHARSET: [char; ROWS * COLS] =
    ['#', '9', '6', '3', '0', '8', '5', '2', '*', '7', '4', '1'];

// The sentinels must not be decodable as keys.
const _: () = {
    let mut i = 0;
    while i < CHARSET.len() {
        assert!(CHARSET[i] != NO_PRESS && CHARSET[i] != MULTI_PRESS);
        i += 1;
    }
};

/// Reference wiring for a keypad plugged straight into the board.
///
/// Swapping either list (e.g. after twisting the ribbon cable 180 degrees)
/// is purely a wiring change; the charset stays as-is because it is indexed
/// by probe order, not by pin number.
pub const DEFAULT_ROW_PINS: [usize; ROWS] = [3, 8, 7, 5];
pub const DEFAULT_COL_PINS: [usize; COLS] = [4, 2, 6];

/// Scanner for a 3x4 matrix keypad.
///
/// The column bus must be an active-low output and the row bus an active-low
/// input with pull-up bias, so that "active" means "switch closed" on both
/// sides. Call [MatrixKeypad::init] once before the first read to park the
/// columns at their idle level.
pub struct MatrixKeypad<'a> {
    cols: &'a dyn GpioBusOutput<COLS>,
    rows: &'a dyn GpioBusInput<ROWS>,
}

impl Debug for MatrixKeypad<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MatrixKeypad({:?}, {:?})", self.cols, self.rows)
    }
}

impl<'a> MatrixKeypad<'a> {
    pub fn new(cols: &'a dyn GpioBusOutput<COLS>, rows: &'a dyn GpioBusInput<ROWS>) -> Self {
        MatrixKeypad { cols, rows }
    }

    /// Drives every column to its idle level.
    ///
    /// The keypad is ready immediately afterwards; no settling delay needed.
    pub fn init(&self) -> GpioResult<()> {
        self.cols.write(&[false; COLS])?;
        debug!("{:?} initialized", self);
        Ok(())
    }

    /// Scans the whole matrix and returns the raw 12-bit switch image.
    ///
    /// Columns are strobed in order 0, 1, 2 and the four rows sampled in
    /// order 0, 1, 2, 3 under each strobe, each sample shifted in from the
    /// right: (column 0, row 0) ends up at bit 11 and (column 2, row 3) at
    /// bit 0. Each column is restored to idle before the next is strobed,
    /// and all columns are idle again on return.
    pub fn scan(&self) -> GpioResult<u16> {
        let mut bits = 0u16;

        for col in 0..COLS {
            let mut strobe = [false; COLS];
            strobe[col] = true;
            self.cols.write(&strobe)?;

            let rows = self.rows.read()?;
            self.cols.write(&[false; COLS])?;

            for &closed in rows.iter() {
                bits = (bits << 1) | closed as u16;
            }
        }

        Ok(bits)
    }

    /// Reads the key currently held down.
    ///
    /// Returns [NO_PRESS] for an empty scan and [MULTI_PRESS] whenever two
    /// or more bits are set — a multi-bit image cannot be trusted on this
    /// hardware, so no attempt is made to guess which keys it represents.
    pub fn read(&self) -> GpioResult<char> {
        let bits = self.scan()?;
        Ok(match bits.count_ones() {
            0 => NO_PRESS,
            1 => CHARSET[bits.trailing_zeros() as usize],
            _ => MULTI_PRESS,
        })
    }

    /// Checks whether exactly one key is held down.
    ///
    /// Performs its own scan; two consecutive calls may disagree if the
    /// physical state changes between them.
    pub fn has_valid_input(&self) -> GpioResult<bool> {
        let key = self.read()?;
        Ok(key != NO_PRESS && key != MULTI_PRESS)
    }

    /// Checks whether no key is held down.
    pub fn is_released(&self) -> GpioResult<bool> {
        Ok(self.read()? == NO_PRESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimKeypadBoard;
    use crate::{GpioActiveLevel, GpioBias, GpioDriver};

    /// Wires a [MatrixKeypad] to a board the way the host does: columns as
    /// active-low outputs, rows as active-low pulled-up inputs.
    macro_rules! wire_keypad {
        ($board:ident, $keypad:ident) => {
            let mut col_bus = $board.get_bus(DEFAULT_COL_PINS).unwrap();
            let mut row_bus = $board.get_bus(DEFAULT_ROW_PINS).unwrap();
            col_bus.set_active_level(GpioActiveLevel::Low).unwrap();
            row_bus.set_bias(GpioBias::PullUp).unwrap();
            row_bus.set_active_level(GpioActiveLevel::Low).unwrap();
            let col_out = col_bus.as_output().unwrap();
            let row_in = row_bus.as_input().unwrap();
            let $keypad = MatrixKeypad::new(&*col_out, &*row_in);
            $keypad.init().unwrap();
        };
    }

    /// Expected character for a single closed switch at (row, col): the
    /// switch sets bit `11 - (col * ROWS + row)`, and the charset is indexed
    /// from the least-significant bit.
    fn expected_char(row: usize, col: usize) -> char {
        CHARSET[ROWS * COLS - 1 - (col * ROWS + row)]
    }

    #[test]
    fn reads_no_press_while_idle() {
        let board = SimKeypadBoard::new(DEFAULT_COL_PINS, DEFAULT_ROW_PINS);
        wire_keypad!(board, keypad);

        // Straight after init, with nothing pressed.
        assert_eq!(keypad.read().unwrap(), NO_PRESS);
        assert!(keypad.is_released().unwrap());
        assert!(!keypad.has_valid_input().unwrap());
    }

    #[test]
    fn decodes_every_single_key() {
        let board = SimKeypadBoard::new(DEFAULT_COL_PINS, DEFAULT_ROW_PINS);
        wire_keypad!(board, keypad);

        for row in 0..ROWS {
            for col in 0..COLS {
                board.press(row, col);
                assert_eq!(
                    keypad.read().unwrap(),
                    expected_char(row, col),
                    "switch at row {row}, col {col}"
                );
                assert!(keypad.has_valid_input().unwrap());
                assert!(!keypad.is_released().unwrap());
                board.release_all();
            }
        }
    }

    #[test]
    fn decodes_layout_corners() {
        let board = SimKeypadBoard::new(DEFAULT_COL_PINS, DEFAULT_ROW_PINS);
        wire_keypad!(board, keypad);

        // Top-left of the pad is '1', bottom-right is '#'.
        board.press(0, 0);
        assert_eq!(keypad.read().unwrap(), '1');
        board.release_all();

        board.press(3, 2);
        assert_eq!(keypad.read().unwrap(), '#');
    }

    #[test]
    fn rejects_any_multi_press() {
        let board = SimKeypadBoard::new(DEFAULT_COL_PINS, DEFAULT_ROW_PINS);
        wire_keypad!(board, keypad);

        // Different row and column.
        board.press(0, 0);
        board.press(2, 1);
        assert_eq!(keypad.read().unwrap(), MULTI_PRESS);
        assert!(!keypad.has_valid_input().unwrap());
        assert!(!keypad.is_released().unwrap());
        board.release_all();

        // Same column.
        board.press(1, 2);
        board.press(3, 2);
        assert_eq!(keypad.read().unwrap(), MULTI_PRESS);
        board.release_all();

        // Same row.
        board.press(2, 0);
        board.press(2, 2);
        assert_eq!(keypad.read().unwrap(), MULTI_PRESS);
        board.release_all();

        // All twelve at once.
        for row in 0..ROWS {
            for col in 0..COLS {
                board.press(row, col);
            }
        }
        assert_eq!(keypad.read().unwrap(), MULTI_PRESS);
    }

    #[test]
    fn scan_bit_positions_are_stable() {
        let board = SimKeypadBoard::new(DEFAULT_COL_PINS, DEFAULT_ROW_PINS);
        wire_keypad!(board, keypad);

        for row in 0..ROWS {
            for col in 0..COLS {
                board.press(row, col);
                let bit = 1u16 << (ROWS * COLS - 1 - (col * ROWS + row));
                assert_eq!(keypad.scan().unwrap(), bit);
                assert_eq!(keypad.scan().unwrap(), bit, "bit moved between scans");
                board.release_all();
            }
        }

        // The documented corner cases of the layout.
        board.press(0, 0);
        assert_eq!(keypad.scan().unwrap(), 1 << 11);
        board.press(3, 2);
        assert_eq!(keypad.scan().unwrap(), (1 << 11) | 1);
    }

    #[test]
    fn read_is_idempotent_for_static_input() {
        let board = SimKeypadBoard::new(DEFAULT_COL_PINS, DEFAULT_ROW_PINS);
        wire_keypad!(board, keypad);

        board.press(1, 1);
        let first = keypad.read().unwrap();
        assert_eq!(first, expected_char(1, 1));
        for _ in 0..10 {
            assert_eq!(keypad.read().unwrap(), first);
        }
    }

    #[test]
    fn scan_leaves_columns_idle() {
        let board = SimKeypadBoard::new(DEFAULT_COL_PINS, DEFAULT_ROW_PINS);
        wire_keypad!(board, keypad);

        board.press(2, 1);
        keypad.scan().unwrap();
        assert_eq!(board.column_levels(), [true; COLS]);
    }

    #[test]
    fn charset_spells_the_probe_order() {
        let probe_order: String = CHARSET.iter().rev().collect();
        // Column-major walk over the physical pad:
        // column 0 top to bottom, then column 1, then column 2.
        assert_eq!(probe_order, "147*2580369#");
    }
}
