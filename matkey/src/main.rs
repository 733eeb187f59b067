use std::env::var;
use std::thread;
use std::time::Duration;

use dotenv::dotenv;
use log::{debug, info};
use matkey_gpio::GpioActiveLevel::Low;
use matkey_gpio::GpioBias::PullUp;
use matkey_gpio::GpioDriver;
use matkey_gpio::gpiod::GpiodDriver;
use matkey_gpio::keypad::{DEFAULT_COL_PINS, DEFAULT_ROW_PINS, MULTI_PRESS, MatrixKeypad, NO_PRESS};

fn parse_pin_list<const N: usize>(name: &str, default: [usize; N]) -> eyre::Result<[usize; N]> {
    let Ok(pin_str) = var(name) else {
        return Ok(default);
    };
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| eyre::eyre!("{} must list exactly {} pins", name, N))
}

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    info!("matkey starting...");

    let row_pin_nos = parse_pin_list("MATKEY_PINS_ROWS", DEFAULT_ROW_PINS)?;
    let col_pin_nos = parse_pin_list("MATKEY_PINS_COLS", DEFAULT_COL_PINS)?;
    let chip_path = var("MATKEY_GPIOCHIP").unwrap_or_else(|_| "/dev/gpiochip0".to_string());

    info!("Keypad @ Cols: {:?}, Rows: {:?}", col_pin_nos, row_pin_nos);

    debug!("Initializing GPIO driver...");
    let gpio = GpiodDriver::open(&chip_path)?;
    debug!("{:?} initialized.", gpio);

    debug!("Initializing keypad...");
    let mut col_bus = gpio.get_bus(col_pin_nos)?;
    let mut row_bus = gpio.get_bus(row_pin_nos)?;
    col_bus.set_active_level(Low)?;
    row_bus.set_bias(PullUp)?;
    row_bus.set_active_level(Low)?;
    let col_out = col_bus.as_output()?;
    let row_in = row_bus.as_input()?;

    let keypad = MatrixKeypad::new(&*col_out, &*row_in);
    keypad.init()?;

    debug!("{:?} initialized.", keypad);

    info!("Polling keypad...");

    // The scanner is memoryless; remembering the previous sample to log
    // transitions is the host's business.
    let mut last = NO_PRESS;
    loop {
        let key = keypad.read()?;
        if key != last {
            match key {
                NO_PRESS => debug!("Keypad released."),
                MULTI_PRESS => info!("Multiple keys held, input indeterminate."),
                key => info!("Key pressed: {key}"),
            }
            last = key;
        }

        thread::sleep(Duration::from_millis(50));
    }
}
