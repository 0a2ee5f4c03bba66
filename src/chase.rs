use crate::error::GpioError;
use crate::gpio::Gpio;
use crate::line::Line;

/// Lights a row of output lines one at a time, wrapping at the end.
pub struct Chase {
    leds: Vec<Line>,
    next: usize,
}

impl Chase {
    pub fn new(gpio: &Gpio, ids: &[u32]) -> Result<Self, GpioError> {
        if ids.is_empty() {
            return Err(GpioError::Config("chase needs at least one led".into()));
        }
        let leds = ids
            .iter()
            .map(|&id| gpio.line(id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { leds, next: 0 })
    }

    pub fn leds(&self) -> &[Line] {
        &self.leds
    }

    pub fn all_up(&self) -> Result<(), GpioError> {
        self.leds.iter().try_for_each(Line::up)
    }

    pub fn all_down(&self) -> Result<(), GpioError> {
        self.leds.iter().try_for_each(Line::down)
    }

    /// Lights the next led and turns off the previous one. Returns the index lit.
    pub fn step(&mut self) -> Result<usize, GpioError> {
        let last = self.leds.len() - 1;
        if self.next > last {
            self.next = 0;
            self.leds[last].down()?;
        }
        let current = self.next;
        self.leds[current].up()?;
        if current > 0 {
            self.leds[current - 1].down()?;
        }
        self.next += 1;
        Ok(current)
    }
}
