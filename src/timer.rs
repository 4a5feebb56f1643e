/// The delay and sound countdowns. Both tick once per completed interpreter
/// cycle, not at a wall-clock rate.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Timers {
    pub delay: u8,
    pub sound: u8,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// decrement both timers; true iff the sound timer just went 1 -> 0
    pub fn tick(&mut self) -> bool {
        self.delay = self.delay.saturating_sub(1);
        if self.sound > 0 {
            self.sound -= 1;
            return self.sound == 0;
        }
        false
    }
}
