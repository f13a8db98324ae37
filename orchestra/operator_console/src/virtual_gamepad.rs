use crate::keyboard::PadCommand;
use tank_teleop_lib::{pad, GamepadSnapshot, GamepadSource};

const AXIS_COUNT: usize = 4;
const BUTTON_COUNT: usize = 16;

/// Gamepad driven from typed console commands.
///
/// Axes hold their last typed values until changed. `pad button <i>` is a
/// momentary press: it is visible to exactly one poll.
#[derive(Debug, Default)]
pub struct VirtualGamepad {
    snapshot: Option<GamepadSnapshot>,
    pressed: Option<usize>,
}

impl VirtualGamepad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn apply(&mut self, command: PadCommand) {
        match command {
            PadCommand::Connect => {
                self.snapshot.get_or_insert_with(resting);
            }
            PadCommand::Disconnect => {
                self.snapshot = None;
                self.pressed = None;
            }
            PadCommand::Axes {
                lx,
                ly,
                rx,
                ry,
                lt,
                rt,
            } => {
                let snapshot = self.snapshot.get_or_insert_with(resting);
                snapshot.axes = vec![lx, ly, rx, ry];
                snapshot.buttons[pad::LEFT_TRIGGER] = lt;
                snapshot.buttons[pad::RIGHT_TRIGGER] = rt;
            }
            PadCommand::Button(index) => {
                if index < BUTTON_COUNT {
                    self.snapshot.get_or_insert_with(resting);
                    self.pressed = Some(index);
                } else {
                    tracing::warn!("Gamepad has no button {}", index);
                }
            }
        }
    }
}

impl GamepadSource for VirtualGamepad {
    fn poll(&mut self) -> Option<GamepadSnapshot> {
        let mut snapshot = self.snapshot.clone()?;
        if let Some(index) = self.pressed.take() {
            if let Some(button) = snapshot.buttons.get_mut(index) {
                *button = 1.0;
            }
        }
        Some(snapshot)
    }
}

fn resting() -> GamepadSnapshot {
    GamepadSnapshot {
        axes: vec![0.0; AXIS_COUNT],
        buttons: vec![0.0; BUTTON_COUNT],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_until_connected() {
        let mut gamepad = VirtualGamepad::new();
        assert_eq!(gamepad.poll(), None);

        gamepad.apply(PadCommand::Connect);
        assert_eq!(gamepad.poll(), Some(resting()));

        gamepad.apply(PadCommand::Disconnect);
        assert_eq!(gamepad.poll(), None);
    }

    #[test]
    fn test_button_press_is_momentary() {
        let mut gamepad = VirtualGamepad::new();
        gamepad.apply(PadCommand::Button(1));

        assert!(gamepad.poll().unwrap().pressed(1));
        assert!(!gamepad.poll().unwrap().pressed(1));
    }

    #[test]
    fn test_axes_hold_until_changed() {
        let mut gamepad = VirtualGamepad::new();
        gamepad.apply(PadCommand::Axes {
            lx: 0.0,
            ly: -0.8,
            rx: 0.0,
            ry: 0.0,
            lt: 0.2,
            rt: 0.9,
        });

        for _ in 0..3 {
            let snapshot = gamepad.poll().unwrap();
            assert_eq!(snapshot.axis(pad::LEFT_Y), -0.8);
            assert_eq!(snapshot.button(pad::RIGHT_TRIGGER), 0.9);
        }
    }
}
