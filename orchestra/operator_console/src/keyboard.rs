use tank_teleop_lib::{ControlEvent, DiscreteControl, OperatorEvent, SliderAxis};

/// Virtual gamepad commands typed at the console.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PadCommand {
    Connect,
    Disconnect,
    Axes {
        lx: f64,
        ly: f64,
        rx: f64,
        ry: f64,
        lt: f64,
        rt: f64,
    },
    Button(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleInput {
    Operator(OperatorEvent),
    Pad(PadCommand),
    Help,
    Quit,
}

impl From<DiscreteControl> for ConsoleInput {
    fn from(control: DiscreteControl) -> Self {
        ConsoleInput::Operator(ControlEvent::Button(control).into())
    }
}

/// Turns stdin lines into console inputs.
#[derive(Debug, Default)]
pub struct KeyboardDispatcher {
    unknown_count: usize,
}

impl KeyboardDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unknown_count(&self) -> usize {
        self.unknown_count
    }

    pub fn process_input(&mut self, line: &str) -> Option<ConsoleInput> {
        let raw = line.trim_end_matches(['\r', '\n']);
        // A bare space bar press arrives as a line of blanks
        if !raw.is_empty() && raw.trim().is_empty() {
            return Some(DiscreteControl::EmergencyStop.into());
        }

        let input = raw.trim().to_lowercase();
        let mut words = input.split_whitespace();
        let head = words.next()?;
        let args: Vec<&str> = words.collect();

        let parsed = match (head, args.as_slice()) {
            // Base
            ("w", []) => Some(DiscreteControl::Forward.into()),
            ("s", []) => Some(DiscreteControl::Back.into()),
            ("a", []) => Some(DiscreteControl::RotateLeft.into()),
            ("d", []) => Some(DiscreteControl::RotateRight.into()),
            ("x" | "space", []) => Some(DiscreteControl::EmergencyStop.into()),

            // Manipulator
            ("j", []) => Some(DiscreteControl::TurretLeft.into()),
            ("l", []) => Some(DiscreteControl::TurretRight.into()),
            ("i", []) => Some(DiscreteControl::ArmExtend.into()),
            ("k", []) => Some(DiscreteControl::ArmRetract.into()),
            ("u", []) => Some(DiscreteControl::GripperClose.into()),
            ("o", []) => Some(DiscreteControl::GripperOpen.into()),

            ("r", []) => Some(ConsoleInput::Operator(OperatorEvent::Reset)),
            ("m", []) => Some(ConsoleInput::Operator(OperatorEvent::ToggleSimulation)),
            ("live", []) => Some(ConsoleInput::Operator(OperatorEvent::SetSimulation(false))),
            ("sim", []) => Some(ConsoleInput::Operator(OperatorEvent::SetSimulation(true))),
            ("h" | "help" | "?", []) => Some(ConsoleInput::Help),
            ("q" | "quit" | "exit", []) => Some(ConsoleInput::Quit),

            // Sliders
            ("vlin", [value]) => slider(SliderAxis::LinearVelocity, value),
            ("vang", [value]) => slider(SliderAxis::AngularVelocityDeg, value),
            ("turret", [value]) => slider(SliderAxis::TurretDeg, value),
            ("arm", [value]) => slider(SliderAxis::ArmPercent, value),
            ("grip", [value]) => slider(SliderAxis::GripperPercent, value),

            ("pad", rest) => parse_pad(rest),

            _ => None,
        };

        if parsed.is_none() {
            self.unknown_count += 1;
            tracing::warn!("Unknown command: '{}'. Type 'help' for the key map", input);
        }
        parsed
    }
}

fn slider(axis: SliderAxis, value: &str) -> Option<ConsoleInput> {
    let value: f64 = value.parse().ok()?;
    Some(ConsoleInput::Operator(
        ControlEvent::Slider { axis, value }.into(),
    ))
}

fn parse_pad(args: &[&str]) -> Option<ConsoleInput> {
    let command = match args {
        ["connect"] => PadCommand::Connect,
        ["disconnect"] => PadCommand::Disconnect,
        ["button", index] => PadCommand::Button(index.parse().ok()?),
        [lx, ly, rx, ry, lt, rt] => PadCommand::Axes {
            lx: lx.parse().ok()?,
            ly: ly.parse().ok()?,
            rx: rx.parse().ok()?,
            ry: ry.parse().ok()?,
            lt: lt.parse().ok()?,
            rt: rt.parse().ok()?,
        },
        _ => return None,
    };
    Some(ConsoleInput::Pad(command))
}

pub const HELP: &str = "\
Base:        w/s forward/back, a/d rotate left/right, x or space emergency stop
Manipulator: j/l turret, i/k arm extend/retract, u/o gripper close/open
Sliders:     vlin <m/s>, vang <deg/s>, turret <deg>, arm <0..100>, grip <0..100>
Gamepad:     pad connect | pad disconnect | pad <lx> <ly> <rx> <ry> <lt> <rt> | pad button <i>
Other:       r reset, m toggle mode, sim | live set mode, help, quit";
