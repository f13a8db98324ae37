use tank_teleop_lib::{Diagnostics, ManipulatorModel, Mode, RobotState};

/// One-line status summary, the console's stand-in for the scene renderer.
/// Read-only: nothing here writes back into the state.
pub fn render_line(state: &RobotState, mode: Mode, manipulator: &ManipulatorModel) -> String {
    let chain = manipulator.chain_for(state);

    format!(
        "[{:?}] pose=({:.2}, {:.2}, {:.1}°) cmd=({:.2} m/s, {:.1}°/s) vel=({:.2} m/s, {:.1}°/s) \
         turret={:.1}° arm={:.0}% grip={:.0}% tip=({:.1}, {:.1}){}{}",
        mode,
        state.x,
        state.y,
        state.heading.to_degrees(),
        state.v_linear_cmd,
        state.v_angular_cmd.to_degrees(),
        state.v_linear,
        state.v_angular.to_degrees(),
        state.turret_angle(),
        state.arm_extension() * 100.0,
        state.gripper() * 100.0,
        chain.tip.x,
        chain.tip.y,
        if state.gamepad_connected() { " PAD" } else { "" },
        if state.emergency() { " EMERGENCY" } else { "" },
    )
}

pub fn render_diagnostics(diagnostics: &Diagnostics) -> String {
    let mut parts = Vec::new();

    if let Some(ssid) = &diagnostics.wifi_ssid {
        match diagnostics.wifi_rssi_dbm {
            Some(rssi) => parts.push(format!("wifi={} ({:.0} dBm)", ssid, rssi)),
            None => parts.push(format!("wifi={}", ssid)),
        }
    }
    if let Some(v) = diagnostics.battery_v {
        parts.push(format!("battery={:.2} V", v));
    }
    if let Some(t) = diagnostics.cpu_temp_c {
        parts.push(format!("cpu={:.1}°C", t));
    }
    if let Some(load) = diagnostics.cpu_load_percent {
        parts.push(format!("load={:.0}%", load));
    }
    if let Some(t) = diagnostics.board_temp_c {
        parts.push(format!("board={:.1}°C", t));
    }
    if let Some(a) = diagnostics.current_total_a {
        parts.push(format!("I={:.2} A", a));
    }
    if let Some(a) = diagnostics.current_motors_a {
        parts.push(format!("motors={:.2} A", a));
    }

    format!(
        "{} (at {})",
        parts.join(" "),
        diagnostics.received_at.format("%H:%M:%S")
    )
}
