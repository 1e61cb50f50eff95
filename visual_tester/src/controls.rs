use pet_vision::{Activity, ManualOverride, ZoneKind};

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleOverride,
    SelectLabel(Activity),
    ArmZone(ZoneKind),
    Quit,
}

/// `m` toggles override mode, `1`-`9` pick a label, `f`/`w`/`b` arm zone
/// placement for the next click, `q` or Esc quits.
pub fn command_for_key(key: i32) -> Option<Command> {
    let key = u8::try_from(key).ok()?;
    match key {
        b'm' => Some(Command::ToggleOverride),
        b'1'..=b'9' => Activity::ALL
            .get((key - b'1') as usize)
            .map(|a| Command::SelectLabel(*a)),
        b'f' => Some(Command::ArmZone(ZoneKind::Food)),
        b'w' => Some(Command::ArmZone(ZoneKind::Water)),
        b'b' => Some(Command::ArmZone(ZoneKind::Bed)),
        b'q' | 27 => Some(Command::Quit),
        _ => None,
    }
}

/// Operator state driven by the keyboard.
#[derive(Debug, Default)]
pub struct Controls {
    pub manual: ManualOverride,
    pub armed_zone: Option<ZoneKind>,
}

impl Controls {
    /// Applies a command. Returns the new override when it changed.
    pub fn apply(&mut self, command: Command) -> Option<ManualOverride> {
        match command {
            Command::ToggleOverride => {
                self.manual.enabled = !self.manual.enabled;
                Some(self.manual)
            }
            Command::SelectLabel(activity) => {
                self.manual.label = Some(activity);
                Some(self.manual)
            }
            Command::ArmZone(kind) => {
                self.armed_zone = Some(kind);
                None
            }
            Command::Quit => None,
        }
    }

    pub fn status(&self) -> String {
        let mut status = match self.manual.resolve() {
            Some(activity) => format!("override: {activity}"),
            None if self.manual.enabled => "override: no label".to_string(),
            None => "auto".to_string(),
        };
        if let Some(kind) = self.armed_zone {
            status.push_str(&format!("  click to place {kind}"));
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(command_for_key(b'm' as i32), Some(Command::ToggleOverride));
        assert_eq!(command_for_key(b'1' as i32), Some(Command::SelectLabel(Activity::Sleeping)));
        assert_eq!(command_for_key(b'8' as i32), Some(Command::SelectLabel(Activity::RunningPlaying)));
        assert_eq!(command_for_key(b'b' as i32), Some(Command::ArmZone(ZoneKind::Bed)));
        assert_eq!(command_for_key(27), Some(Command::Quit));
        assert_eq!(command_for_key(-1), None);
        assert_eq!(command_for_key(b'z' as i32), None);
    }

    #[test]
    fn label_applies_only_once_enabled() {
        let mut controls = Controls::default();
        controls.apply(Command::SelectLabel(Activity::Eating));
        assert_eq!(controls.manual.resolve(), None);
        assert_eq!(controls.status(), "auto");

        controls.apply(Command::ToggleOverride);
        assert_eq!(controls.manual.resolve(), Some(Activity::Eating));
        assert_eq!(controls.status(), "override: Eating");
    }

    #[test]
    fn arming_a_zone_does_not_touch_override() {
        let mut controls = Controls::default();
        assert_eq!(controls.apply(Command::ArmZone(ZoneKind::Water)), None);
        assert_eq!(controls.status(), "auto  click to place water");
    }
}
