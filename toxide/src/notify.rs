//! Alert dispatch. Every alert carries a severity flag set; the
//! dispatcher decides whether to ring the terminal bell and which tab
//! alert level to raise. Busy status suppresses everything that is
//! not marked always-on; an unfocused terminal amplifies alerts that
//! ask for it.

use crate::windows::AlertLevel;
use toxide_net::UserStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyFlags(pub u32);

impl NotifyFlags {
    pub const NONE: NotifyFlags = NotifyFlags(0);
    /// Highest tab severity.
    pub const WNDALERT_0: NotifyFlags = NotifyFlags(1);
    pub const WNDALERT_1: NotifyFlags = NotifyFlags(1 << 1);
    pub const WNDALERT_2: NotifyFlags = NotifyFlags(1 << 2);
    /// Amplify when the terminal does not have focus.
    pub const NOFOCUS: NotifyFlags = NotifyFlags(1 << 3);
    pub const BEEP: NotifyFlags = NotifyFlags(1 << 4);
    pub const LOOP: NotifyFlags = NotifyFlags(1 << 5);
    /// Restore tolerance: repeatable within the timeout.
    pub const RESTOL: NotifyFlags = NotifyFlags(1 << 6);
    /// Fires even while the user is busy.
    pub const ALWAYS: NotifyFlags = NotifyFlags(1 << 7);
    pub const NOTIFWND: NotifyFlags = NotifyFlags(1 << 8);

    pub fn contains(self, other: NotifyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: NotifyFlags) -> NotifyFlags {
        NotifyFlags(self.0 | other.0)
    }

    /// The highest-severity window alert bit present.
    pub fn alert_level(self) -> AlertLevel {
        if self.contains(Self::WNDALERT_0) {
            AlertLevel::High
        } else if self.contains(Self::WNDALERT_1) {
            AlertLevel::Medium
        } else if self.contains(Self::WNDALERT_2) {
            AlertLevel::Low
        } else {
            AlertLevel::None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotifyOutcome {
    pub beep: bool,
    pub level: AlertLevel,
}

/// Resolves a flag set against the master switch, the user's status
/// and terminal focus.
pub fn resolve(
    alerts_enabled: bool,
    self_status: UserStatus,
    has_focus: bool,
    flags: NotifyFlags,
) -> NotifyOutcome {
    if self_status == UserStatus::Busy && !flags.contains(NotifyFlags::ALWAYS) {
        return NotifyOutcome::default();
    }

    let mut beep = alerts_enabled && flags.contains(NotifyFlags::BEEP);
    if !has_focus && flags.contains(NotifyFlags::NOFOCUS) && alerts_enabled {
        beep = true;
    }

    NotifyOutcome {
        beep,
        level: flags.alert_level(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_suppresses_unless_always() {
        let flags = NotifyFlags::WNDALERT_0.union(NotifyFlags::BEEP);
        let out = resolve(true, UserStatus::Busy, true, flags);
        assert_eq!(out, NotifyOutcome::default());

        let out = resolve(true, UserStatus::Busy, true, flags.union(NotifyFlags::ALWAYS));
        assert!(out.beep);
        assert_eq!(out.level, AlertLevel::High);
    }

    #[test]
    fn unfocused_amplifies_nofocus_alerts() {
        let flags = NotifyFlags::WNDALERT_1.union(NotifyFlags::NOFOCUS);
        assert!(!resolve(true, UserStatus::Online, true, flags).beep);
        assert!(resolve(true, UserStatus::Online, false, flags).beep);
    }

    #[test]
    fn master_switch_silences_the_bell_but_keeps_tab_alerts() {
        let flags = NotifyFlags::WNDALERT_2.union(NotifyFlags::BEEP);
        let out = resolve(false, UserStatus::Online, true, flags);
        assert!(!out.beep);
        assert_eq!(out.level, AlertLevel::Low);
    }

    #[test]
    fn highest_severity_bit_wins() {
        let flags = NotifyFlags::WNDALERT_2.union(NotifyFlags::WNDALERT_0);
        assert_eq!(flags.alert_level(), AlertLevel::High);
    }
}
