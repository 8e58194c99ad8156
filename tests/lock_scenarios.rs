//! End-to-end behaviour of the lock state machine against fake ports.

mod common;

use std::time::Duration;

use common::*;
use xlockd::grab::CursorShape;
use xlockd::idle::Activity;
use xlockd::lock::{Command, Control, LockState};
use xlockd::signals::PendingSignals;
use xlockd::supervisor::{ChildExit, Role, RESPAWN_CEILING};

const HANGUP: PendingSignals = PendingSignals {
    hangup: true,
    terminate: false,
    child: false,
};

const TERMINATE: PendingSignals = PendingSignals {
    hangup: false,
    terminate: true,
    child: false,
};

const AUTH_OK: ChildExit = ChildExit::Exited(200u8 as i8);

fn assert_grab_invariant(machine: &Machine, display: &FakeDisplay) {
    let expected = machine.state().holds_grab();
    assert_eq!(machine.grabs().is_held(), expected, "state {:?}", machine.state());
    assert_eq!(display.keyboard_grabbed, expected, "state {:?}", machine.state());
}

#[test]
fn scenario_a_idle_timeout_blanks() {
    let (mut machine, mut display, start) = started(policy());

    machine.evaluate(&mut display, start.after(secs(59)));
    assert_eq!(machine.state(), LockState::Unblanked);

    let blank_time = start.after(secs(61));
    machine.evaluate(&mut display, blank_time);

    assert_eq!(machine.state(), LockState::Blanked);
    let launcher = machine.children().launcher();
    assert_eq!(launcher.launched(RENDERER).len(), 1);
    assert_eq!(display.property, vec![ATOMS.blank, blank_time.unix]);
    assert_grab_invariant(&machine, &display);
}

#[test]
fn scenario_b_auto_lock_after_lock_timeout() {
    let (mut machine, mut display, start) = started(auto_lock(secs(30)));

    machine.evaluate(&mut display, start.after(secs(61)));
    assert_eq!(machine.state(), LockState::Blanked);
    assert_eq!(machine.next_deadline(), machine.timestamps().blanked_at.map(|at| at + secs(30)));

    let lock_time = start.after(secs(92));
    machine.evaluate(&mut display, lock_time);
    assert_eq!(machine.state(), LockState::Locked);
    assert_eq!(display.property, vec![ATOMS.lock, lock_time.unix]);
    assert_eq!(machine.next_deadline(), None);
    assert_grab_invariant(&machine, &display);
}

#[test]
fn zero_lock_timeout_locks_as_it_blanks() {
    let (mut machine, mut display, start) = started(auto_lock(Duration::ZERO));
    machine.evaluate(&mut display, start.after(secs(61)));
    assert_eq!(machine.state(), LockState::Locked);
}

#[test]
fn scenario_c_successful_authentication_unlocks() {
    let (mut machine, mut display, start) = started(policy());
    let (reply, _) = machine.handle_command(&mut display, Command::Lock, start);
    assert!(reply.ok);
    assert_eq!(machine.state(), LockState::Locked);

    let typed = start.after(secs(5));
    machine.record_activity(Activity::Key, typed.at);
    machine.evaluate(&mut display, typed);
    assert_eq!(machine.state(), LockState::Authenticating);
    assert_eq!(display.cursor, Some(CursorShape::Busy));

    // More typing goes to the prompt, not to a second prompt.
    machine.record_activity(Activity::Key, typed.at + secs(1));
    machine.evaluate(&mut display, typed.after(secs(1)));
    let auth_pid = machine.children().launcher().last_pid(AUTHENTICATOR);
    assert_eq!(machine.children().launcher().launched(AUTHENTICATOR).len(), 1);

    exit_child(&mut machine, &mut display, auth_pid, AUTH_OK, typed.after(secs(3)));
    assert_eq!(machine.state(), LockState::Unblanked);
    assert!(!display.keyboard_grabbed);
    assert!(!display.pointer_grabbed);
    assert_eq!(display.property[0], 0);
    assert_grab_invariant(&machine, &display);
}

#[test]
fn scenario_d_failed_authentication_waits_for_new_input() {
    let (mut machine, mut display, start) = started(policy());
    machine.handle_command(&mut display, Command::Lock, start);

    let typed = start.after(secs(5));
    machine.record_activity(Activity::Key, typed.at);
    machine.evaluate(&mut display, typed);
    let auth_pid = machine.children().launcher().last_pid(AUTHENTICATOR);

    let failed = typed.after(secs(10));
    exit_child(&mut machine, &mut display, auth_pid, ChildExit::Exited(1), failed);
    assert_eq!(machine.state(), LockState::Locked);
    assert_eq!(display.cursor, Some(CursorShape::Blank));

    machine.evaluate(&mut display, failed.after(secs(30)));
    assert_eq!(machine.state(), LockState::Locked);
    assert_eq!(machine.children().launcher().launched(AUTHENTICATOR).len(), 1);

    let again = failed.after(secs(31));
    machine.record_activity(Activity::Button, again.at);
    machine.evaluate(&mut display, again);
    assert_eq!(machine.state(), LockState::Authenticating);
    assert_eq!(machine.children().launcher().launched(AUTHENTICATOR).len(), 2);
    assert_grab_invariant(&machine, &display);
}

#[test]
fn authenticator_killed_by_signal_is_a_failure() {
    let (mut machine, mut display, start) = started(policy());
    machine.handle_command(&mut display, Command::Lock, start);
    machine.record_activity(Activity::Key, start.at + secs(2));
    machine.evaluate(&mut display, start.after(secs(2)));
    let auth_pid = machine.children().launcher().last_pid(AUTHENTICATOR);

    exit_child(
        &mut machine,
        &mut display,
        auth_pid,
        ChildExit::Signaled(libc::SIGKILL),
        start.after(secs(3)),
    );
    assert_eq!(machine.state(), LockState::Locked);
}

#[test]
fn scenario_e_renderer_crash_loop_is_bounded() {
    let (mut machine, mut display, start) = started(policy());
    machine.handle_command(&mut display, Command::Activate, start);
    assert_eq!(machine.state(), LockState::Blanked);

    for crash in 1..=RESPAWN_CEILING + 1 {
        let pid = machine.children().launcher().last_pid(RENDERER);
        let now = start.after(secs(crash as u64));
        exit_child(&mut machine, &mut display, pid, ChildExit::Signaled(libc::SIGKILL), now);
        assert_eq!(machine.state(), LockState::Blanked);
        assert_grab_invariant(&machine, &display);
    }

    let launches = machine.children().launcher().launched(RENDERER);
    assert_eq!(launches.len(), 1 + RESPAWN_CEILING as usize);
    assert!(launches[1..]
        .iter()
        .all(|launch| launch.args.contains(&"--emergency".to_string())));
    assert!(!machine.children().is_running(Role::Renderer));
    assert!(machine.children().respawn_guard().is_exhausted());
}

#[test]
fn respawn_guard_resets_when_unblanked() {
    let (mut machine, mut display, start) = started(policy());
    machine.handle_command(&mut display, Command::Activate, start);
    let pid = machine.children().launcher().last_pid(RENDERER);
    exit_child(&mut machine, &mut display, pid, ChildExit::Signaled(libc::SIGSEGV), start.after(secs(1)));
    assert_eq!(machine.children().respawn_guard().attempts(), 1);

    machine.handle_command(&mut display, Command::Deactivate, start.after(secs(2)));
    assert_eq!(machine.state(), LockState::Unblanked);
    assert_eq!(machine.children().respawn_guard().attempts(), 0);
}

#[test]
fn scenario_f_lock_refused_when_locking_disabled() {
    let (mut machine, mut display, start) = started(locking_disabled());

    let (reply, control) = machine.handle_command(&mut display, Command::Lock, start);
    assert!(!reply.ok);
    assert!(reply.message.starts_with("locking disabled"));
    assert_eq!(control, Control::Continue);
    assert_eq!(machine.state(), LockState::Unblanked);
    assert!(machine.children().launcher().launches.is_empty());
    assert!(!display.keyboard_grabbed);
}

#[test]
fn blanking_still_works_when_locking_disabled() {
    let mut policy = locking_disabled();
    policy.lock_enabled = true;
    policy.lock_timeout = Duration::ZERO;
    let (mut machine, mut display, start) = started(policy);

    machine.evaluate(&mut display, start.after(secs(61)));
    assert_eq!(machine.state(), LockState::Blanked);
    machine.evaluate(&mut display, start.after(secs(500)));
    assert_eq!(machine.state(), LockState::Blanked);
}

#[test]
fn forced_activation_is_debounced() {
    let (mut machine, mut display, start) = started(policy());
    machine.handle_command(&mut display, Command::Activate, start);

    let early = start.after(Duration::from_millis(500));
    machine.record_activity(Activity::Key, early.at);
    machine.evaluate(&mut display, early);
    assert_eq!(machine.state(), LockState::Blanked);

    // Evidence older than the window never counts, however late we look.
    machine.evaluate(&mut display, start.after(secs(10)));
    assert_eq!(machine.state(), LockState::Blanked);

    let later = start.after(secs(2));
    machine.record_activity(Activity::Key, later.at);
    machine.evaluate(&mut display, later);
    assert_eq!(machine.state(), LockState::Unblanked);
}

#[test]
fn motion_is_ignored_after_forced_activation() {
    let (mut machine, mut display, start) = started(policy());
    machine.handle_command(&mut display, Command::Activate, start);

    machine.record_activity(Activity::Motion { x: 0, y: 0 }, start.at + secs(2));
    machine.record_activity(Activity::Motion { x: 800, y: 600 }, start.at + secs(4));
    machine.evaluate(&mut display, start.after(secs(4)));
    assert_eq!(machine.state(), LockState::Blanked);
}

#[test]
fn lock_request_wins_over_blank_timeout() {
    let (mut machine, mut display, start) = started(policy());
    let now = start.after(secs(61));

    machine.handle_command(&mut display, Command::Lock, now);
    machine.evaluate(&mut display, now);

    assert_eq!(machine.state(), LockState::Locked);
    assert_eq!(display.property[0], ATOMS.lock);
    assert_eq!(machine.children().launcher().launched(RENDERER).len(), 1);
}

#[test]
fn exit_and_restart_refused_while_locked() {
    let (mut machine, mut display, start) = started(policy());
    machine.handle_command(&mut display, Command::Lock, start);

    for command in [Command::Exit, Command::Restart] {
        let (reply, control) = machine.handle_command(&mut display, command, start.after(secs(1)));
        assert!(!reply.ok);
        assert_eq!(control, Control::Continue);
        assert_eq!(machine.state(), LockState::Locked);
    }
    assert_grab_invariant(&machine, &display);
}

#[test]
fn exit_while_blanked_kills_children_and_releases() {
    let (mut machine, mut display, start) = started(policy());
    machine.handle_command(&mut display, Command::Activate, start);
    let renderer = machine.children().launcher().last_pid(RENDERER);

    let (reply, control) = machine.handle_command(&mut display, Command::Exit, start.after(secs(1)));
    assert!(reply.ok);
    assert_eq!(control, Control::Exit);
    assert!(machine
        .children()
        .launcher()
        .signals
        .contains(&(renderer, libc::SIGTERM)));
    assert!(!display.keyboard_grabbed);
    assert_eq!(display.property[0], 0);

    let (_, control) = machine.handle_command(&mut display, Command::Restart, start.after(secs(2)));
    assert_eq!(control, Control::Restart);
}

#[test]
fn hangup_is_ignored_while_locked() {
    let (mut machine, mut display, start) = started(policy());
    machine.handle_command(&mut display, Command::Lock, start);
    let renderer = machine.children().launcher().last_pid(RENDERER);

    assert_eq!(machine.on_signals(&mut display, HANGUP, start.after(secs(1))), None);
    assert_eq!(machine.state(), LockState::Locked);
    assert_eq!(machine.children().pid(Role::Renderer), Some(renderer));
    assert!(machine.children().launcher().signals.is_empty());
    assert_grab_invariant(&machine, &display);
}

#[test]
fn hangup_while_blanked_restarts() {
    let (mut machine, mut display, start) = started(policy());
    machine.handle_command(&mut display, Command::Activate, start);
    let renderer = machine.children().launcher().last_pid(RENDERER);

    let control = machine.on_signals(&mut display, HANGUP, start.after(secs(1)));
    assert_eq!(control, Some(Control::Restart));
    assert_eq!(machine.state(), LockState::Unblanked);
    assert!(machine
        .children()
        .launcher()
        .signals
        .contains(&(renderer, libc::SIGTERM)));
    assert_grab_invariant(&machine, &display);
}

#[test]
fn terminate_exits_even_while_authenticating() {
    let (mut machine, mut display, start) = started(policy());
    machine.handle_command(&mut display, Command::Lock, start);
    let typed = start.after(secs(5));
    machine.record_activity(Activity::Key, typed.at);
    machine.evaluate(&mut display, typed);
    assert_eq!(machine.state(), LockState::Authenticating);

    let renderer = machine.children().launcher().last_pid(RENDERER);
    let auth = machine.children().launcher().last_pid(AUTHENTICATOR);
    let control = machine.on_signals(&mut display, TERMINATE, typed.after(secs(1)));

    assert_eq!(control, Some(Control::Exit));
    let signals = &machine.children().launcher().signals;
    assert!(signals.contains(&(renderer, libc::SIGTERM)));
    assert!(signals.contains(&(auth, libc::SIGTERM)));
    assert!(!display.keyboard_grabbed);
    assert!(!display.pointer_grabbed);
    assert_eq!(display.property[0], 0);
}

#[test]
fn terminate_wins_over_hangup_and_child() {
    let (mut machine, mut display, start) = started(policy());
    let everything = PendingSignals {
        hangup: true,
        terminate: true,
        child: true,
    };
    assert_eq!(
        machine.on_signals(&mut display, everything, start.after(secs(1))),
        Some(Control::Exit)
    );
}

#[test]
fn child_signal_reaps_without_a_control_change() {
    let (mut machine, mut display, start) = started(policy());
    machine.handle_command(&mut display, Command::Activate, start);
    let renderer = machine.children().launcher().last_pid(RENDERER);
    machine
        .children_mut()
        .launcher_mut()
        .exits
        .push_back((renderer, ChildExit::Signaled(libc::SIGSEGV)));

    let child = PendingSignals {
        child: true,
        ..Default::default()
    };
    assert_eq!(machine.on_signals(&mut display, child, start.after(secs(1))), None);
    assert_eq!(machine.children().launcher().launched(RENDERER).len(), 2);
    assert_eq!(machine.state(), LockState::Blanked);
}

#[test]
fn deactivate_while_unblanked_resets_power_timer() {
    let (mut machine, mut display, start) = started(policy());
    let now = start.after(secs(50));

    let (reply, _) = machine.handle_command(&mut display, Command::Deactivate, now);
    assert!(reply.ok);
    assert_eq!(machine.idle().active_at(), now.at);
    assert_eq!(machine.next_deadline(), Some(now.at + secs(60)));

    let xset = machine.children().launcher().launched("xset");
    assert_eq!(xset.len(), 1);
    assert_eq!(xset[0].args, vec!["s", "reset"]);
}

#[test]
fn deactivate_skips_the_debounce_window() {
    let (mut machine, mut display, start) = started(policy());
    machine.handle_command(&mut display, Command::Lock, start);

    machine.handle_command(&mut display, Command::Deactivate, start.after(Duration::from_millis(100)));
    assert_eq!(machine.state(), LockState::Authenticating);
}

#[test]
fn grab_failure_abandons_blank_and_backs_off() {
    let (mut machine, mut display, start) = started(policy());
    display.refuse_keyboard = true;

    let first = start.after(secs(61));
    machine.evaluate(&mut display, first);
    assert_eq!(machine.state(), LockState::Unblanked);
    assert_eq!(display.focus_cleared, 1);
    assert!(machine.children().launcher().launched(RENDERER).is_empty());
    assert_eq!(machine.next_deadline(), Some(first.at + secs(5)));

    machine.evaluate(&mut display, start.after(secs(62)));
    assert_eq!(display.focus_cleared, 1);

    display.refuse_keyboard = false;
    machine.evaluate(&mut display, start.after(secs(66)));
    assert_eq!(machine.state(), LockState::Blanked);
    assert_grab_invariant(&machine, &display);
}

#[test]
fn forced_activation_reports_grab_failure() {
    let (mut machine, mut display, start) = started(policy());
    display.refuse_keyboard = true;

    let (reply, _) = machine.handle_command(&mut display, Command::Activate, start);
    assert!(!reply.ok);
    assert_eq!(machine.state(), LockState::Unblanked);
    assert!(!display.pointer_grabbed);
}

#[test]
fn blanked_at_never_moves_backwards() {
    let (mut machine, mut display, start) = started(policy());

    machine.evaluate(&mut display, start.after(secs(61)));
    let first = machine.timestamps().blanked_at.unwrap();

    let back = start.after(secs(70));
    machine.record_activity(Activity::Key, back.at);
    machine.evaluate(&mut display, back);
    assert_eq!(machine.state(), LockState::Unblanked);

    machine.evaluate(&mut display, back.after(secs(61)));
    let second = machine.timestamps().blanked_at.unwrap();
    assert!(second >= first);
}

#[test]
fn renderer_flags_follow_the_request() {
    let (mut machine, mut display, start) = started(policy());
    machine.handle_command(&mut display, Command::Suspend, start);
    machine.handle_command(&mut display, Command::Select(4), start.after(secs(1)));

    let launches = machine.children().launcher().launched(RENDERER);
    assert_eq!(launches[0].args, vec!["--init", "--emergency"]);
    assert_eq!(launches[1].args, vec!["--select", "4"]);
}

#[test]
fn splash_authenticator_exit_is_ignored_when_unlocked() {
    let mut policy = policy();
    policy.splash = true;
    policy.programs.idle_helper = Some("xlockd-systemd".to_string());
    let (mut machine, mut display, start) = started(policy);

    let launcher = machine.children().launcher();
    assert_eq!(launcher.launched(AUTHENTICATOR)[0].args, vec!["--splash"]);
    assert_eq!(launcher.launched("xlockd-systemd").len(), 1);

    let splash = launcher.last_pid(AUTHENTICATOR);
    exit_child(&mut machine, &mut display, splash, ChildExit::Exited(0), start.after(secs(3)));
    assert_eq!(machine.state(), LockState::Unblanked);
}

#[test]
fn authenticator_that_fails_to_start_leaves_screen_locked() {
    let (mut machine, mut display, start) = started(policy());
    machine
        .children_mut()
        .launcher_mut()
        .fail_programs
        .push(AUTHENTICATOR.to_string());
    machine.handle_command(&mut display, Command::Lock, start);

    let typed = start.after(secs(2));
    machine.record_activity(Activity::Key, typed.at);
    machine.evaluate(&mut display, typed);
    assert!(machine.children().has_pending());

    machine.reap_children(&mut display, typed);
    assert_eq!(machine.state(), LockState::Locked);
    assert_grab_invariant(&machine, &display);
}

#[test]
fn grab_invariant_holds_across_a_full_cycle() {
    let (mut machine, mut display, start) = started(auto_lock(secs(5)));
    assert_grab_invariant(&machine, &display);

    let mut now = start.after(secs(61));
    machine.evaluate(&mut display, now);
    assert_grab_invariant(&machine, &display);

    now = now.after(secs(6));
    machine.evaluate(&mut display, now);
    assert_eq!(machine.state(), LockState::Locked);
    assert_grab_invariant(&machine, &display);

    now = now.after(secs(1));
    machine.record_activity(Activity::Key, now.at);
    machine.evaluate(&mut display, now);
    assert_grab_invariant(&machine, &display);

    let auth = machine.children().launcher().last_pid(AUTHENTICATOR);
    exit_child(&mut machine, &mut display, auth, AUTH_OK, now.after(secs(1)));
    assert_eq!(machine.state(), LockState::Unblanked);
    assert_grab_invariant(&machine, &display);
}
