//! Control loop behavior against the in-memory transport

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_modbus::ExceptionCode;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;
use vfd_model::registers::{REG_CONTROL_WORD, REG_FREQ_CMD, REG_MONITOR_START};
use vfd_model::{Direction, Setpoint, StatusCode};
use vfdmaster::{
    CommFault, InputCommand, MasterControlLoop, MockHandle, MockTransport, Snapshot,
    TransportError, TxOutcome, WriteKind,
};

fn control_loop(divisor: u32) -> (MasterControlLoop<MockTransport>, MockHandle) {
    let (transport, handle) = MockTransport::new();
    (MasterControlLoop::new(transport, divisor), handle)
}

/// Monitor block of a drive at 12.50 Hz, 1.2 A, 47.5 V, 375 rpm
fn load_monitor_block(handle: &MockHandle) {
    let mut block = [0u16; 10];
    block[0] = 1250;
    block[1] = 12;
    block[3] = 475;
    block[7] = 999;
    block[9] = 375;
    handle.set_registers(REG_MONITOR_START, &block);
}

async fn idle_cycles(control: &mut MasterControlLoop<MockTransport>, n: usize) {
    for _ in 0..n {
        control.run_cycle(None).await;
    }
}

#[tokio::test]
async fn test_poll_lands_on_divisor_cycle() {
    let (mut control, handle) = control_loop(11);
    load_monitor_block(&handle);

    for cycle in 1..=10 {
        let outcome = control.run_cycle(None).await;
        assert_eq!(outcome.cycle, cycle);
        assert_eq!(outcome.poll, TxOutcome::Idle);
    }
    assert_eq!(handle.stats().reads, 0);

    let outcome = control.run_cycle(None).await;
    assert_eq!(outcome.poll, TxOutcome::Completed);

    let t = control.telemetry();
    assert_eq!(t.output_frequency, 12.5);
    assert_eq!(t.output_current, 1.2);
    assert_eq!(t.output_voltage, 47.5);
    assert_eq!(t.rpm, 375);
    assert_eq!(t.raw[7], 999);
    assert!(!t.comm_error);
    assert_eq!(t.status_code, Some(StatusCode::CommSuccess));
}

#[tokio::test]
async fn test_read_timeout_keeps_last_values() {
    let (mut control, handle) = control_loop(1);
    load_monitor_block(&handle);
    control.run_cycle(None).await;

    handle.fail_reads(Some(TransportError::Timeout(500)));
    let outcome = control.run_cycle(None).await;
    assert_eq!(outcome.poll, TxOutcome::Failed(CommFault::ReadFailure));
    assert!(outcome.poll.is_failed());

    let t = control.telemetry();
    assert!(t.comm_error);
    assert_eq!(t.status_code, Some(StatusCode::ErrRead));
    assert_eq!(t.status_message.as_str(), "ERR: Read Timeout/Fail");
    assert_eq!(t.output_frequency, 12.5);
    assert_eq!(t.rpm, 375);
    assert_eq!(control.stats().read_failures, 1);

    // Recovery is reported once
    handle.fail_reads(None);
    control.run_cycle(None).await;
    assert!(!control.telemetry().comm_error);
    assert_eq!(control.telemetry().status_message.as_str(), "Telemetry OK");
}

#[tokio::test]
async fn test_toggle_run_writes_control_word() {
    let (mut control, handle) = control_loop(11);

    let outcome = control.run_cycle(Some(InputCommand::ToggleRun)).await;
    assert_eq!(outcome.control, TxOutcome::Completed);
    assert_eq!(outcome.frequency, TxOutcome::Idle);
    assert_eq!(handle.writes(), vec![(REG_CONTROL_WORD, 0x0002)]);
    assert_eq!(control.telemetry().status_message.as_str(), "CMD: START");

    control
        .run_cycle(Some(InputCommand::ToggleDirection))
        .await;
    assert_eq!(handle.register(REG_CONTROL_WORD), Some(0x0012));
    assert_eq!(
        control.telemetry().status_message.as_str(),
        "CMD: Direction Changed"
    );
    assert_eq!(control.telemetry().acknowledged.direction, Direction::Reverse);
}

#[tokio::test]
#[traced_test]
async fn test_frequency_write_after_control_exception() {
    let (mut control, handle) = control_loop(11);
    handle.fail_writes_to(
        REG_CONTROL_WORD,
        Some(TransportError::Exception(ExceptionCode::IllegalDataValue)),
    );

    let outcome = control
        .run_cycle(Some(InputCommand::Apply(Setpoint::new(
            true,
            Direction::Forward,
            3000,
        ))))
        .await;

    assert_eq!(
        outcome.control,
        TxOutcome::Failed(CommFault::WriteFailure(WriteKind::Control))
    );
    assert_eq!(outcome.frequency, TxOutcome::Completed);
    assert_eq!(
        handle.attempts(),
        vec![(REG_CONTROL_WORD, 0x0002), (REG_FREQ_CMD, 3000)]
    );

    // The later success overwrites the error flag
    let t = control.telemetry();
    assert!(!t.comm_error);
    assert_eq!(t.status_code, Some(StatusCode::SetFreq));
    assert_eq!(t.status_message.as_str(), "Set Freq: 30.00 Hz");
    assert!(!t.acknowledged.run_state);
    assert_eq!(t.acknowledged.target_frequency(), 3000);
    assert!(logs_contain("Control write failed"));
}

#[tokio::test]
async fn test_frequency_write_still_sent_after_link_failure_by_default() {
    let (mut control, handle) = control_loop(11);
    handle.fail_writes_to(REG_CONTROL_WORD, Some(TransportError::Timeout(500)));

    let outcome = control
        .run_cycle(Some(InputCommand::Apply(Setpoint::new(
            true,
            Direction::Forward,
            1500,
        ))))
        .await;
    assert_eq!(outcome.frequency, TxOutcome::Completed);
    assert_eq!(handle.writes(), vec![(REG_FREQ_CMD, 1500)]);
}

#[tokio::test]
async fn test_suppression_skips_frequency_after_link_failure() {
    let (transport, handle) = MockTransport::new();
    let mut control = MasterControlLoop::new(transport, 11).with_link_failure_suppression(true);
    handle.fail_writes_to(REG_CONTROL_WORD, Some(TransportError::Timeout(500)));

    let outcome = control
        .run_cycle(Some(InputCommand::Apply(Setpoint::new(
            true,
            Direction::Forward,
            1500,
        ))))
        .await;
    assert_eq!(outcome.frequency, TxOutcome::Skipped);
    assert_eq!(handle.attempts(), vec![(REG_CONTROL_WORD, 0x0002)]);
    assert_eq!(control.stats().skipped_writes, 1);

    let t = control.telemetry();
    assert!(t.comm_error);
    assert_eq!(t.status_code, Some(StatusCode::CommFail));

    // An exception is not a link failure; the frequency write still goes out
    handle.clear_writes();
    handle.fail_writes_to(
        REG_CONTROL_WORD,
        Some(TransportError::Exception(ExceptionCode::IllegalDataValue)),
    );
    let outcome = control
        .run_cycle(Some(InputCommand::Apply(Setpoint::new(
            false,
            Direction::Forward,
            2000,
        ))))
        .await;
    assert_eq!(outcome.frequency, TxOutcome::Completed);
}

#[tokio::test]
async fn test_frequency_write_failure() {
    let (mut control, handle) = control_loop(11);
    handle.fail_writes_to(REG_FREQ_CMD, Some(TransportError::Io("crc".into())));

    let outcome = control
        .run_cycle(Some(InputCommand::SetFrequency(2500)))
        .await;
    assert_eq!(
        outcome.frequency,
        TxOutcome::Failed(CommFault::WriteFailure(WriteKind::Frequency))
    );
    assert!(control.telemetry().comm_error);
    assert_eq!(
        control.telemetry().payload().last_msg_code,
        StatusCode::CommFreqFail.code()
    );
    // The operator setpoint keeps the requested value
    assert_eq!(control.setpoint().target_frequency(), 2500);
}

#[tokio::test]
async fn test_out_of_range_frequency_is_clamped() {
    let (mut control, handle) = control_loop(11);

    let outcome = control
        .run_cycle(Some(InputCommand::SetFrequency(7000)))
        .await;
    let range = outcome.range.unwrap();
    assert_eq!(range.requested, 7000);
    assert_eq!(range.applied, 6000);
    assert_eq!(handle.register(REG_FREQ_CMD), Some(6000));

    let outcome = control.run_cycle(Some(InputCommand::SetFrequency(-5))).await;
    assert_eq!(outcome.range.unwrap().applied, 0);
    assert_eq!(handle.register(REG_FREQ_CMD), Some(0));
    assert_eq!(control.stats().range_rejections, 2);
}

#[tokio::test]
async fn test_commands_do_not_shift_poll_schedule() {
    let (mut control, handle) = control_loop(11);
    load_monitor_block(&handle);

    control.run_cycle(Some(InputCommand::ToggleRun)).await;
    idle_cycles(&mut control, 9).await;
    assert_eq!(handle.stats().reads, 0);

    let outcome = control
        .run_cycle(Some(InputCommand::AdjustFrequency {
            step: vfd_model::FrequencyStep::Coarse,
            up: true,
        }))
        .await;
    assert_eq!(outcome.frequency, TxOutcome::Completed);
    assert_eq!(outcome.poll, TxOutcome::Completed);
    assert_eq!(handle.register(REG_FREQ_CMD), Some(100));
}

#[tokio::test]
async fn test_shutdown_sends_stop_then_closes() {
    let (mut control, handle) = control_loop(11);
    control.run_cycle(Some(InputCommand::ToggleRun)).await;

    control.shutdown().await;
    assert_eq!(
        handle.writes(),
        vec![(REG_CONTROL_WORD, 0x0002), (REG_CONTROL_WORD, 0x0001)]
    );
    assert!(handle.is_closed());
}

#[tokio::test]
#[traced_test]
async fn test_shutdown_stop_failure_is_logged() {
    let (mut control, handle) = control_loop(11);
    handle.fail_writes_to(REG_CONTROL_WORD, Some(TransportError::Timeout(500)));

    control.shutdown().await;
    assert!(handle.is_closed());
    assert!(logs_contain("Stop command failed"));
}

#[tokio::test(start_paused = true)]
async fn test_run_until_quit() {
    let (mut control, handle) = control_loop(11);
    let (tx, mut rx) = mpsc::channel(8);
    let (snap_tx, snap_rx) = watch::channel(Snapshot::default());
    let cancel = CancellationToken::new();

    tx.send(InputCommand::ToggleRun).await.unwrap();
    tx.send(InputCommand::SetFrequency(4500)).await.unwrap();
    tx.send(InputCommand::Quit).await.unwrap();

    let stats = control
        .run(Duration::from_millis(20), &mut rx, &snap_tx, cancel.clone())
        .await;

    // One command per cycle; the quit cycle does no I/O
    assert_eq!(stats.cycles, 3);
    assert_eq!(stats.control_writes, 1);
    assert_eq!(stats.frequency_writes, 1);
    assert!(cancel.is_cancelled());
    assert_eq!(
        handle.writes(),
        vec![
            (REG_CONTROL_WORD, 0x0002),
            (REG_FREQ_CMD, 4500),
            (REG_CONTROL_WORD, 0x0001),
        ]
    );
    assert!(handle.is_closed());

    let last = snap_rx.borrow().clone();
    assert_eq!(last.cycle, 3);
    assert!(last.setpoint.run_state);
    assert_eq!(last.telemetry.status_message.as_str(), "Set Freq: 45.00 Hz");
}

#[tokio::test(start_paused = true)]
async fn test_run_stops_on_cancel() {
    let (mut control, handle) = control_loop(11);
    load_monitor_block(&handle);
    let (_tx, mut rx) = mpsc::channel(8);
    let (snap_tx, snap_rx) = watch::channel(Snapshot::default());
    let cancel = CancellationToken::new();

    let stopper = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            // Ticks at 0, 20, ..., 220 ms give twelve cycles
            tokio::time::sleep(Duration::from_millis(230)).await;
            cancel.cancel();
        })
    };

    let stats = control
        .run(Duration::from_millis(20), &mut rx, &snap_tx, cancel)
        .await;
    stopper.await.unwrap();

    assert!((11..=12).contains(&stats.cycles));
    assert_eq!(stats.polls, 1);
    assert_eq!(snap_rx.borrow().telemetry.rpm, 375);
    assert_eq!(handle.writes(), vec![(REG_CONTROL_WORD, 0x0001)]);
}
