//! Integration tests for the background worker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ballshooter_core::{SimulationState, Vec3};
use ballshooter_worker::{BallShooter, ChannelSink, SimConfig, SimError, SnapshotBuffer};
use crossbeam_channel::bounded;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn config() -> SimConfig {
    SimConfig::new(16, 6.0, 0.2, 0.8, 200.0).with_seed(5)
}

fn wait_for_ticks(sim: &BallShooter, ticks: u64) {
    let deadline = Instant::now() + RECV_TIMEOUT;
    while sim.tick_count() < ticks {
        assert!(Instant::now() < deadline, "worker stalled at {} ticks", sim.tick_count());
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_start_stop_transitions() {
    let mut sim = BallShooter::create(config()).unwrap();

    assert_eq!(sim.stop(), Err(SimError::NotRunning));

    sim.start().unwrap();
    assert!(sim.is_running());
    assert_eq!(sim.start(), Err(SimError::AlreadyRunning));

    sim.stop().unwrap();
    assert!(!sim.is_running());
    assert_eq!(sim.stop(), Err(SimError::NotRunning));
}

#[test]
fn test_frames_delivered_and_recycled() {
    let mut sim = BallShooter::create(config()).unwrap();
    let (tx, frames) = bounded(1);
    sim.set_callback(ChannelSink::new(tx));
    let returns = sim.buffer_return();
    sim.start().unwrap();

    let range = 3.0 - 0.2;
    for _ in 0..30 {
        let frame = frames.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(frame.ball_count(), 16);
        for i in 0..frame.ball_count() {
            let p = frame.position(i);
            assert!(p.x.abs() <= range && p.z.abs() <= range && p.y >= 0.2, "{p:?}");
        }
        returns.put(frame).unwrap();
    }

    sim.stop().unwrap();
    // Returned promptly, the pool stays at a handful of buffers.
    assert!(sim.buffers_allocated() <= 4, "pool grew to {}", sim.buffers_allocated());
}

#[test]
fn test_unreturned_frames_grow_pool() {
    let mut sim = BallShooter::create(config()).unwrap();
    let kept = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink_kept = Arc::clone(&kept);
    sim.set_callback(move |frame: SnapshotBuffer| sink_kept.lock().push(frame));

    sim.start().unwrap();
    wait_for_ticks(&sim, 10);
    sim.stop().unwrap();

    let held = kept.lock().len();
    assert_eq!(sim.buffers_allocated(), held);
    assert_eq!(u64::try_from(held).unwrap(), sim.tick_count());

    // Frames held across stop go straight back to the idle pool.
    for frame in kept.lock().drain(..) {
        sim.return_buffer(frame).unwrap();
    }
    assert_eq!(sim.free_buffers(), Some(held));
}

#[test]
fn test_ticks_without_sink_allocate_nothing() {
    let mut sim = BallShooter::create(config()).unwrap();
    sim.start().unwrap();
    wait_for_ticks(&sim, 5);
    sim.stop().unwrap();

    assert_eq!(sim.buffers_allocated(), 0);
}

#[test]
fn test_restart_continues_simulation() {
    let config = SimConfig::new(1, 10.0, 1.0, 0.5, 200.0).with_gravity(0.0);
    let mut state = SimulationState::zeroed(config).unwrap();
    state.set_ball(0, Vec3::new(0.0, 5.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
    let mut sim = BallShooter::from_state(state);

    sim.start().unwrap();
    wait_for_ticks(&sim, 3);
    sim.stop().unwrap();
    let first_run_ticks = sim.tick_count();
    let x_after_first = sim.state().unwrap().position(0).x;
    assert!(x_after_first > 0.0);

    sim.start().unwrap();
    wait_for_ticks(&sim, first_run_ticks + 3);
    sim.stop().unwrap();

    assert!(sim.state().unwrap().position(0).x > x_after_first);
    assert_eq!(sim.stats().total_ticks, sim.tick_count());
}

#[test]
fn test_callback_replaced_while_running() {
    let mut sim = BallShooter::create(config()).unwrap();
    let (first_tx, first) = bounded(64);
    let (second_tx, second) = bounded(64);
    let returns = sim.buffer_return();

    sim.set_callback(ChannelSink::new(first_tx));
    sim.start().unwrap();
    let frame = first.recv_timeout(RECV_TIMEOUT).unwrap();
    returns.put(frame).unwrap();

    sim.set_callback(ChannelSink::new(second_tx));
    for frame in first.try_iter() {
        returns.put(frame).unwrap();
    }

    let frame = second.recv_timeout(RECV_TIMEOUT).unwrap();
    returns.put(frame).unwrap();
    sim.stop().unwrap();

    // Nothing reaches the old sink once it is replaced.
    assert!(first.is_empty());
}

#[test]
fn test_drop_while_running_stops_thread() {
    let delivered = Arc::new(AtomicUsize::new(0));
    {
        let mut sim = BallShooter::create(config()).unwrap();
        let counter = Arc::clone(&delivered);
        sim.set_callback(move |_frame: SnapshotBuffer| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        sim.start().unwrap();
        wait_for_ticks(&sim, 2);
    }

    let after_drop = delivered.load(Ordering::Relaxed);
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(delivered.load(Ordering::Relaxed), after_drop);
}

#[test]
fn test_wrong_size_return_rejected_while_running() {
    let mut sim = BallShooter::create(config()).unwrap();
    sim.start().unwrap();

    let result = sim.return_buffer(SnapshotBuffer::from_vec(vec![0.0; 3]));
    assert_eq!(result, Err(SimError::SizeMismatch { expected: 192, actual: 12 }));

    sim.stop().unwrap();
}
