// Integration test: Full sequencer runs against in-memory sinks
//
// Runs at very high tempo so a whole pattern takes a few milliseconds.

use rand::SeedableRng;
use rand::rngs::StdRng;
use random_note_gen::midi::{LogSink, MemorySink, MidiMessage, MidiSink};
use random_note_gen::sequencer::{
    self, CompletionReason, Key, Mode, RunStatus, RunSwitch, Scale, ScaleSpec, SequenceParams,
    SequencerError, StepSequencer,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Duration;

fn scale(key: &str, mode: Mode, span: u8) -> Scale {
    let key: Key = key.parse().unwrap();
    ScaleSpec::new(key, mode, span).build().unwrap()
}

/// 1/16 at 6000 BPM -> 2.5 ms per step
fn fast_params(bars: u32) -> SequenceParams {
    SequenceParams::new(0, 6000, 16, bars).unwrap()
}

fn note_ons(messages: &[MidiMessage]) -> Vec<u8> {
    messages
        .iter()
        .filter_map(|m| match m {
            MidiMessage::NoteOn { note, .. } => Some(*note),
            _ => None,
        })
        .collect()
}

/// Flips the run switch once it has seen `limit` note-ons
struct StopAfterSink {
    inner: MemorySink,
    switch: RunSwitch,
    limit: usize,
    seen: usize,
}

impl MidiSink for StopAfterSink {
    fn send(&mut self, message: MidiMessage) -> Result<(), SequencerError> {
        if message.is_note_on() {
            self.seen += 1;
            if self.seen == self.limit {
                self.switch.stop();
            }
        }
        self.inner.send(message)
    }

    fn close(&mut self) {
        self.inner.close()
    }
}

/// Counts what passes through to the wrapped sink
struct CountingSink<S> {
    inner: S,
    sent: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl<S: MidiSink> MidiSink for CountingSink<S> {
    fn send(&mut self, message: MidiMessage) -> Result<(), SequencerError> {
        self.inner.send(message)?;
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close()
    }
}

#[test]
fn test_dry_run_through_log_sink() {
    let sent = Arc::new(AtomicUsize::new(0));
    let closes = Arc::new(AtomicUsize::new(0));
    // Boxed the same way the CLI hands a dry-run sink to the sequencer
    let sink: Box<dyn MidiSink> = Box::new(CountingSink {
        inner: LogSink::new(),
        sent: Arc::clone(&sent),
        closes: Arc::clone(&closes),
    });
    let params = fast_params(1).with_every_step(true).with_seed(Some(17));

    let handle = sequencer::start(params, scale("c", Mode::Major, 2), sink).unwrap();

    assert_eq!(handle.wait(), Ok(CompletionReason::EndOfPattern));
    assert_eq!(sent.load(Ordering::SeqCst), 32);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_every_step_plays_a_note() {
    let sink = MemorySink::new();
    let params = fast_params(2).with_every_step(true).with_seed(Some(1));

    let handle = sequencer::start(params, scale("c", Mode::Major, 1), sink.clone()).unwrap();

    assert_eq!(handle.wait(), Ok(CompletionReason::EndOfPattern));
    assert_eq!(sink.note_on_count(), 32);
    assert_eq!(sink.close_calls(), 1);
}

#[test]
fn test_played_notes_stay_in_scale() {
    let scale = scale("d", Mode::Pentatonic, 2);
    let sink = MemorySink::new();
    let params = fast_params(4).with_seed(Some(99));

    let handle = sequencer::start(params, scale.clone(), sink.clone()).unwrap();
    assert_eq!(handle.wait(), Ok(CompletionReason::EndOfPattern));

    let played = note_ons(&sink.messages());
    assert!(played.len() <= 64);
    for note in played {
        assert!(scale.contains(note as i32), "{} is not in the scale", note);
    }
}

#[test]
fn test_note_on_always_followed_by_its_note_off() {
    let sink = MemorySink::new();
    let params = fast_params(2)
        .with_gate_mod(80, true)
        .with_time_mod(50)
        .with_seed(Some(5));

    let handle = sequencer::start(params, scale("a", Mode::Minor, 1), sink.clone()).unwrap();
    assert_eq!(handle.wait(), Ok(CompletionReason::EndOfPattern));

    let messages = sink.messages();
    assert_eq!(messages.len() % 2, 0);
    for pair in messages.chunks(2) {
        match pair {
            [MidiMessage::NoteOn { note: on, .. }, MidiMessage::NoteOff { note: off, .. }] => {
                assert_eq!(on, off)
            }
            other => panic!("unexpected message order: {:?}", other),
        }
    }
}

#[test]
fn test_same_seed_same_sequence() {
    let run = |seed| {
        let sink = MemorySink::new();
        let params = fast_params(2).with_seed(Some(seed));
        let handle =
            sequencer::start(params, scale("g", Mode::Major, 2), sink.clone()).unwrap();
        assert_eq!(handle.wait(), Ok(CompletionReason::EndOfPattern));
        sink.messages()
    };

    assert_eq!(run(1234), run(1234));
}

#[test]
fn test_cancel_mid_pattern_finishes_current_step() {
    let recorded = MemorySink::new();
    let switch = RunSwitch::armed();
    let sink = Mutex::new(StopAfterSink {
        inner: recorded.clone(),
        switch: switch.clone(),
        limit: 5,
        seen: 0,
    });

    // 1/4 notes, 5 bars -> 20 steps
    let params = SequenceParams::new(0, 6000, 4, 5)
        .unwrap()
        .with_every_step(true);
    let mut sequencer = StepSequencer::new(
        params,
        scale("c", Mode::Chromatic, 1),
        StdRng::seed_from_u64(3),
    )
    .unwrap();

    let reason = sequencer.run(&sink, &switch).unwrap();

    assert_eq!(reason, CompletionReason::Cancelled);
    assert_eq!(sequencer.state().steps_taken(), 5);
    assert_eq!(sequencer.state().remaining_steps(), 15);

    let messages = recorded.messages();
    assert_eq!(note_ons(&messages).len(), 5);
    assert!(matches!(messages.last(), Some(MidiMessage::NoteOff { .. })));
}

#[test]
fn test_cancel_through_handle_closes_sink_once() {
    let sink = MemorySink::new();
    // 1/4 notes at 120 BPM -> 0.5 s per step
    let params = SequenceParams::new(0, 120, 4, 8).unwrap();
    let handle = sequencer::start(params, scale("c", Mode::Major, 1), sink.clone()).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();
    {
        let calls = Arc::clone(&calls);
        handle.on_complete(move |outcome| {
            calls.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(outcome.clone());
        });
    }

    handle.cancel();
    handle.cancel();

    let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(outcome, Ok(CompletionReason::Cancelled));
    assert_eq!(handle.status(), RunStatus::Cancelled);
    assert_eq!(handle.wait(), Ok(CompletionReason::Cancelled));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(sink.close_calls(), 1);
    assert!(sink.note_on_count() <= 1);
}

#[test]
fn test_external_clock_failure_becomes_outcome() {
    // Clock start succeeds, then the sink gives out a few messages later
    let sink = MemorySink::failing_after(4);
    let params = SequenceParams::new(0, 120, 4, 8)
        .unwrap()
        .with_external_clock(true, false);

    let handle = sequencer::start(params, scale("c", Mode::Major, 1), sink.clone()).unwrap();
    let outcome = handle.wait();

    assert!(matches!(outcome, Err(SequencerError::TransportFailure(_))));
    assert_eq!(sink.close_calls(), 1);
    assert!(sink.is_closed());
}

#[test]
fn test_no_clock_messages_without_external_clock() {
    let sink = MemorySink::new();
    let params = fast_params(1).with_seed(Some(8));

    let handle = sequencer::start(params, scale("e", Mode::WholeTone, 1), sink.clone()).unwrap();
    assert_eq!(handle.wait(), Ok(CompletionReason::EndOfPattern));

    assert!(sink.messages().iter().all(|m| !m.is_clock()));
}
