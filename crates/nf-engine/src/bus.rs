//! Mix bus
//!
//! Audio-side fan-in: renders every track into a scratch block, sums in
//! fixed positional order (ascending track position) for bit-stable
//! output, taps the analyzer ring with the pre-master mix, then applies
//! the master-gain ramp into the host output. The analyzer deliberately
//! sees the mix before master gain so visualization is invariant under
//! the playback-volume control.

use nf_core::Sample;
use nf_dsp::{SmoothedParam, GAIN_RAMP_MS};
use rtrb::Producer;

use crate::event::Diagnostic;
use crate::track::TrackDsp;

/// Audio-side mix bus owning the track processors
pub struct MixBus {
    tracks: Vec<Box<TrackDsp>>,
    master: SmoothedParam,
    track_buf: Vec<Sample>,
    mix_buf: Vec<Sample>,
    analyzer_tx: Producer<Sample>,
    reclaim_tx: Producer<Box<TrackDsp>>,
    diag_tx: Producer<Diagnostic>,
}

impl MixBus {
    pub fn new(
        block_size: usize,
        sample_rate: f64,
        analyzer_tx: Producer<Sample>,
        reclaim_tx: Producer<Box<TrackDsp>>,
        diag_tx: Producer<Diagnostic>,
    ) -> Self {
        let mut master = SmoothedParam::new(0.0, GAIN_RAMP_MS, sample_rate);
        master.set_immediate(1.0);
        Self {
            tracks: Vec::with_capacity(64),
            master,
            track_buf: vec![0.0; block_size],
            mix_buf: vec![0.0; block_size],
            analyzer_tx,
            reclaim_tx,
            diag_tx,
        }
    }

    pub fn add_track(&mut self, track: Box<TrackDsp>) {
        // Boxes stay boxed: installing and removing tracks moves pointers,
        // never frees heap memory on the audio thread
        self.tracks.push(track);
    }

    pub fn remove_track(&mut self, index: usize) {
        if index >= self.tracks.len() {
            return;
        }
        let removed = self.tracks.remove(index);
        if self.reclaim_tx.push(removed).is_err() {
            // Reclaim ring full: the box drops here. Sized so this does
            // not happen under any sane command rate.
            let _ = self.diag_tx.push(Diagnostic::ReclaimOverflow);
        }
    }

    pub fn track_mut(&mut self, index: usize) -> Option<&mut TrackDsp> {
        self.tracks.get_mut(index).map(|t| t.as_mut())
    }

    pub fn tracks_mut(&mut self) -> impl Iterator<Item = &mut TrackDsp> {
        self.tracks.iter_mut().map(|t| t.as_mut())
    }

    pub fn set_master_gain(&mut self, gain: f64) {
        self.master.set_target(gain.clamp(0.0, 1.0));
    }

    /// Queue a diagnostic for the control thread; dropped if the ring is
    /// full (diagnostics are one-shot hints, not a log)
    pub fn raise(&mut self, diagnostic: Diagnostic) {
        let _ = self.diag_tx.push(diagnostic);
    }

    /// Render one block into `output` (overwrites)
    pub fn process(&mut self, output: &mut [Sample]) {
        let len = output.len();
        let mix = &mut self.mix_buf[..len];
        mix.fill(0.0);

        // Fixed summation order: ascending track position
        for track in &mut self.tracks {
            let buf = &mut self.track_buf[..len];
            track.process(buf);
            for (acc, &sample) in mix.iter_mut().zip(buf.iter()) {
                *acc += sample;
            }
        }

        // Analyzer tap, pre-master. A full ring drops samples; the
        // analyzer only ever needs the most recent frame.
        for &sample in mix.iter() {
            let _ = self.analyzer_tx.push(sample);
        }

        for (out, &sample) in output.iter_mut().zip(mix.iter()) {
            *out = sample * self.master.next() as Sample;
        }
    }
}
