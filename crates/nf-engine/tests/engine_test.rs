//! Engine integration: controller/processor pair driven like a host

use nf_core::{FilterConfig, FilterType, HostBlockSize, NfError, SampleRate};
use nf_dsp::STFT_SIZE;
use nf_engine::{ConfigRequest, ConfigResponse, EngineEvent, NoiseEngine};

const BLOCK: usize = 128;

fn render(processor: &mut nf_engine::AudioProcessor, blocks: usize) -> Vec<f32> {
    let mut out = vec![0.0; blocks * BLOCK];
    for chunk in out.chunks_mut(BLOCK) {
        assert!(processor.process(chunk));
    }
    out
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |a, &x| a.max(x.abs()))
}

#[test]
fn engine_plays_and_stops() {
    let (mut processor, mut controller) =
        NoiseEngine::new(SampleRate::Hz48000, HostBlockSize::Samples128);

    controller.add_track().unwrap();
    controller.start_all().unwrap();

    let warm = 2 * STFT_SIZE / BLOCK + 8;
    let out = render(&mut processor, warm);
    assert!(peak(&out[2 * STFT_SIZE..]) > 0.1, "engine should be audible");

    controller.stop_all().unwrap();
    render(&mut processor, 8);
    let out = render(&mut processor, 4);
    assert_eq!(peak(&out), 0.0, "stopped engine should be silent");
}

#[test]
fn soft_join_starts_new_track_while_playing() {
    let (mut processor, mut controller) =
        NoiseEngine::new(SampleRate::Hz48000, HostBlockSize::Samples128);

    controller.add_track().unwrap();
    controller.start_all().unwrap();
    render(&mut processor, 16);

    // Adding while playing starts the track without another start_all
    controller.add_track().unwrap();
    let events = controller.events().drain();
    assert!(events.contains(&EngineEvent::TrackAdded(1)));
    assert!(events.contains(&EngineEvent::TrackStarted(1)));

    let warm = 2 * STFT_SIZE / BLOCK + 8;
    let out = render(&mut processor, warm);
    assert!(peak(&out[2 * STFT_SIZE..]) > 0.1);
}

#[test]
fn muted_track_does_not_reach_the_mix() {
    let (mut processor, mut controller) =
        NoiseEngine::new(SampleRate::Hz48000, HostBlockSize::Samples128);

    controller.add_track().unwrap();
    controller.set_track_muted(0, true).unwrap();
    controller.start_all().unwrap();

    let warm = 2 * STFT_SIZE / BLOCK + 16;
    let out = render(&mut processor, warm);
    assert_eq!(peak(&out[2 * STFT_SIZE..]), 0.0);
}

#[test]
fn filter_operations_round_trip_through_controller() {
    let (_processor, mut controller) =
        NoiseEngine::new(SampleRate::Hz44100, HostBlockSize::Samples128);

    let track = controller.add_track().unwrap();
    let filter = controller
        .add_filter(track, FilterType::Gaussian, None)
        .unwrap();

    // Clamp observable on read-back
    let config = controller
        .set_filter_parameter(track, filter, "center_freq", 1e9)
        .unwrap();
    assert_eq!(config.center_freq(), 20000.0);
    assert_eq!(
        controller.filter_config(track, filter).unwrap().center_freq(),
        20000.0
    );

    // Unknown key for the variant
    let err = controller
        .set_filter_parameter(track, filter, "flat_width", 10.0)
        .unwrap_err();
    assert!(matches!(err, NfError::BadParameter(_)));

    // Index errors
    assert!(matches!(
        controller.filter_config(track, 9),
        Err(NfError::BadIndex(9))
    ));
    assert!(matches!(
        controller.filter_config(7, 0),
        Err(NfError::BadIndex(7))
    ));
}

#[test]
fn config_channel_speaks_typed_messages() {
    let (mut processor, mut controller) =
        NoiseEngine::new(SampleRate::Hz48000, HostBlockSize::Samples128);

    let track = controller.add_track().unwrap();
    let filter = controller
        .add_filter(track, FilterType::Plateau, None)
        .unwrap();

    // Partial config applies in order and acks
    let response = controller.handle_request(ConfigRequest::Config {
        track,
        filter,
        params: vec![("center_freq".into(), 880.0), ("width".into(), 220.0)],
    });
    assert_eq!(response, ConfigResponse::Initialized);
    let config = controller.filter_config(track, filter).unwrap();
    assert_eq!(config.center_freq(), 880.0);
    assert_eq!(config.width(), 220.0);

    // Unknown parameter surfaces as a typed error
    let response = controller.handle_request(ConfigRequest::Config {
        track,
        filter,
        params: vec![("skew".into(), 1.0)],
    });
    assert!(matches!(response, ConfigResponse::Error(_)));

    // FFT geometry
    match controller.handle_request(ConfigRequest::GetFftInfo) {
        ConfigResponse::FftInfo(info) => {
            assert_eq!(info.fft_size, 4096);
            assert_eq!(info.hop_size, 1024);
            assert_eq!(info.latency_samples, 4096);
            assert_eq!(info.sample_rate, 48000);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    // Performance requires a processed block first
    match controller.handle_request(ConfigRequest::GetPerformance) {
        ConfigResponse::Error(message) => assert!(message.contains("not initialized")),
        other => panic!("unexpected response: {other:?}"),
    }
    render(&mut processor, 4);
    match controller.handle_request(ConfigRequest::GetPerformance) {
        ConfigResponse::Performance(info) => {
            assert_eq!(info.blocks_processed, 4);
            assert!(info.deadline_us > 2600.0 && info.deadline_us < 2700.0);
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[test]
fn remove_track_shifts_positions_and_reclaims() {
    let (mut processor, mut controller) =
        NoiseEngine::new(SampleRate::Hz48000, HostBlockSize::Samples128);

    controller.add_track().unwrap();
    controller.add_track().unwrap();
    controller
        .add_filter(1, FilterType::Parabolic, None)
        .unwrap();

    controller.remove_track(0).unwrap();
    assert_eq!(controller.track_count(), 1);
    // The surviving track kept its chain; it is now position 0
    assert_eq!(
        controller.filter_config(0, 0).unwrap().filter_type(),
        FilterType::Parabolic
    );

    render(&mut processor, 2);
    controller.poll();

    assert!(matches!(
        controller.remove_track(5),
        Err(NfError::BadIndex(5))
    ));
}

#[test]
fn analyzer_tap_produces_display_data() {
    let (mut processor, mut controller) =
        NoiseEngine::new(SampleRate::Hz48000, HostBlockSize::Samples128);

    controller.add_track().unwrap();
    controller.start_all().unwrap();
    render(&mut processor, 2 * STFT_SIZE / BLOCK + 16);

    let analyzer = controller.analyzer();
    let mut tap = analyzer.lock();
    tap.update();
    let data = tap.display_data(640);
    assert_eq!(data.len(), 640);
    // A running noise mix reads above the silence floor somewhere
    assert!(data.iter().any(|&db| db > -100.0));
}

#[test]
fn passthrough_sections_shape_the_track_before_the_chain() {
    use nf_dsp::{Biquad, SectionType};

    // A steep highpass far above the band kills essentially everything
    let (mut processor, mut controller) =
        NoiseEngine::new(SampleRate::Hz48000, HostBlockSize::Samples128);
    let sections = vec![
        Biquad::new(SectionType::Highpass, 20000.0, 0.707, 48000.0),
        Biquad::new(SectionType::Highpass, 20000.0, 0.707, 48000.0),
    ];
    controller.add_track_with_passthrough(sections).unwrap();
    controller.start_all().unwrap();

    let warm = 2 * STFT_SIZE / BLOCK + 8;
    let filtered = render(&mut processor, warm);

    let (mut processor, mut controller) =
        NoiseEngine::new(SampleRate::Hz48000, HostBlockSize::Samples128);
    controller.add_track().unwrap();
    controller.start_all().unwrap();
    let unfiltered = render(&mut processor, warm);

    let tail = 2 * STFT_SIZE;
    assert!(peak(&filtered[tail..]) < 0.5 * peak(&unfiltered[tail..]));
}

#[test]
fn snapshot_reflects_controller_state() {
    let (_processor, mut controller) =
        NoiseEngine::new(SampleRate::Hz44100, HostBlockSize::Samples128);

    let track = controller.add_track().unwrap();
    controller.set_track_gain(track, 0.25).unwrap();
    controller
        .add_filter(
            track,
            FilterType::Plateau,
            Some(FilterConfig::Plateau {
                center_freq: 500.0,
                width: 300.0,
                gain_db: -3.0,
                flat_width: 50.0,
            }),
        )
        .unwrap();
    controller.set_filter_enabled(track, 0, false).unwrap();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.sample_rate, SampleRate::Hz44100);
    assert_eq!(snapshot.tracks.len(), 1);
    let t = &snapshot.tracks[0];
    assert_eq!(t.gain, 0.25);
    assert_eq!(t.filters.len(), 1);
    assert!(!t.filters[0].enabled);
    assert_eq!(t.filters[0].config.center_freq(), 500.0);
}
