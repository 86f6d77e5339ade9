use image::Rgb;
use pathlight::{
    EffectKind, Frame, InMemorySink, OutputProfile, PathChange, Point, RunEvent, RunKind,
    RunStatus, Session, Settings, encode::is_ffmpeg_on_path,
};

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "pathlight_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn session() -> Session {
    let mut s = Session::new(Settings {
        effect: EffectKind::Vignette,
        speed: 200.0,
        fps: 10.0,
        ..Settings::default()
    });
    s.set_image(Frame::from_pixel(96, 64, Rgb([90, 140, 200])));
    s.model_mut().add_point(Point::new(8.0, 8.0), 30.0).unwrap();
    s.model_mut().add_point(Point::new(88.0, 16.0), 30.0).unwrap();
    s.model_mut().add_point(Point::new(48.0, 56.0), 40.0).unwrap();
    s
}

#[test]
fn project_survives_save_and_load() {
    let dir = temp_dir("project_roundtrip");
    let path = dir.join("nested").join("project.json");
    let s = session();
    s.save_project(&path).unwrap();

    let mut loaded = Session::default();
    let changes = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen = changes.clone();
    loaded
        .model_mut()
        .subscribe(move |c| seen.lock().unwrap().push(c));
    loaded.load_project(&path).unwrap();
    let _ = std::fs::remove_dir_all(&dir);

    assert_eq!(loaded.settings(), s.settings());
    assert_eq!(loaded.model().points(), s.model().points());
    assert_eq!(loaded.estimate(), s.estimate());
    assert!(!loaded.model_mut().undo());
    assert!(changes.lock().unwrap().contains(&PathChange::Restored));
}

#[test]
fn undo_restores_the_path_used_by_the_next_run() {
    let mut s = session();
    let before = s.estimate();
    s.model_mut().add_point(Point::new(2.0, 60.0), 30.0).unwrap();
    assert!(s.estimate().distance > before.distance);
    assert!(s.model_mut().undo());
    assert_eq!(s.estimate(), before);

    s.start_run(RunKind::Export, Box::new(InMemorySink::new()), None)
        .unwrap();
    let summary = s.wait().unwrap().unwrap();
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.estimate, before);
}

#[test]
fn preview_streams_frames_until_cancelled() {
    let mut s = session();
    s.set_settings(Settings {
        speed: 2.0,
        fps: 100.0,
        ..s.settings().clone()
    });
    let preview = s.start_preview().unwrap();
    assert_eq!(s.active_kind(), Some(RunKind::Preview));

    let first = preview.frames.recv().unwrap();
    assert_eq!(first.frame.dimensions(), (96, 64));
    let second = preview.frames.recv().unwrap();
    assert!(second.index > first.index);

    s.cancel();
    let summary = s.wait().unwrap().unwrap();
    assert_eq!(summary.status, RunStatus::Cancelled);
    let finished: Vec<_> = preview
        .events
        .try_iter()
        .filter(|e| matches!(e, RunEvent::Finished(_)))
        .collect();
    assert_eq!(finished.len(), 1);
}

#[test]
fn cancel_returns_while_an_undrained_preview_is_held() {
    let mut s = session();
    s.set_settings(Settings {
        speed: 1.0,
        fps: 1000.0,
        ..s.settings().clone()
    });
    let preview = s.start_preview().unwrap();
    preview.frames.recv().unwrap();
    // Let the worker fill the channel and block on it.
    std::thread::sleep(std::time::Duration::from_millis(200));

    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        s.cancel();
        let summary = s.wait();
        let _ = done_tx.send(summary);
    });
    let summary = done_rx
        .recv_timeout(std::time::Duration::from_secs(5))
        .expect("cancel and wait did not return")
        .unwrap()
        .unwrap();

    assert_eq!(summary.status, RunStatus::Cancelled);
    assert!(summary.error.is_none());
    let finished = preview
        .events
        .try_iter()
        .filter(|e| matches!(e, RunEvent::Finished(_)))
        .count();
    assert_eq!(finished, 1);
    // The receiver outlived the run.
    assert!(preview.frames.len() <= 8);
}

#[test]
fn dropping_a_session_stops_its_preview() {
    let mut s = session();
    s.set_settings(Settings {
        speed: 1.0,
        fps: 1000.0,
        ..s.settings().clone()
    });
    let preview = s.start_preview().unwrap();
    preview.frames.recv().unwrap();

    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        drop(s);
        let _ = done_tx.send(());
    });
    assert!(
        done_rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .is_ok()
    );
    assert!(
        preview
            .events
            .try_iter()
            .any(|e| matches!(e, RunEvent::Finished(_)))
    );
}

#[test]
fn export_writes_mp4_when_ffmpeg_is_available() {
    if !is_ffmpeg_on_path() {
        eprintln!("ffmpeg not on PATH; skipping");
        return;
    }
    let dir = temp_dir("export_mp4");
    let out = dir.join("run.mp4");
    let mut s = session();
    let events = s.start_export(&out, OutputProfile::Original).unwrap();
    let summary = s.wait().unwrap().unwrap();
    assert_eq!(summary.status, RunStatus::Completed, "{:?}", summary.error);
    assert!(events.try_iter().any(|e| matches!(e, RunEvent::Started { width: 96, height: 64, .. })));
    let len = std::fs::metadata(&out).unwrap().len();
    let _ = std::fs::remove_dir_all(&dir);
    assert!(len > 0);
}
