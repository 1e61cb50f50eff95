mod camera;
mod controls;
mod detector;
mod overlay;

use camera::{Input, OpenCvCamera};
use controls::{Command, Controls, command_for_key};
use detector::YoloDetector;
use opencv::{
    core::Mat,
    highgui,
    prelude::*,
    videoio::VideoWriter,
};
use pet_vision::dashboard::Dashboard;
use pet_vision::{
    ActivityReport, Config, DetectionSession, DetectionUpdate, ManualOverride, SourceId, TickOutcome, Zone,
};
use pet_vision_server::{HubHandle, ServerConfig, init_tracing, start_server};
use std::env;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

const WINDOW: &str = "pet_vision";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    // --- 1. Argument Parsing & Setup ---
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("Usage: visual_tester <camera_index|input_video> [output_video] [--headless] [--serve]");
        return Ok(());
    }
    let rest = &args[2..];
    let output_path = rest.iter().find(|a| !a.starts_with("--")).cloned();
    let headless = rest.iter().any(|a| a == "--headless");
    let serve = rest.iter().any(|a| a == "--serve");

    let config = Config::load_or_default(env::var("PV_CONFIG").unwrap_or_else(|_| "pet_vision.toml".to_string()));
    let model_path = env::var("PV_MODEL").unwrap_or_else(|_| "yolov8n.onnx".to_string());

    // --- 2. Video Source & Detector ---
    let camera = OpenCvCamera::new(Input::parse(&args[1]));
    let tap = camera.tap();
    let finished = camera.finished();
    let detector = YoloDetector::load(&model_path)?;
    let (override_tx, override_rx) = watch::channel(ManualOverride::default());
    let mut session = DetectionSession::start(camera, detector, override_rx, &config)?;

    // --- 3. Activity Hub & Forwarding ---
    let server_cfg = ServerConfig::from_env();
    let (hub, _actor) = HubHandle::spawn(server_cfg.history_capacity, server_cfg.listener_capacity);
    if serve {
        start_server(hub.clone(), server_cfg).await?;
    }
    let source_id = hub.register_source();
    let forwarder = tokio::spawn(forward_reports(session.bus().subscribe_activity(), hub.clone(), source_id));

    // --- 4. Window & Mouse ---
    let clicks: Arc<Mutex<Option<(i32, i32)>>> = Arc::new(Mutex::new(None));
    if !headless {
        highgui::named_window(WINDOW, highgui::WINDOW_AUTOSIZE)?;
        let clicks_ref = clicks.clone();
        highgui::set_mouse_callback(
            WINDOW,
            Some(Box::new(move |event, x, y, _flags| {
                if event == highgui::EVENT_LBUTTONDOWN {
                    if let Ok(mut slot) = clicks_ref.lock() {
                        *slot = Some((x, y));
                    }
                }
            })),
        )?;
    }

    // --- 5. Main Processing Loop ---
    let fps_rx = session.bus().subscribe_fps();
    let mut controls = Controls::default();
    let mut writer: Option<VideoWriter> = None;
    let mut last_update: Option<DetectionUpdate> = None;
    let mut interval = tokio::time::interval(config.session.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut ctrl_c => break,
        }
        if finished.load(Ordering::Relaxed) {
            break;
        }

        if let TickOutcome::Processed(update) = session.tick() {
            last_update = Some(update);
            let frame = tap.lock().ok().and_then(|mut slot| slot.take());
            if let Some(mut frame) = frame {
                // --- 6. Visualization ---
                overlay::draw(
                    &mut frame,
                    last_update.as_ref(),
                    session.zones(),
                    &config.classifier,
                    *fps_rx.borrow(),
                    &controls.status(),
                )?;
                if let Some(path) = &output_path {
                    write_frame(&mut writer, path, &frame, config.session.display_fps)?;
                }
                if !headless {
                    highgui::imshow(WINDOW, &frame)?;
                }
            }
        }

        if headless {
            continue;
        }

        // --- 7. Operator Input ---
        if let Some(command) = command_for_key(highgui::wait_key(1)?) {
            if command == Command::Quit {
                break;
            }
            if let Some(manual) = controls.apply(command) {
                info!(enabled = manual.enabled, label = ?manual.label, "manual override changed");
                override_tx.send_replace(manual);
            }
        }
        let click = clicks.lock().ok().and_then(|mut slot| slot.take());
        if let (Some(kind), Some((x, y))) = (controls.armed_zone, click) {
            session.set_zone(kind, Zone::new(x as f64, y as f64));
            controls.armed_zone = None;
        }
    }

    // --- 8. Shutdown & Summary ---
    let summary = session.stop();
    if forwarder.await.is_err() {
        warn!("activity forwarder panicked");
    }
    let mut dashboard = Dashboard::new();
    dashboard.apply(hub.snapshot().await?);
    for (pet, stats) in dashboard.statistics() {
        info!(
            pet = %pet,
            total = stats.total,
            avg_confidence = stats.avg_confidence,
            avg_movement = stats.avg_movement,
            "session statistics"
        );
    }
    let _ = hub.disconnect(source_id);

    info!(
        frames = summary.frames_processed,
        reports = summary.activities_reported,
        "processing complete"
    );
    if let Some(path) = output_path {
        println!("Processing complete. Output saved to {}", path);
    }
    Ok(())
}

/// Relays the session's reports into the hub under one source identity.
async fn forward_reports(mut reports: broadcast::Receiver<ActivityReport>, hub: HubHandle, source_id: SourceId) {
    loop {
        match reports.recv().await {
            Ok(report) => {
                if let Err(e) = hub.ingest(source_id, report) {
                    warn!(error = %e, "stopping activity forwarder");
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "activity forwarder lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Opens the writer on the first frame, sized to the native resolution.
fn write_frame(writer: &mut Option<VideoWriter>, path: &str, frame: &Mat, fps: u32) -> opencv::Result<()> {
    if writer.is_none() {
        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
        *writer = Some(VideoWriter::new(path, fourcc, fps as f64, frame.size()?, true)?);
    }
    if let Some(writer) = writer.as_mut() {
        writer.write(frame)?;
    }
    Ok(())
}
