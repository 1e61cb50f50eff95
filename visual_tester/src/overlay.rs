use opencv::{
    core::{Mat, Point, Rect, Scalar},
    imgproc,
};
use pet_vision::{ClassifierConfig, DetectionUpdate, ZoneKind, ZoneRegistry};

fn zone_color(kind: ZoneKind) -> Scalar {
    match kind {
        ZoneKind::Food => Scalar::new(0.0, 165.0, 255.0, 0.0),
        ZoneKind::Water => Scalar::new(255.0, 144.0, 30.0, 0.0),
        ZoneKind::Bed => Scalar::new(180.0, 105.0, 255.0, 0.0),
    }
}

fn zone_radius(kind: ZoneKind, classifier: &ClassifierConfig) -> f64 {
    match kind {
        ZoneKind::Food | ZoneKind::Water => classifier.feeding_zone_radius,
        ZoneKind::Bed => classifier.bed_zone_radius,
    }
}

/// Zone rings, detection boxes, and the status banner.
pub fn draw(
    frame: &mut Mat,
    update: Option<&DetectionUpdate>,
    zones: &ZoneRegistry,
    classifier: &ClassifierConfig,
    fps: u32,
    status: &str,
) -> opencv::Result<()> {
    for (kind, zone) in zones.iter() {
        let center = Point::new(zone.x as i32, zone.y as i32);
        let color = zone_color(kind);
        imgproc::circle(frame, center, zone_radius(kind, classifier) as i32, color, 2, imgproc::LINE_AA, 0)?;
        label(frame, kind.as_str(), Point::new(center.x - 20, center.y), color)?;
    }

    let Some(update) = update else {
        return label(frame, status, Point::new(10, 24), Scalar::all(255.0));
    };

    for prediction in &update.predictions {
        let b = prediction.bbox;
        let rect = Rect::new(b.x as i32, b.y as i32, b.width as i32, b.height as i32);
        let color = if prediction.is_subject() {
            Scalar::new(0.0, 255.0, 0.0, 0.0)
        } else {
            Scalar::new(200.0, 200.0, 200.0, 0.0)
        };
        imgproc::rectangle(frame, rect, color, 2, imgproc::LINE_8, 0)?;
        let text = format!("{} {:.0}%", prediction.class, prediction.score * 100.0);
        label(frame, &text, Point::new(rect.x, (rect.y - 6).max(12)), color)?;
    }

    let banner = if update.subject_detected {
        format!(
            "{} ({:.0}%)  movement {:.1}  {} fps  {}",
            update.activity,
            update.confidence * 100.0,
            update.movement,
            fps,
            status
        )
    } else {
        format!("no subject  {fps} fps  {status}")
    };
    label(frame, &banner, Point::new(10, 24), Scalar::all(255.0))
}

fn label(frame: &mut Mat, text: &str, origin: Point, color: Scalar) -> opencv::Result<()> {
    imgproc::put_text(
        frame,
        text,
        origin,
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.6,
        color,
        2,
        imgproc::LINE_AA,
        false,
    )
}
