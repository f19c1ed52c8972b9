use image::{Rgb, RgbImage};
use track_engine::{DebugCapture, Rejection, TrackMask, Vec3, WaypointGraph};

const TRACK: Rgb<u8> = Rgb([70, 70, 70]);
const GROUND: Rgb<u8> = Rgb([15, 15, 15]);
const PATH: Rgb<u8> = Rgb([240, 200, 40]);
const WAYPOINT: Rgb<u8> = Rgb([255, 255, 255]);
const START: Rgb<u8> = Rgb([40, 220, 80]);
const FINISH: Rgb<u8> = Rgb([230, 50, 50]);
const SAMPLED: Rgb<u8> = Rgb([60, 200, 230]);

fn rejection_color(reason: Rejection) -> Rgb<u8> {
    match reason {
        Rejection::OffTrack => Rgb([150, 40, 40]),
        Rejection::OutOfBounds => Rgb([160, 40, 160]),
        Rejection::Visited => Rgb([230, 130, 30]),
    }
}

/// Top-down rendering of a mask with a path and optional walker debug points
/// drawn over it. `scale` is output pixels per mask pixel.
pub struct Preview<'a> {
    mask: &'a TrackMask,
    scale: u32,
    image: RgbImage,
}

impl<'a> Preview<'a> {
    pub fn new(mask: &'a TrackMask, scale: u32) -> Self {
        let scale = scale.max(1);
        let (w, h) = (mask.width() as u32, mask.height() as u32);
        let mut image = RgbImage::new(w * scale, h * scale);
        for y in 0..h * scale {
            for x in 0..w * scale {
                let uv = track_engine::Vec2::new(
                    (x as f32 + 0.5) / (w * scale) as f32,
                    1.0 - (y as f32 + 0.5) / (h * scale) as f32,
                );
                let color = if mask.is_drivable_uv(uv) { TRACK } else { GROUND };
                image.put_pixel(x, y, color);
            }
        }
        Self { mask, scale, image }
    }

    fn to_pixel(&self, world: Vec3) -> (f32, f32) {
        let uv = self.mask.to_normalized(world);
        let (w, h) = (self.image.width() as f32, self.image.height() as f32);
        (uv.x * w, (1.0 - uv.y) * h)
    }

    fn dot(&mut self, world: Vec3, radius: i32, color: Rgb<u8>) {
        let (px, py) = self.to_pixel(world);
        let (cx, cy) = (px as i32, py as i32);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                self.plot(cx + dx, cy + dy, color);
            }
        }
    }

    fn plot(&mut self, x: i32, y: i32, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.image.width() && (y as u32) < self.image.height() {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    fn line(&mut self, from: Vec3, to: Vec3, color: Rgb<u8>) {
        let (x0, y0) = self.to_pixel(from);
        let (x1, y1) = self.to_pixel(to);
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as i32;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.plot((x0 + (x1 - x0) * t) as i32, (y0 + (y1 - y0) * t) as i32, color);
        }
    }

    pub fn draw_graph(&mut self, graph: &WaypointGraph) -> &mut Self {
        for pair in graph.waypoints().windows(2) {
            self.line(pair[0].position, pair[1].position, PATH);
        }
        if let (true, Some(first), Some(last)) = (graph.wraps(), graph.first(), graph.last()) {
            self.line(last.position, first.position, PATH);
        }
        let r = self.scale as i32 / 2;
        for w in graph.iter() {
            self.dot(w.position, r, WAYPOINT);
        }
        if let Some(start) = graph.start() {
            self.dot(start.position, r + 2, START);
        }
        if let Some(finish) = graph.finish() {
            self.dot(finish.position, r + 1, FINISH);
        }
        self
    }

    pub fn draw_capture(&mut self, capture: &DebugCapture) -> &mut Self {
        let r = (self.scale as i32 / 4).max(0);
        for (p, reason) in &capture.rejected {
            self.dot(*p, r, rejection_color(*reason));
        }
        for p in &capture.sampled {
            self.dot(*p, r, SAMPLED);
        }
        if let Some(seed) = capture.seed {
            self.dot(seed, r + 2, START);
        }
        self
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}
