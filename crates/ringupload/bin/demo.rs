//! Streams cube geometry and per-frame constants through a small upload ring.
//!
//! Run with: `RUST_LOG=debug cargo run -p ringupload-rs --features demo --bin demo`
//!
//! A simulated device queue executes each submission a few frames after it
//! was submitted and then signals the shared timeline, the way a GPU timeline
//! semaphore would. The ring is sized so that it wraps every few frames and
//! occasionally runs full.

use anyhow::Context;
use rand::Rng;
use ringupload_rs::{
    BufferId, CompletionOracle, Timeline, UploadSubmission, Uploader, UploaderConfig,
};
use std::collections::{HashMap, VecDeque};

const VERTEX_BUFFER: BufferId = BufferId(1);
const INDEX_BUFFER: BufferId = BufferId(2);
const GLOBALS_BUFFER: BufferId = BufferId(3);

const FRAMES: u64 = 64;

/// Positions and uvs of the eight cube corners.
#[rustfmt::skip]
const CUBE_VERTICES: [f32; 40] = [
    -1.0, -1.0, -1.0,  0.0, 0.0,
     1.0, -1.0, -1.0,  0.0, 1.0,
     1.0,  1.0, -1.0,  1.0, 1.0,
    -1.0,  1.0, -1.0,  1.0, 0.0,
    -1.0,  1.0,  1.0,  0.0, 0.0,
     1.0,  1.0,  1.0,  0.0, 1.0,
     1.0, -1.0,  1.0,  1.0, 1.0,
    -1.0, -1.0,  1.0,  1.0, 0.0,
];

#[rustfmt::skip]
const CUBE_INDICES: [u32; 36] = [
    0, 2, 1,  0, 3, 2, // front
    2, 3, 4,  2, 4, 5, // top
    1, 2, 5,  1, 5, 6, // right
    0, 7, 4,  0, 4, 3, // left
    5, 4, 7,  5, 7, 6, // back
    0, 6, 7,  0, 1, 6, // bottom
];

/// Host stand-in for a device queue with submission latency.
struct SimulatedQueue<'a> {
    timeline: &'a Timeline,
    in_flight: VecDeque<(u64, UploadSubmission)>,
    buffers: HashMap<BufferId, Vec<u8>>,
}

impl<'a> SimulatedQueue<'a> {
    fn new(timeline: &'a Timeline) -> Self {
        let buffers = [
            (VERTEX_BUFFER, vec![0u8; 4 * CUBE_VERTICES.len()]),
            (INDEX_BUFFER, vec![0u8; 4 * CUBE_INDICES.len()]),
            (GLOBALS_BUFFER, vec![0u8; 64]),
        ]
        .into_iter()
        .collect();
        Self {
            timeline,
            in_flight: VecDeque::new(),
            buffers,
        }
    }

    fn submit(&mut self, ready_at: u64, submission: UploadSubmission) {
        self.in_flight.push_back((ready_at, submission));
    }

    /// Executes every submission due by `frame` and signals its token.
    fn poll<O: CompletionOracle>(
        &mut self,
        frame: u64,
        uploader: &Uploader<O>,
    ) -> anyhow::Result<()> {
        while self.in_flight.front().is_some_and(|(ready, _)| *ready <= frame) {
            let Some((_, submission)) = self.in_flight.pop_front() else {
                break;
            };
            for command in &submission.commands {
                let dst = self
                    .buffers
                    .get_mut(&command.dst)
                    .context("copy into unknown buffer")?;
                command.execute(uploader.staging(), dst)?;
            }
            log::debug!("{} executed", submission.label());
            self.timeline.signal(submission.token());
        }
        Ok(())
    }

    fn drain<O: CompletionOracle>(&mut self, uploader: &Uploader<O>) -> anyhow::Result<()> {
        self.poll(u64::MAX, uploader)
    }
}

fn as_bytes_f32(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn as_bytes_u32(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// A fake view-projection matrix that changes every frame.
fn globals_for_frame(frame: u64) -> Vec<u8> {
    let t = frame as f32 * 0.1;
    #[rustfmt::skip]
    let matrix: [f32; 16] = [
        t.cos(), 0.0, -t.sin(), 0.0,
        0.0, 1.0, 0.0, 0.0,
        t.sin(), 0.0, t.cos(), 0.0,
        0.0, 0.0, -5.0, 1.0,
    ];
    as_bytes_f32(&matrix)
}

/// Stages `bytes` for `dst`, flushing the device queue once if the ring is full.
fn stage<O: CompletionOracle>(
    uploader: &mut Uploader<O>,
    queue: &mut SimulatedQueue<'_>,
    frame: u64,
    dst: BufferId,
    bytes: &[u8],
) -> anyhow::Result<()> {
    match uploader.upload(dst, 0, bytes) {
        Ok(region) => {
            log::debug!("frame {frame}: staged {} bytes at {}", bytes.len(), region.offset());
        }
        Err(e) if e.is_recoverable() => {
            log::info!("frame {frame}: ring full, flushing the device queue");
            queue.drain(uploader)?;
            uploader.reclaim();
            uploader.upload(dst, 0, bytes)?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let timeline = Timeline::new(0);
    // Cube data is 304 bytes; a 512-byte ring forces wrap-around and stalls
    let config = UploaderConfig::default().with_capacity(512).with_metrics(true);
    let mut uploader = Uploader::new(config, &timeline)?;
    let mut queue = SimulatedQueue::new(&timeline);
    let mut rng = rand::thread_rng();

    let vertices = as_bytes_f32(&CUBE_VERTICES);
    let indices = as_bytes_u32(&CUBE_INDICES);

    for frame in 0..FRAMES {
        queue.poll(frame, &uploader)?;
        uploader.reclaim();

        // Re-stream the mesh every eighth frame
        if frame % 8 == 0 {
            stage(&mut uploader, &mut queue, frame, VERTEX_BUFFER, &vertices)?;
            stage(&mut uploader, &mut queue, frame, INDEX_BUFFER, &indices)?;
        }
        stage(&mut uploader, &mut queue, frame, GLOBALS_BUFFER, &globals_for_frame(frame))?;

        let submission = uploader.submit();
        let latency = rng.gen_range(1..=3);
        queue.submit(frame + latency, submission);
    }

    queue.drain(&uploader)?;
    uploader.reclaim();

    let expected_vertices = as_bytes_f32(&CUBE_VERTICES);
    anyhow::ensure!(
        queue.buffers[&VERTEX_BUFFER] == expected_vertices,
        "vertex buffer contents differ from the cube data"
    );
    anyhow::ensure!(
        queue.buffers[&GLOBALS_BUFFER] == globals_for_frame(FRAMES - 1),
        "globals buffer does not hold the last frame's constants"
    );

    let metrics = uploader.metrics();
    log::info!(
        "{} uploads ({} bytes) in {} batches, peak {} of {} bytes claimed, {} stalls",
        metrics.uploads,
        metrics.bytes_uploaded,
        metrics.batches_submitted,
        metrics.peak_claimed,
        uploader.allocator().capacity(),
        metrics.backpressure_events
    );
    anyhow::ensure!(uploader.allocator().is_idle(), "ring not idle after draining");

    Ok(())
}
