// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

mod args;

use args::Args;
use clap::Parser;
use edge_viewer::{
    broadcast::FrameBroadcaster,
    export::save_frame,
    lifecycle::ProcessorLifecycle,
    pipeline::{FramePipeline, PipelineConfig, ProcessedFrame},
    process::ProcessingMode,
    queue::{FrameQueue, QueuedFrame},
    stats::{FpsCounter, PerformanceMonitor},
};
use std::{error::Error, fs, io, thread, time::Duration};
use tokio::{net::TcpListener, runtime::Runtime, sync::oneshot, task::JoinHandle};
use tracing::{debug, error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

/// Capture cadence simulated by the producer thread.
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

fn init_tracing(args: &Args) -> Result<(), Box<dyn Error>> {
    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let journald = tracing_journald::layer().ok();
    let tracy = args.tracy.then(tracing_tracy::TracyLayer::default);

    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter))
        .with(journald)
        .with(tracy);
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(&args)?;

    let config = PipelineConfig {
        layout: args.layout.into(),
        mirror: args.mirror.into(),
        ..Default::default()
    };
    let pipeline = FramePipeline::new(config);
    let lifecycle = ProcessorLifecycle::new();

    let raw = fs::read(&args.input)?;
    info!(
        input = %args.input.display(),
        bytes = raw.len(),
        layout = %config.layout,
        width = args.width(),
        height = args.height(),
        "loaded sensor dump"
    );

    let stream = match args.serve {
        Some(port) => Some(StreamServer::start(port)?),
        None => None,
    };

    lifecycle.initialize();
    let result = replay(&args, &pipeline, raw, stream.as_ref().map(|s| &s.broadcaster));
    lifecycle.release();

    if let Some(stream) = stream {
        stream.shutdown()?;
    }
    let last = result?;
    let Some((frame, fps)) = last else {
        error!("no frame was processed");
        return Err(Box::from("no frame was processed"));
    };

    if let Some(path) = &args.output {
        save_frame(path, &frame)?;
        info!(path = %path.display(), "saved frame");
    }
    if let Some(path) = &args.metadata {
        fs::write(path, serde_json::to_string_pretty(&frame.metadata(fps))?)?;
        info!(path = %path.display(), "saved metadata");
    }
    Ok(())
}

/// WebSocket endpoint running on its own tokio runtime next to the
/// synchronous replay loop.
struct StreamServer {
    runtime: Runtime,
    broadcaster: FrameBroadcaster,
    stop: oneshot::Sender<()>,
    task: JoinHandle<io::Result<()>>,
}

impl StreamServer {
    fn start(port: u16) -> Result<Self, Box<dyn Error>> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("stream")
            .enable_all()
            .build()?;
        let listener = runtime.block_on(TcpListener::bind(("0.0.0.0", port)))?;
        let broadcaster = FrameBroadcaster::new();
        let (stop, stopped) = oneshot::channel();
        let task = runtime.spawn(broadcaster.clone().serve(listener, async {
            let _ = stopped.await;
        }));
        Ok(Self {
            runtime,
            broadcaster,
            stop,
            task,
        })
    }

    fn shutdown(self) -> Result<(), Box<dyn Error>> {
        let _ = self.stop.send(());
        self.runtime.block_on(self.task)??;
        Ok(())
    }
}

/// Feeds the dump through a capture thread and the frame queue, processing
/// the newest queued frame each cycle and streaming it when a broadcaster is
/// given. Returns the last frame and the frame rate at the time it was
/// produced.
fn replay(
    args: &Args,
    pipeline: &FramePipeline,
    raw: Vec<u8>,
    stream: Option<&FrameBroadcaster>,
) -> Result<Option<(ProcessedFrame, f32)>, Box<dyn Error>> {
    let queue = FrameQueue::default();
    let mode = ProcessingMode::from(args.mode);

    let producer = {
        let queue = queue.clone();
        let (width, height, rotation, frames) =
            (args.width(), args.height(), args.rotation(), args.frames);
        thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || {
                let mut dropped = 0u32;
                for _ in 0..frames {
                    let frame = QueuedFrame::new(raw.clone(), width, height, rotation);
                    if !queue.put_frame(frame) {
                        dropped += 1;
                    }
                    thread::sleep(FRAME_INTERVAL);
                }
                dropped
            })?
    };

    let mut fps = FpsCounter::new();
    let mut monitor = PerformanceMonitor::new();
    let mut last = None;
    let mut failures = 0u32;
    loop {
        let Some(frame) = queue.get_latest_frame() else {
            if producer.is_finished() && queue.is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(1));
            continue;
        };

        monitor.start();
        let latency = frame.captured.elapsed();
        monitor.mark("dequeue");
        let result = pipeline.process(
            &frame.data,
            frame.width,
            frame.height,
            mode,
            frame.rotation,
        );
        monitor.mark("process");

        match result {
            Ok(processed) => {
                if let Some(rate) = fps.tick() {
                    info!("fps: {rate:.1}");
                }
                if let Some(client) = tracy_client::Client::running() {
                    client.frame_mark();
                }
                debug!(
                    ?latency,
                    width = processed.width(),
                    height = processed.height(),
                    "frame ready"
                );
                if let Some(stream) = stream {
                    match stream.send(&processed, fps.current_fps()) {
                        Ok(viewers) => debug!(viewers, "frame streamed"),
                        Err(e) => warn!("frame not streamed: {e}"),
                    }
                }
                last = Some((processed, fps.current_fps()));
            }
            Err(e) => {
                failures += 1;
                error!(code = e.code(), "{e}");
            }
        }
    }

    let dropped = producer
        .join()
        .map_err(|_| Box::<dyn Error>::from("capture thread panicked"))?;
    info!(frames = args.frames, dropped, failures, "replay finished");
    if last.is_some() {
        monitor.log_timings();
    }
    Ok(last)
}
