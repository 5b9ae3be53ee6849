//! Integration tests for the full capture, encode and upload pipeline
//! against a stub collector over real TCP on localhost.

use std::net::SocketAddr;
use std::time::Duration;

use depthcast_core::{
    CaptureLoop, FrameEvent, HttpUploader, LoopConfig, RawFrame, ScriptedSource, ShutdownHandle,
    StopReason, SyntheticConfig, SyntheticSource, UploadTarget, bitmap,
};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

// ── Helpers ──────────────────────────────────────────────────────

/// One request as seen by the stub collector.
#[derive(Debug)]
struct Received {
    method: String,
    path: String,
    content_length: Option<usize>,
    content_type: Option<String>,
    body: Vec<u8>,
}

/// Spin up a minimal HTTP/1.1 collector on an OS-assigned port that
/// answers every request with `status` and forwards what it received.
async fn stub_collector(status: u16) -> (SocketAddr, mpsc::UnboundedReceiver<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let _ = serve(stream, status, tx).await;
            });
        }
    });

    (addr, rx)
}

async fn serve(
    stream: TcpStream,
    status: u16,
    tx: mpsc::UnboundedSender<Received>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);

    // Keep-alive: serve requests until the client hangs up.
    loop {
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).await? == 0 {
            return Ok(());
        }
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or_default().to_string();

        let mut content_length = None;
        let mut content_type = None;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).await?;
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                match name.trim().to_ascii_lowercase().as_str() {
                    "content-length" => content_length = value.trim().parse().ok(),
                    "content-type" => content_type = Some(value.trim().to_string()),
                    _ => {}
                }
            }
        }

        let mut body = vec![0u8; content_length.unwrap_or(0)];
        reader.read_exact(&mut body).await?;

        let _ = tx.send(Received {
            method,
            path,
            content_length,
            content_type,
            body,
        });

        let reason = if status == 200 { "OK" } else { "Error" };
        let response = format!("HTTP/1.1 {status} {reason}\r\ncontent-length: 0\r\n\r\n");
        reader.get_mut().write_all(response.as_bytes()).await?;
    }
}

fn gradient_frame(w: u32, h: u32) -> RawFrame {
    let mut data = Vec::with_capacity((w * h * 3) as usize);
    for y in 0..h {
        for x in 0..w {
            data.extend_from_slice(&[(x * 40) as u8, (y * 60) as u8, 200]);
        }
    }
    RawFrame::new(w, h, 3, data)
}

fn closed_port() -> u16 {
    let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    l.local_addr().unwrap().port()
}

// ── End to end ───────────────────────────────────────────────────

#[tokio::test]
async fn test_color_frames_reach_collector() {
    let (addr, mut rx) = stub_collector(200).await;
    let target = UploadTarget::new(addr.ip().to_string(), addr.port()).with_path("/frames");
    let uploader = HttpUploader::new(target).unwrap();

    let depth = FrameEvent::depth(RawFrame::new(4, 4, 2, vec![0; 32]));
    let source = ScriptedSource::new([
        depth.clone(),
        FrameEvent::color(RawFrame::new(2, 1, 3, vec![10, 20, 30, 40, 50, 60])),
        depth,
        FrameEvent::color(gradient_frame(5, 3)),
    ]);

    let mut lp = CaptureLoop::new(source, uploader, ShutdownHandle::new());
    let summary = lp.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::SourceExhausted);
    assert_eq!(summary.color_frames, 2);
    assert_eq!(summary.depth_frames, 2);
    assert_eq!(summary.uploaded, 2);
    assert_eq!(summary.failed, 0);

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timeout")
        .expect("collector closed");
    assert_eq!(first.method, "PUT");
    assert_eq!(first.path, "/frames");
    assert_eq!(first.content_length, Some(62));
    assert_eq!(first.content_type.as_deref(), Some("image/bmp"));
    assert_eq!(&first.body[..2], b"BM");
    assert_eq!(&first.body[54..], &[60, 50, 40, 30, 20, 10, 0, 0]);

    let second = rx.recv().await.expect("collector closed");
    assert_eq!(second.body.len() as u64, bitmap::file_size(5, 3));
    let decoded = image::load_from_memory_with_format(&second.body, image::ImageFormat::Bmp)
        .expect("collector body is a valid bitmap");
    assert_eq!((decoded.width(), decoded.height()), (5, 3));
}

#[tokio::test]
async fn test_collector_error_status_is_not_fatal() {
    let (addr, mut rx) = stub_collector(500).await;
    let uploader = HttpUploader::new(UploadTarget::new("127.0.0.1", addr.port())).unwrap();

    let source = ScriptedSource::new((0..3).map(|_| FrameEvent::color(gradient_frame(2, 2))));
    let mut lp = CaptureLoop::new(source, uploader, ShutdownHandle::new());
    let summary = lp.run().await.unwrap();

    assert_eq!(summary.color_frames, 3);
    assert_eq!(summary.failed, 3);
    assert_eq!(lp.stats().connect_failures(), 0);

    // Every frame was still delivered once.
    for _ in 0..3 {
        let req = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timeout")
            .expect("collector closed");
        assert_eq!(req.body.len(), 70);
    }
}

#[tokio::test]
async fn test_unreachable_collector_keeps_capturing() {
    let uploader = HttpUploader::new(UploadTarget::new("127.0.0.1", closed_port())).unwrap();

    let source = ScriptedSource::new((0..4).map(|_| FrameEvent::color(gradient_frame(2, 1))));
    let mut lp = CaptureLoop::new(source, uploader, ShutdownHandle::new());
    let summary = lp.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::SourceExhausted);
    assert_eq!(summary.color_frames, 4);
    assert_eq!(summary.failed, 4);
    assert_eq!(lp.stats().connect_failures(), 4);
}

#[tokio::test]
async fn test_synthetic_source_with_frame_limit() {
    let (addr, mut rx) = stub_collector(200).await;
    let uploader = HttpUploader::new(UploadTarget::new("127.0.0.1", addr.port())).unwrap();

    let source = SyntheticSource::new(SyntheticConfig {
        width: 16,
        height: 8,
        fps: 200,
        depth_enabled: true,
    });
    let config = LoopConfig {
        frame_limit: Some(3),
    };
    let mut lp = CaptureLoop::with_config(source, uploader, ShutdownHandle::new(), config);
    let summary = lp.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::FrameLimit);
    assert_eq!(summary.uploaded, 3);
    assert_eq!(summary.depth_frames, 3);
    for _ in 0..3 {
        let req = rx.recv().await.expect("collector closed");
        assert_eq!(req.body.len() as u64, bitmap::file_size(16, 8));
    }
}

#[tokio::test]
async fn test_external_shutdown_stops_synthetic_stream() {
    let (addr, _rx) = stub_collector(200).await;
    let uploader = HttpUploader::new(UploadTarget::new("127.0.0.1", addr.port())).unwrap();

    let source = SyntheticSource::new(SyntheticConfig {
        width: 8,
        height: 8,
        fps: 50,
        depth_enabled: false,
    });
    let shutdown = ShutdownHandle::new();
    let mut lp = CaptureLoop::new(source, uploader, shutdown.clone());

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        shutdown.request();
    });

    let summary = tokio::time::timeout(Duration::from_secs(5), lp.run())
        .await
        .expect("loop did not stop")
        .unwrap();
    stopper.await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::Shutdown);
    assert!(summary.color_frames >= 1);
    assert_eq!(summary.uploaded, summary.color_frames);
}

// ── Bitmap decoding ──────────────────────────────────────────────

#[test]
fn test_standard_decoder_reads_encoder_output() {
    let (w, h) = (7u32, 4u32);
    let frame = gradient_frame(w, h);
    let bmp = bitmap::encode(&frame).unwrap();

    let decoded = image::load_from_memory_with_format(bmp.as_bytes(), image::ImageFormat::Bmp)
        .unwrap()
        .to_rgb8();
    assert_eq!(decoded.dimensions(), (w, h));

    // The flat byte reversal mirrors each row left-to-right and keeps
    // rows in capture order; RGB input ends up in the right channels.
    for y in 0..h {
        for x in 0..w {
            let src = frame.row(y);
            let sx = (w - 1 - x) as usize * 3;
            let expected = [src[sx], src[sx + 1], src[sx + 2]];
            assert_eq!(decoded.get_pixel(x, y).0, expected, "pixel ({x}, {y})");
        }
    }
}
