//! avkit-probe - MP4/MOV 信息探测工具
//!
//! 打印轨道信息, 可选打印 Box 树与每个交付的采样, 并能把各轨道导出为基本流.

mod extract;

use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use avkit::logging::{self, LoggingConfig};
use avkit_codec::CodecId;
use avkit_core::{AvError, MediaType};
use avkit_format::demuxers::mp4::boxes::Mp4Box;
use avkit_format::demuxers::mp4::track::{MetaData, Track};
use avkit_format::{IoContext, Mp4DemuxOptions, Mp4Demuxer, UnknownBoxPolicy};
use clap::Parser;
use serde::Serialize;

use crate::extract::Extractor;

/// MP4/MOV 信息探测工具
#[derive(Parser, Debug)]
#[command(name = "avkit-probe", version, about = "纯 Rust MP4/MOV 信息探测工具")]
struct Cli {
    /// 输入文件路径
    input: PathBuf,

    /// 显示 Box 树
    #[arg(long)]
    boxes: bool,

    /// 逐个显示交付的采样
    #[arg(long)]
    samples: bool,

    /// 把各轨道导出为基本流到指定目录
    #[arg(long, value_name = "DIR")]
    extract: Option<PathBuf>,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 遇到未知 Box 时报错而不是跳过
    #[arg(long)]
    strict: bool,

    /// 日志配置文件 (JSON)
    #[arg(long, value_name = "FILE")]
    log_config: Option<PathBuf>,

    /// 提高日志级别 (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ============================================================
// 输出结构体
// ============================================================

#[derive(Serialize)]
struct ProbeOutput {
    filename: String,
    format_name: String,
    probe_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    major_brand: Option<String>,
    tracks: Vec<TrackInfo>,
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    boxes: Option<BoxInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    samples: Option<Vec<SampleInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<SampleSummary>,
}

#[derive(Serialize)]
struct TrackInfo {
    index: usize,
    track_id: u32,
    codec_type: &'static str,
    codec_name: &'static str,
    sample_formats: Vec<String>,
    timescale: u32,
    duration: u64,
    language: String,
    nb_samples: usize,
    nb_chunks: usize,
    nb_key_frames: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channels: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bits_per_sample: Option<u16>,
    extra_data_size: usize,
}

#[derive(Serialize)]
struct BoxInfo {
    fourcc: String,
    offset: u64,
    size: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<BoxInfo>,
}

#[derive(Serialize)]
struct SampleInfo {
    codec_type: &'static str,
    codec_name: &'static str,
    size: usize,
    pts: i64,
    dts: i64,
}

#[derive(Serialize, Default)]
struct SampleSummary {
    total_samples: u64,
    total_bytes: u64,
}

/// 回调与主流程共享的采样接收端
#[derive(Default)]
struct SampleSink {
    record: bool,
    samples: Vec<SampleInfo>,
    summary: SampleSummary,
    extractor: Option<Extractor>,
    /// 回调内第一次失败, 读取循环据此提前结束
    error: Option<anyhow::Error>,
}

impl SampleSink {
    fn on_sample(
        &mut self,
        data: &[u8],
        pts: i64,
        dts: i64,
        media_type: MediaType,
        codec: CodecId,
    ) {
        self.summary.total_samples += 1;
        self.summary.total_bytes += data.len() as u64;
        if self.record {
            self.samples.push(SampleInfo {
                codec_type: media_type.as_str(),
                codec_name: codec.name(),
                size: data.len(),
                pts,
                dts,
            });
        }
        if self.error.is_some() {
            return;
        }
        if let Some(extractor) = self.extractor.as_mut() {
            if let Err(err) = extractor.write_sample(codec, data) {
                self.error = Some(err);
            }
        }
    }
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_logging(&cli) {
        eprintln!("错误: 日志初始化失败: {err:#}");
        process::exit(1);
    }
    if let Err(err) = run(&cli) {
        eprintln!("错误: {err:#}");
        process::exit(1);
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let mut config = match &cli.log_config {
        Some(path) => LoggingConfig::load(path)?,
        None => LoggingConfig {
            level: "warn".to_string(),
            ..LoggingConfig::default()
        },
    };
    match cli.verbose {
        0 => {}
        1 => config.level = "debug".to_string(),
        _ => config.level = "trace".to_string(),
    }
    logging::init(config)
}

fn run(cli: &Cli) -> Result<()> {
    let filename = cli.input.to_string_lossy().to_string();
    let mut io = IoContext::open_read(&cli.input)
        .with_context(|| format!("无法打开文件 '{filename}'"))?;

    let registry = avkit::default_format_registry();
    let probe = registry
        .probe_input(&mut io, Some(&filename))
        .context("无法识别文件格式")?;
    log::info!("格式: {} (置信度: {})", probe.format_id, probe.score);

    let sink = Arc::new(Mutex::new(SampleSink {
        record: cli.samples,
        ..SampleSink::default()
    }));
    let handler_sink = Arc::clone(&sink);
    let options = Mp4DemuxOptions {
        unknown_box_policy: if cli.strict {
            UnknownBoxPolicy::Fail
        } else {
            UnknownBoxPolicy::Skip
        },
    };
    let mut demuxer = Mp4Demuxer::with_options(
        Box::new(move |data, pts, dts, media_type, codec| {
            if let Ok(mut sink) = handler_sink.lock() {
                sink.on_sample(data, pts, dts, media_type, codec);
            }
        }),
        options,
    );
    demuxer.open_io(io).context("无法解析文件头部")?;

    if let Some(dir) = &cli.extract {
        let stem = cli
            .input
            .file_stem()
            .map_or_else(|| "output".to_string(), |s| s.to_string_lossy().to_string());
        let extractor = Extractor::create(dir, &stem, demuxer.tracks())?;
        lock(&sink)?.extractor = Some(extractor);
    }

    let read_all = cli.samples || cli.extract.is_some();
    if read_all {
        loop {
            match demuxer.read() {
                Ok(()) => {}
                Err(AvError::Eof) => break,
                Err(err) => return Err(err).context("读取采样失败"),
            }
            if let Some(err) = lock(&sink)?.error.take() {
                return Err(err.context("导出基本流失败"));
            }
        }
    }

    let mut sink = lock(&sink)?;
    let output = ProbeOutput {
        filename,
        format_name: probe.format_id.name().to_string(),
        probe_score: probe.score,
        major_brand: demuxer.ftyp().map(|ftyp| ftyp.major_brand.to_string()),
        tracks: demuxer.tracks().iter().map(build_track_info).collect(),
        warnings: demuxer.warnings().iter().map(|w| w.to_string()).collect(),
        boxes: match (cli.boxes, demuxer.root()) {
            (true, Some(root)) => Some(build_box_info(root)),
            _ => None,
        },
        samples: cli.samples.then(|| std::mem::take(&mut sink.samples)),
        summary: read_all.then(|| std::mem::take(&mut sink.summary)),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text(&output);
    }

    if let Some(extractor) = sink.extractor.take() {
        for (path, samples) in extractor.finish()? {
            eprintln!("已导出 {} ({samples} 个采样)", path.display());
        }
    }
    Ok(())
}

fn lock(sink: &Mutex<SampleSink>) -> Result<std::sync::MutexGuard<'_, SampleSink>> {
    sink.lock()
        .map_err(|_| anyhow::anyhow!("采样回调在持锁时 panic"))
}

fn build_track_info(track: &Track) -> TrackInfo {
    let mut info = TrackInfo {
        index: track.index(),
        track_id: track.track_id(),
        codec_type: track.media_type().as_str(),
        codec_name: track.codec_id().name(),
        sample_formats: track
            .sample_description()
            .formats()
            .iter()
            .map(|f| f.to_string())
            .collect(),
        timescale: track.timescale(),
        duration: track.duration(),
        language: track.language().to_string(),
        nb_samples: track.sample_count(),
        nb_chunks: track.chunk_count(),
        nb_key_frames: track.samples().iter().filter(|s| s.key_frame).count(),
        width: None,
        height: None,
        sample_rate: None,
        channels: None,
        bits_per_sample: None,
        extra_data_size: track.meta_data().extra_data().len(),
    };
    match track.meta_data() {
        MetaData::Video(video) => {
            info.width = Some(video.width);
            info.height = Some(video.height);
        }
        MetaData::Audio(audio) => {
            info.sample_rate = Some(audio.sample_rate);
            info.channels = Some(audio.channel_count);
            info.bits_per_sample = Some(audio.sample_bit);
        }
        MetaData::Subtitle(_) | MetaData::Data(_) => {}
    }
    info
}

fn build_box_info(node: &Mp4Box) -> BoxInfo {
    BoxInfo {
        fourcc: node.fourcc.to_string(),
        offset: node.offset,
        size: node.size,
        children: node.children.iter().map(build_box_info).collect(),
    }
}

// ============================================================
// 文本输出
// ============================================================

fn print_text(output: &ProbeOutput) {
    println!("[FORMAT]");
    println!("  文件名       : {}", output.filename);
    println!("  格式名称     : {}", output.format_name);
    println!("  探测置信度   : {}", output.probe_score);
    if let Some(brand) = &output.major_brand {
        println!("  主品牌       : {brand}");
    }
    println!("  轨道数量     : {}", output.tracks.len());
    println!("[/FORMAT]");
    println!();

    for track in &output.tracks {
        print_track_text(track);
    }

    if !output.warnings.is_empty() {
        println!("[WARNINGS]");
        for warning in &output.warnings {
            println!("  {warning}");
        }
        println!("[/WARNINGS]");
        println!();
    }

    if let Some(root) = &output.boxes {
        println!("[BOXES]");
        for child in &root.children {
            print_box_text(child, 1);
        }
        println!("[/BOXES]");
        println!();
    }

    if let Some(samples) = &output.samples {
        println!("[SAMPLES]");
        for (i, s) in samples.iter().enumerate() {
            println!(
                "  #{i:<6} {:<8} {:<10} size={:<8} pts={:<10} dts={}",
                s.codec_type, s.codec_name, s.size, s.pts, s.dts
            );
        }
        println!("[/SAMPLES]");
        println!();
    }

    if let Some(summary) = &output.summary {
        println!("[SUMMARY]");
        println!("  采样总数     : {}", summary.total_samples);
        println!(
            "  数据总量     : {} 字节 ({:.2} KB)",
            summary.total_bytes,
            summary.total_bytes as f64 / 1024.0
        );
        println!("[/SUMMARY]");
        println!();
    }
}

fn print_track_text(track: &TrackInfo) {
    println!("[TRACK #{}]", track.index);
    println!("  track_ID     : {}", track.track_id);
    println!("  类型         : {}", track.codec_type);
    println!("  编解码器     : {}", track.codec_name);
    println!("  采样格式     : {}", track.sample_formats.join(", "));
    println!("  时间刻度     : {}", track.timescale);
    if track.timescale > 0 {
        println!(
            "  时长         : {:.3} 秒",
            track.duration as f64 / track.timescale as f64
        );
    }
    println!("  语言         : {}", track.language);
    println!(
        "  采样/块/关键帧: {}/{}/{}",
        track.nb_samples, track.nb_chunks, track.nb_key_frames
    );
    if let (Some(w), Some(h)) = (track.width, track.height) {
        println!("  分辨率       : {w}x{h}");
    }
    if let Some(sr) = track.sample_rate {
        println!("  采样率       : {sr} Hz");
    }
    if let Some(ch) = track.channels {
        println!("  声道数       : {ch}");
    }
    if let Some(bits) = track.bits_per_sample {
        println!("  采样位数     : {bits}");
    }
    println!("  附加数据     : {} 字节", track.extra_data_size);
    println!("[/TRACK]");
    println!();
}

fn print_box_text(node: &BoxInfo, depth: usize) {
    println!(
        "{:indent$}{} @{} ({} 字节)",
        "",
        node.fourcc,
        node.offset,
        node.size,
        indent = depth * 2
    );
    for child in &node.children {
        print_box_text(child, depth + 1);
    }
}
