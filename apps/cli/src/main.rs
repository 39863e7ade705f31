//! # Robin CLI
//!
//! 动画资产的检查与试播工具。
//!
//! ```bash
//! # 列出一个资产目录里的所有片段
//! robin-cli list assets/animations
//!
//! # 查看单个片段的逐轨关键帧
//! robin-cli inspect assets/animations/greetings.json anim_greeting_wave
//!
//! # 对着真机试播（UDP），Ctrl-C 中止
//! robin-cli play assets/animations anim_greeting_wave --robot 192.168.40.2:5551
//!
//! # 没有真机时用内置回环模型跑一遍，打印流送统计
//! robin-cli play assets/animations anim_greeting_wave --loops 3
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use robin_sdk::prelude::*;
use robin_sdk::streamer::runner;

/// Robin CLI - 动画资产命令行工具
#[derive(Parser, Debug)]
#[command(name = "robin-cli")]
#[command(about = "Inspect and play Robin animation assets", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 列出资产文件/目录中的所有片段
    List {
        /// JSON 文件或目录
        path: PathBuf,
    },

    /// 打印单个片段的逐轨关键帧
    Inspect {
        /// JSON 文件或目录
        path: PathBuf,
        /// 片段名
        name: String,
    },

    /// 流送一个片段（UDP 真机或内置回环模型）
    Play {
        /// JSON 文件或目录
        path: PathBuf,
        /// 片段名
        name: String,

        /// 循环次数（0 = 无限，Ctrl-C 中止）
        #[arg(short, long, default_value_t = 1)]
        loops: u32,

        /// 播完后的空闲动画
        #[arg(long)]
        idle: Option<String>,

        /// 机器人 UDP 地址（省略时使用内置回环模型）
        #[arg(long)]
        robot: Option<String>,
    },
}

fn main() -> Result<()> {
    robin_sdk::init_logging_with_filter("robin_cli=info,robin_streamer=info,warn");

    let cli = Cli::parse();
    match cli.command {
        Commands::List { path } => cmd_list(&path),
        Commands::Inspect { path, name } => cmd_inspect(&path, &name),
        Commands::Play {
            path,
            name,
            loops,
            idle,
            robot,
        } => cmd_play(&path, &name, loops, idle, robot),
    }
}

/// 加载一个文件或整个目录
fn load_container(path: &Path) -> Result<AnimationContainer> {
    let mut container = AnimationContainer::new();
    let loaded = if path.is_dir() {
        container.load_dir(path)
    } else {
        container.load_file(path)
    }
    .with_context(|| format!("failed to load animations from {}", path.display()))?;

    if loaded == 0 {
        bail!("no animation clips found in {}", path.display());
    }
    Ok(container)
}

fn cmd_list(path: &Path) -> Result<()> {
    let container = load_container(path)?;

    println!("{:>4}  {:<40} {:>10}  {:>9}", "ID", "NAME", "DURATION", "KEYFRAMES");
    for name in container.names() {
        let anim = container.get(name)?;
        let id = container.id_of(name).expect("listed name must have an id");
        println!(
            "{:>4}  {:<40} {:>8}ms  {:>9}",
            id,
            name,
            anim.duration_ms(),
            anim.keyframe_count()
        );
    }
    println!("\n{} clip(s) total", container.len());
    Ok(())
}

fn cmd_inspect(path: &Path, name: &str) -> Result<()> {
    let container = load_container(path)?;
    let anim = container
        .get(name)
        .with_context(|| format!("clip '{}' not found (try `robin-cli list`)", name))?;

    println!("clip:      {}", anim.name());
    println!("id:        {}", container.id_of(name).expect("clip exists"));
    println!("duration:  {}ms", anim.duration_ms());
    println!("keyframes: {}", anim.keyframe_count());

    fn dump<K: std::fmt::Debug>(label: &str, track: impl Iterator<Item = K>) {
        let frames: Vec<K> = track.collect();
        if frames.is_empty() {
            return;
        }
        println!("\n[{} - {} frame(s)]", label, frames.len());
        for frame in frames {
            println!("  {:?}", frame);
        }
    }

    dump("head", anim.head.iter());
    dump("lift", anim.lift.iter());
    dump("body", anim.body.iter());
    dump("backpack_lights", anim.lights.iter());
    dump("face_images", anim.face_images.iter());
    dump("procedural_faces", anim.faces.iter());
    dump("audio", anim.audio.iter());
    dump("events", anim.events.iter());
    Ok(())
}

fn cmd_play(
    path: &Path,
    name: &str,
    loops: u32,
    idle: Option<String>,
    robot: Option<String>,
) -> Result<()> {
    let container = load_container(path)?;
    // 提前报错比流到一半失败友好
    container
        .get(name)
        .with_context(|| format!("clip '{}' not found (try `robin-cli list`)", name))?;

    let streamer = AnimationStreamer::new(container);
    let metrics = streamer.metrics();

    let handle = match &robot {
        Some(addr) => {
            info!(addr = %addr, "Connecting to robot over UDP");
            let link = UdpLink::connect(addr.as_str())
                .with_context(|| format!("failed to connect to robot at {}", addr))?;
            runner::spawn(streamer, link)
        },
        None => {
            info!("No robot address given, streaming to loopback model");
            runner::spawn(streamer, LoopbackLink::new())
        },
    };

    handle.set_event_sink(|event| {
        println!("[event] clip={} tag={} id={}", event.clip, event.tag, event.event_id);
    });

    if let Some(idle_name) = &idle {
        handle
            .set_idle(Some(idle_name.clone()))
            .context("streamer thread died")?;
    }

    // Ctrl-C 请求中止
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        interrupted_flag.store(true, Ordering::SeqCst);
    })
    .context("failed to install Ctrl-C handler")?;

    println!("Playing '{}' ({})", name, if loops == 0 {
        "looping forever, Ctrl-C to stop".to_string()
    } else {
        format!("{} loop(s)", loops)
    });
    handle.play(name.to_string(), loops, true).context("streamer thread died")?;

    // 等播完（有限循环按完成计数判断，避免与状态发布竞速）
    loop {
        if interrupted.load(Ordering::SeqCst) {
            println!("\nInterrupted, aborting playback");
            handle.stop().ok();
            break;
        }
        if loops > 0 && metrics.snapshot().playbacks_finished >= 1 {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    let snap = metrics.snapshot();
    println!("\n=== 流送统计 ===");
    println!("ticks:             {}", snap.ticks);
    println!("messages sent:     {}", snap.messages_sent);
    println!("bytes sent:        {}", snap.bytes_sent);
    println!("audio frames:      {} real / {} silence", snap.audio_frames_sent, snap.silence_frames_sent);
    println!("loops completed:   {}", snap.loops_completed);
    println!("events emitted:    {}", snap.events_emitted);
    println!("buffer high water: {}", snap.send_buffer_high_water);

    handle.shutdown();
    Ok(())
}
