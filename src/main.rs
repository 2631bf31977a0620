// src/main.rs
use std::path::PathBuf;
use log::info;
use winit::event_loop::EventLoop;

use tentacle::{TentacleEngine, VirtualFs};

const DATA_ARCHIVE: &str = "data.zip";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    info!("Starting Tentacle...");

    let root = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => VirtualFs::base_dir()?,
    };

    let mut vfs = VirtualFs::new();
    vfs.mount(&root, false)?;

    let archive = root.join(DATA_ARCHIVE);
    if archive.is_file() {
        vfs.mount(&archive, true)?;
    }
    info!("Mounted {} ({} files visible)", root.display(), vfs.list().len());

    let event_loop = EventLoop::new();
    let engine = pollster::block_on(TentacleEngine::new(vfs, &event_loop))?;
    engine.run(event_loop)
}
