mod config;

use clap::Parser;
use gbc_emu_core::{
    CoreError, EmulatorConfig, GameBoy,
    hardware::{CYCLES_PER_FRAME, ModelPreference, SCREEN_HEIGHT, SCREEN_WIDTH},
};
use log::{error, info};
use std::error::Error;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "gbc-emu", about = "Headless Game Boy / Game Boy Color runner")]
struct Args {
    /// Path to ROM file
    rom: PathBuf,

    /// Force DMG mode
    #[arg(long, conflicts_with = "cgb")]
    dmg: bool,

    /// Force CGB mode
    #[arg(long, conflicts_with = "dmg")]
    cgb: bool,

    /// Number of frames to run
    #[arg(long, conflicts_with = "cycles")]
    frames: Option<u64>,

    /// Number of CPU cycles to run
    #[arg(long)]
    cycles: Option<u64>,

    /// Write the last frame to this PNG file
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Config file to read defaults from
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reject ROMs with a bad boot logo or header checksum
    #[arg(long)]
    strict_header: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config_path = args.config.clone().unwrap_or_else(config::default_cli_config_path);
    let cfg = config::load_from_file(&config_path);

    let model = if args.dmg {
        ModelPreference::ForceDmg
    } else if args.cgb {
        ModelPreference::ForceCgb
    } else {
        cfg.emulation_mode.into()
    };

    let data = std::fs::read(&args.rom)
        .map_err(|e| format!("failed to read {}: {e}", args.rom.display()))?;

    let mut gb = GameBoy::with_config(EmulatorConfig {
        model,
        strict_header: args.strict_header || cfg.strict_header,
        sample_buffer_len: cfg.sample_buffer_len,
    });
    let samples = drive(&mut gb, &data, args.frames.unwrap_or(cfg.frames), args.cycles)?;

    info!(
        "Ran {} frames in {} cycles, {} audio samples",
        gb.frames(),
        gb.total_cycles(),
        samples
    );

    if let Some(path) = &args.screenshot {
        write_png(path, gb.frame_buffer())?;
        info!("Saved screenshot to {}", path.display());
    }

    Ok(())
}

/// Loads `data` and runs it for `cycles` cycles if given, else for `frames`
/// frames. Returns the number of audio samples produced.
fn drive(
    gb: &mut GameBoy,
    data: &[u8],
    frames: u64,
    cycles: Option<u64>,
) -> Result<usize, CoreError> {
    gb.load_image(data)?;

    if let Some(cart) = gb.cartridge() {
        let header = cart.header();
        info!(
            "Loaded \"{}\" ({}, {} ROM banks, {} RAM banks)",
            cart.title,
            header.controller_name(),
            cart.rom_bank_count(),
            cart.ram_bank_count()
        );
    }

    let mut samples = 0usize;
    if let Some(cycles) = cycles {
        // Drain once per frame's worth of cycles so the buffer never fills.
        let mut remaining = cycles;
        while remaining > 0 {
            let chunk = remaining.min(CYCLES_PER_FRAME as u64);
            let before = gb.total_cycles();
            gb.run_cycles(chunk)?;
            remaining = remaining.saturating_sub(gb.total_cycles() - before);
            samples += gb.take_audio_buffer().len();
        }
    } else {
        for _ in 0..frames {
            gb.step_frame()?;
            samples += gb.take_audio_buffer().len();
        }
    }
    Ok(samples)
}

fn write_png(path: &Path, frame: &[u32]) -> Result<(), Box<dyn Error>> {
    let mut pixels = Vec::with_capacity(SCREEN_WIDTH * SCREEN_HEIGHT * 3);
    for c in frame {
        pixels.push(((c >> 16) & 0xFF) as u8);
        pixels.push(((c >> 8) & 0xFF) as u8);
        pixels.push((c & 0xFF) as u8);
    }

    let file = std::fs::File::create(path)?;
    let mut encoder = png::Encoder::new(
        BufWriter::new(file),
        SCREEN_WIDTH as u32,
        SCREEN_HEIGHT as u32,
    );
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&pixels)?;
    Ok(())
}
