//! Game Boy / Game Boy Color emulation core.
//!
//! This crate contains the platform-agnostic emulator logic (CPU/MMU/PPU/APU/etc).
//! Frontends live in separate crates and drive the core via the [`gameboy`]
//! facade: load a cartridge image, step instructions or whole frames, then read
//! the pixel buffer and drain the audio buffer.

/// Audio Processing Unit (APU) emulation.
pub mod apu;

/// Cartridge header parsing, bank controllers (MBC) and the MBC3 real-time clock.
pub mod cartridge;

/// LR35902 CPU core.
pub mod cpu;

/// Error types surfaced to frontends.
pub mod error;

/// High-level facade that wires the CPU and MMU into a single machine.
pub mod gameboy;

/// Hardware models and clock constants.
pub mod hardware;

/// Memory map and hardware plumbing.
pub mod mmu;

/// Pixel Processing Unit (PPU) emulation.
pub mod ppu;

/// Divider/timer unit.
pub mod timer;

pub use error::{CoreError, ExecError, LoadError};
pub use gameboy::{EmulatorConfig, GameBoy};
