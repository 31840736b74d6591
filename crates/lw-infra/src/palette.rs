use lw_core::ports::PalettePort;
use lw_core::TourConfig;

/// A palette whose length never changes.
#[derive(Debug, Clone, Copy)]
pub struct StaticPalette {
    length: usize,
}

impl StaticPalette {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn from_config(config: &TourConfig) -> Self {
        Self::new(config.palette_length)
    }
}

impl PalettePort for StaticPalette {
    fn palette_length(&self) -> usize {
        self.length
    }
}
