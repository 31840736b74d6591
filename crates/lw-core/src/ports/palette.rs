/// Theme palette collaborator. Lap colors are indices into this palette.
pub trait PalettePort: Send + Sync {
    fn palette_length(&self) -> usize;
}
