/// Frame reconstruction honouring GIF disposal semantics.
pub mod compositor;
