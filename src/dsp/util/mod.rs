//! DSP utility types.

pub mod effect_trait;

pub use effect_trait::Effect;
