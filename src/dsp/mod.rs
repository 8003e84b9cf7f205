//! Audio block type, the effect-node abstraction, the three performer
//! effects, and the registry that dispatches commands to them.

pub mod block;
pub mod effects;
pub mod registry;
pub mod util;

pub use block::StereoBlock;
pub use effects::{Choke, EffectId, Freeze, QuantizeMode, Stutter, StutterState, Timekeeper};
pub use registry::EffectRegistry;
pub use util::effect_trait::Effect;
