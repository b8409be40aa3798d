pub mod decision;
pub mod persistence;
pub mod plan;
pub mod preset;
pub mod preview;
pub mod resolver;
pub mod sequential;

pub use decision::{ChannelDecider, Decision, DecisionRequest, MissingSymbolDecider, decision_channel};
pub use plan::{plan, preview};
pub use preset::{LengthPolicy, MissingPolicy, Mode, Preset, ScaleSettings, SelectionPolicy, Template};
pub use preview::{PreviewItem, PreviewReport};
pub use resolver::{Assignment, Resolution, ResolverContext, ResolveRequest, SkipReason, Warning, resolve};
